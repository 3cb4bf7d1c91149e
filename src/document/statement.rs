//! Monthly account statement (hesap ekstresi)
use crate::config::LedgerConfig;
use crate::reconcile::invoice_total;
use crate::reports::MonthlyStatement;
use crate::types::{Amount, BusinessDate, SignedAmount};

use super::layout::{CellInput, Flow, StyleOverride, TableSpec};
use super::model::{
    Align, CellStyle, Document, Element, MARGIN, PAGE_HEIGHT, PAGE_WIDTH, Rgb, Stroke, TextStyle,
};
use super::normalize::normalize_text;

const INCOME_GREEN: Rgb = Rgb(0, 100, 0);
const EXPENSE_RED: Rgb = Rgb(139, 0, 0);

/// One line of the transaction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date: BusinessDate,
    pub description: String,
    pub income: Amount,
    pub expense: Amount,
    pub status: &'static str,
}

/// Invoices as income and expenses as outflow, by business date. Ties keep
/// invoices ahead of expenses and otherwise their input order.
pub fn transactions(statement: &MonthlyStatement) -> Vec<Transaction> {
    let invoices = statement.invoices.iter().map(|entry| Transaction {
        date: entry.invoice.issue_date,
        description: format!(
            "Proforma {} - {}",
            normalize_text(&entry.invoice.invoice_number),
            normalize_text(entry.customer_name.as_deref().unwrap_or_default())
        ),
        income: invoice_total(&entry.invoice),
        expense: Amount::ZERO,
        status: entry.invoice.status.statement_label(),
    });
    let expenses = statement.expenses.iter().map(|expense| Transaction {
        date: expense.created_on,
        description: normalize_text(&expense.description),
        income: Amount::ZERO,
        expense: expense.amount,
        status: expense.statement_label(),
    });

    let mut all: Vec<Transaction> = invoices.chain(expenses).collect();
    all.sort_by_key(|t| t.date);
    all
}

/// Running balance after each transaction, `+income - expense` in list order.
pub fn running_balances(transactions: &[Transaction]) -> Vec<SignedAmount> {
    let mut balance = SignedAmount::ZERO;
    transactions
        .iter()
        .map(|t| {
            balance.credit(t.income);
            balance.debit(t.expense);
            balance
        })
        .collect()
}

pub fn file_name(label: &str) -> String {
    format!("AZZA_Ekstre_{}.pdf", normalize_text(label).replace(' ', "_"))
}

fn text(flow: &mut Flow, x: f32, y: f32, text: impl Into<String>, style: TextStyle) {
    flow.push(Element::Text {
        x,
        y,
        text: text.into(),
        style,
    });
}

fn header(flow: &mut Flow, statement: &MonthlyStatement, report_date: BusinessDate, config: &LedgerConfig) {
    let right_edge = PAGE_WIDTH - MARGIN;
    let center = PAGE_WIDTH / 2.0;
    let title = config
        .letterhead
        .name_lines
        .first()
        .cloned()
        .unwrap_or_default();
    text(flow, center, 15.0, title, TextStyle::bold(16.0).aligned(Align::Center));
    text(
        flow,
        center,
        21.0,
        config.letterhead.statement_title.clone(),
        TextStyle::normal(9.0).aligned(Align::Center),
    );
    for y in [25.0, 27.0] {
        flow.push(Element::Line {
            from: (MARGIN, y),
            to: (right_edge, y),
            stroke: Stroke::black(1.0),
        });
    }

    text(
        flow,
        MARGIN,
        35.0,
        format!("DONEM: {}", normalize_text(&statement.label).to_uppercase()),
        TextStyle::bold(10.0),
    );
    text(
        flow,
        right_edge,
        35.0,
        format!("Rapor Tarihi: {}", report_date.format_tr()),
        TextStyle::normal(8.0).aligned(Align::Right),
    );
    flow.y = 45.0;
}

fn summary(flow: &mut Flow, statement: &MonthlyStatement) {
    let mut spec = TableSpec::new(MARGIN, vec![120.0, 60.0]);
    spec.base = CellStyle {
        line_width: 0.5,
        ..CellStyle::default()
    };
    spec.head_style = StyleOverride::new().fill(Rgb::gray(240)).bold().size(9.0);
    spec.body_style = StyleOverride::new().size(9.0);
    spec.column_styles = vec![
        StyleOverride::new().normal(),
        StyleOverride::new().align(Align::Right).bold(),
    ];

    let profit = statement.profit();
    let sign = if profit.is_negative() { "-" } else { "+" };
    let total = StyleOverride::new().fill(Rgb::gray(240)).bold();

    let head = vec![vec!["HESAP OZETI".into(), "TUTAR (USD)".into()]];
    let body = vec![
        vec![
            "Toplam Gelir (Faturalar)".into(),
            format!("+ {}", statement.total_revenue.grouped()).into(),
        ],
        vec![
            "Toplam Gider (Masraflar)".into(),
            format!("- {}", statement.total_expenses.grouped()).into(),
        ],
        vec![
            CellInput::styled("", StyleOverride::new().line_width(0.8)),
            CellInput::styled("", StyleOverride::new().line_width(0.8)),
        ],
        vec![
            CellInput::styled("NET KAR/ZARAR", total),
            CellInput::styled(format!("{sign} {}", profit.abs().grouped()), total),
        ],
    ];

    let start = flow.y;
    flow.table(&spec, &head, &body, &[], start);
}

fn transaction_table(flow: &mut Flow, statement: &MonthlyStatement) {
    flow.y += 10.0;
    flow.ensure_space(20.0);
    let y = flow.y;
    text(flow, MARGIN, y, "ISLEM HAREKETLERI", TextStyle::bold(10.0));
    flow.y += 5.0;

    let mut spec = TableSpec::new(MARGIN, vec![22.0, 70.0, 22.0, 22.0, 25.0, 19.0]);
    spec.base = CellStyle {
        line_width: 0.2,
        padding: 1.5,
        ..CellStyle::default()
    };
    spec.head_style = StyleOverride::new()
        .fill(Rgb::gray(240))
        .bold()
        .size(7.0)
        .align(Align::Center)
        .line_width(0.5);
    spec.body_style = StyleOverride::new().size(7.0);
    spec.foot_style = StyleOverride::new()
        .fill(Rgb::gray(220))
        .bold()
        .size(8.0)
        .line_width(0.8);
    spec.column_styles = vec![
        StyleOverride::new().align(Align::Center),
        StyleOverride::new().align(Align::Left),
        StyleOverride::new().align(Align::Right).bold(),
        StyleOverride::new().align(Align::Right),
        StyleOverride::new().align(Align::Right).bold(),
        StyleOverride::new().align(Align::Center).size(6.0),
    ];

    let head = vec![
        ["TARIH", "ACIKLAMA", "GELIR", "GIDER", "BAKIYE", "DURUM"]
            .map(CellInput::from)
            .to_vec(),
    ];

    let transactions = transactions(statement);
    let balances = running_balances(&transactions);
    let body: Vec<Vec<CellInput>> = transactions
        .iter()
        .zip(&balances)
        .map(|(t, balance)| {
            let income = if t.income.is_zero() {
                CellInput::default()
            } else {
                CellInput::styled(format!("+ {}", t.income.grouped()), StyleOverride::new().color(INCOME_GREEN))
            };
            let expense = if t.expense.is_zero() {
                CellInput::default()
            } else {
                CellInput::styled(format!("- {}", t.expense.grouped()), StyleOverride::new().color(EXPENSE_RED))
            };
            vec![
                t.date.format_tr().into(),
                t.description.clone().into(),
                income,
                expense,
                balance.grouped().into(),
                t.status.into(),
            ]
        })
        .collect();

    let closing = balances.last().copied().unwrap_or(SignedAmount::ZERO);
    let foot = vec![vec![
        "DONEM SONU".into(),
        "".into(),
        statement.total_revenue.grouped().into(),
        statement.total_expenses.grouped().into(),
        closing.grouped().into(),
        "".into(),
    ]];

    let start = flow.y;
    flow.table(&spec, &head, &body, &foot, start);
}

fn footer(flow: &mut Flow, config: &LedgerConfig) {
    let mut y = PAGE_HEIGHT - 25.0;
    if flow.y > y {
        flow.new_page();
    }
    flow.push(Element::Line {
        from: (MARGIN, y),
        to: (PAGE_WIDTH - MARGIN, y),
        stroke: Stroke::black(0.8),
    });
    y += 6.0;
    text(flow, MARGIN, y, config.letterhead.legal_name.clone(), TextStyle::bold(9.0));
    y += 5.0;
    text(flow, MARGIN, y, config.letterhead.statement_address.clone(), TextStyle::normal(8.0));
    y += 4.0;
    text(flow, MARGIN, y, config.letterhead.statement_contact.clone(), TextStyle::normal(8.0));
    y += 6.0;
    text(
        flow,
        PAGE_WIDTH / 2.0,
        y,
        config.letterhead.statement_notice.clone(),
        TextStyle::italic(7.0).aligned(Align::Center).colored(Rgb::gray(100)),
    );
}

#[tracing::instrument(skip_all, fields(month = %statement.label))]
pub fn render_statement(
    statement: &MonthlyStatement,
    report_date: BusinessDate,
    config: &LedgerConfig,
) -> Document {
    let mut flow = Flow::new();
    header(&mut flow, statement, report_date, config);
    summary(&mut flow, statement);
    transaction_table(&mut flow, statement);
    footer(&mut flow, config);

    let document = flow.finish(file_name(&statement.label));
    tracing::debug!(pages = document.pages.len(), "statement laid out");
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Expense, ExpenseCategory};
    use crate::types::Currency;

    fn expense(desc: &str, units: u64, day: u32) -> Expense {
        Expense::draft(ExpenseCategory::Customs, desc, Amount::from_major(units), Currency::USD)
            .set_created_on(BusinessDate::from_ymd(2025, 2, day).unwrap())
    }

    #[test]
    fn expenses_only_month_runs_negative() {
        let mut statement = MonthlyStatement::new("Şubat 2025");
        statement.add_expense(expense("Gümrük", 300, 10));
        statement.add_expense(expense("Liman", 200, 3));

        let txs = transactions(&statement);
        assert_eq!(txs[0].description, "Liman");
        assert_eq!(txs[1].description, "Gumruk");
        assert_eq!(
            running_balances(&txs),
            vec![SignedAmount::from_minor(-20_000), SignedAmount::from_minor(-50_000)]
        );

        let doc = render_statement(&statement, BusinessDate::from_ymd(2025, 3, 1).unwrap(), &LedgerConfig::default());
        assert_eq!(doc.file_name, "AZZA_Ekstre_Subat_2025.pdf");
        let texts = doc.texts();
        assert!(texts.contains(&"DONEM: SUBAT 2025".to_string()));
        assert!(texts.contains(&"Rapor Tarihi: 01.03.2025".to_string()));
        assert!(texts.contains(&"- 500".to_string()));
    }
}
