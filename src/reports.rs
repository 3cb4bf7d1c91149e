//! Read-side rollups: monthly statements, accounting totals and per-machine P&L
//!
//! Like the rest of the ledger, amounts are summed as raw numbers whatever
//! their currency.
use std::collections::{BTreeMap, HashMap};

use crate::company::Company;
use crate::invoice::{PaymentStatus, ProformaInvoice};
use crate::ledger::{Expense, Payment};
use crate::machine::Machine;
use crate::reconcile::{invoice_total, payments_sum, remaining_balance};
use crate::shipment::Shipment;
use crate::types::{Amount, BusinessDate, Currency, SignedAmount};

const TURKISH_MONTHS: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül", "Ekim",
    "Kasım", "Aralık",
];

pub const REPORT_MONTHS: usize = 12;

/// `Ocak 2025` style period label.
pub fn month_label(date: BusinessDate) -> String {
    let name = TURKISH_MONTHS
        .get(date.month() as usize - 1)
        .copied()
        .unwrap_or_default();
    format!("{name} {}", date.year())
}

fn profit(revenue: Amount, expenses: Amount) -> SignedAmount {
    let mut profit = revenue.signed();
    profit.debit(expenses);
    profit
}

fn margin(profit: SignedAmount, revenue: Amount) -> f64 {
    crate::types::Percent::ratio(profit, revenue).unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementInvoice {
    pub invoice: ProformaInvoice,
    pub customer_name: Option<String>,
}

/// One month of activity as printed on the account statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyStatement {
    pub month_key: String,
    pub label: String,
    pub invoices: Vec<StatementInvoice>,
    pub expenses: Vec<Expense>,
    pub payments: Vec<Payment>,
    pub total_revenue: Amount,
    pub total_expenses: Amount,
}

impl MonthlyStatement {
    pub fn new(label: &str) -> Self {
        Self {
            month_key: String::new(),
            label: label.to_string(),
            invoices: vec![],
            expenses: vec![],
            payments: vec![],
            total_revenue: Amount::ZERO,
            total_expenses: Amount::ZERO,
        }
    }

    pub fn add_invoice(&mut self, invoice: ProformaInvoice, customer_name: Option<String>) {
        self.total_revenue += invoice_total(&invoice);
        self.invoices.push(StatementInvoice {
            invoice,
            customer_name,
        });
    }

    pub fn add_expense(&mut self, expense: Expense) {
        self.total_expenses += expense.amount;
        self.expenses.push(expense);
    }

    pub fn profit(&self) -> SignedAmount {
        profit(self.total_revenue, self.total_expenses)
    }

    pub fn profit_margin(&self) -> f64 {
        margin(self.profit(), self.total_revenue)
    }

    pub fn collected(&self) -> Amount {
        payments_sum(&self.payments)
    }
}

/// Group activity by the `YYYY-MM` of each invoice's issue date.
///
/// Only months with at least one invoice appear; expenses (by booking day) and
/// payments (by payment date) falling in other months are left out. The most
/// recent [`REPORT_MONTHS`] months are returned oldest first, invoices within
/// a month newest first.
pub fn monthly_reports(
    invoices: &[ProformaInvoice],
    companies: &[Company],
    expenses: &[Expense],
    payments: &[Payment],
) -> Vec<MonthlyStatement> {
    let names: HashMap<&str, &str> = companies
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let mut sorted: Vec<&ProformaInvoice> = invoices.iter().collect();
    sorted.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));

    let mut months: BTreeMap<String, MonthlyStatement> = BTreeMap::new();
    for invoice in sorted {
        let key = invoice.issue_date.month_key();
        let month = months.entry(key.clone()).or_insert_with(|| MonthlyStatement {
            month_key: key,
            ..MonthlyStatement::new(&month_label(invoice.issue_date))
        });
        let customer = names.get(invoice.customer_id.as_str()).map(|n| n.to_string());
        month.add_invoice(invoice.clone(), customer);
    }

    for expense in expenses {
        if let Some(month) = months.get_mut(&expense.created_on.month_key()) {
            month.add_expense(expense.clone());
        }
    }
    for payment in payments {
        if let Some(month) = months.get_mut(&payment.payment_date.month_key()) {
            month.payments.push(payment.clone());
        }
    }

    let skip = months.len().saturating_sub(REPORT_MONTHS);
    months.into_values().skip(skip).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountingSummary {
    pub total_revenue: Amount,
    pub total_expenses: Amount,
    pub total_collected: Amount,
    pub gross_profit: SignedAmount,
    pub profit_margin: f64,
    /// Revenue not yet collected. Negative when customers overpaid.
    pub pending_payments: SignedAmount,
}

pub fn accounting_summary(
    invoices: &[ProformaInvoice],
    expenses: &[Expense],
    payments: &[Payment],
) -> AccountingSummary {
    let total_revenue: Amount = invoices.iter().map(invoice_total).sum();
    let total_expenses: Amount = expenses.iter().map(|e| e.amount).sum();
    let total_collected = payments_sum(payments);
    let gross_profit = profit(total_revenue, total_expenses);

    AccountingSummary {
        total_revenue,
        total_expenses,
        total_collected,
        gross_profit,
        profit_margin: margin(gross_profit, total_revenue),
        pending_payments: profit(total_revenue, total_collected),
    }
}

/// Cost and, once invoiced, profit of a single machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFinancials {
    pub purchase_price: Amount,
    pub purchase_currency: Currency,
    pub total_expenses: Amount,
    pub expense_count: usize,
    pub total_cost: Amount,
    pub sale_price: Option<Amount>,
    pub sale_currency: Option<Currency>,
    pub invoice_number: Option<String>,
    /// `None` until the machine is on an invoice.
    pub gross_profit: Option<SignedAmount>,
}

impl MachineFinancials {
    pub fn is_profitable(&self) -> Option<bool> {
        self.gross_profit.map(|p| !p.is_negative())
    }
}

/// The sale price is the invoice's total, so a multi-machine invoice counts
/// in full against each of its machines.
pub fn machine_financials(
    machine: &Machine,
    expenses: &[Expense],
    invoice: Option<&ProformaInvoice>,
) -> MachineFinancials {
    let purchase_price = machine.purchase_price.unwrap_or(Amount::ZERO);
    let total_expenses: Amount = expenses.iter().map(|e| e.amount).sum();
    let total_cost = purchase_price + total_expenses;
    let sale_price = invoice.map(|inv| inv.total_amount.unwrap_or(Amount::ZERO));

    MachineFinancials {
        purchase_price,
        purchase_currency: machine.purchase_currency,
        total_expenses,
        expense_count: expenses.len(),
        total_cost,
        sale_price,
        sale_currency: invoice.map(|inv| inv.currency),
        invoice_number: invoice.map(|inv| inv.invoice_number.clone()),
        gross_profit: sale_price.map(|sale| profit(sale, total_cost)),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub machines: usize,
    pub invoices: usize,
    pub active_shipments: usize,
    pub machines_in_stock: usize,
}

pub fn dashboard_counts(
    machines: &[Machine],
    invoices: &[ProformaInvoice],
    shipments: &[Shipment],
) -> DashboardCounts {
    DashboardCounts {
        machines: machines.len(),
        invoices: invoices.len(),
        active_shipments: shipments.iter().filter(|s| s.status.is_active()).count(),
        machines_in_stock: machines.iter().filter(|m| m.status.is_in_stock()).count(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinancialSummary {
    pub proforma_invoice_id: String,
    pub total_revenue: Amount,
    pub revenue_currency: Currency,
    pub purchase_cost: Amount,
    pub total_expenses: Amount,
    pub gross_profit: SignedAmount,
    pub profit_margin: f64,
    pub total_paid: Amount,
    pub balance_due: Amount,
    pub status: PaymentStatus,
    pub year: i32,
    pub month: u32,
}

/// `machines` are the invoice's machines (for purchase cost), `expenses` the
/// ones booked against it.
pub fn invoice_financial_summary(
    invoice: &ProformaInvoice,
    machines: &[Machine],
    expenses: &[Expense],
    payments: &[Payment],
) -> FinancialSummary {
    let total_revenue = invoice_total(invoice);
    let purchase_cost: Amount = machines.iter().filter_map(|m| m.purchase_price).sum();
    let total_expenses: Amount = expenses.iter().map(|e| e.amount).sum();
    let gross_profit = profit(total_revenue, purchase_cost + total_expenses);
    let total_paid = payments_sum(payments);

    FinancialSummary {
        proforma_invoice_id: invoice.id.clone(),
        total_revenue,
        revenue_currency: invoice.currency,
        purchase_cost,
        total_expenses,
        gross_profit,
        profit_margin: margin(gross_profit, total_revenue),
        total_paid,
        balance_due: remaining_balance(invoice, total_paid),
        status: crate::reconcile::compute_invoice_status(total_revenue, total_paid),
        year: invoice.issue_date.year(),
        month: invoice.issue_date.month(),
    }
}
