//! Proforma invoice layout
use crate::company::{BankAccount, Company};
use crate::config::LedgerConfig;
use crate::error::DocumentError;
use crate::invoice::{ProformaInvoice, ProformaInvoiceItem};
use crate::reconcile::invoice_total;

use super::layout::{CellInput, Flow, StyleOverride, TableSpec, wrap_text};
use super::model::{
    Align, CellStyle, Document, Element, MARGIN, PAGE_HEIGHT, PAGE_WIDTH, Rgb, Stroke, TextStyle,
};
use super::normalize::{normalize_opt, normalize_text};

const RIGHT_EDGE: f32 = PAGE_WIDTH - MARGIN;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const LETTERHEAD_X: f32 = 50.0;
const CONSIGNEE_Y: f32 = 45.0;
const ITEMS_Y: f32 = 90.0;
const ADDRESS_WIDTH: f32 = 160.0;
const LINE_STEP: f32 = 4.0;

/// Everything printed on one proforma invoice.
#[derive(Debug, Clone)]
pub struct ProformaBundle {
    pub invoice: ProformaInvoice,
    pub customer: Option<Company>,
    pub bank_account: Option<BankAccount>,
    pub items: Vec<ProformaInvoiceItem>,
}

pub fn file_name(invoice_number: &str) -> String {
    format!("Proforma_{}.pdf", normalize_text(invoice_number))
}

fn text(flow: &mut Flow, x: f32, y: f32, text: impl Into<String>, style: TextStyle) {
    flow.push(Element::Text {
        x,
        y,
        text: text.into(),
        style,
    });
}

fn letterhead(flow: &mut Flow, invoice: &ProformaInvoice, config: &LedgerConfig) {
    let head = &config.letterhead;
    if let Some(logo) = &head.logo {
        flow.push(Element::Image {
            source: logo.clone(),
            x: MARGIN,
            y: 8.0,
            width: 30.0,
            height: 30.0,
        });
    }
    for (line, y) in head.name_lines.iter().zip([15.0, 21.0]) {
        text(flow, LETTERHEAD_X, y, line.clone(), TextStyle::bold(14.0));
    }
    text(flow, LETTERHEAD_X, 26.0, head.address.clone(), TextStyle::normal(9.0));
    text(flow, LETTERHEAD_X, 31.0, head.phone.clone(), TextStyle::normal(9.0));

    let right = TextStyle::normal(10.0).aligned(Align::Right);
    text(flow, RIGHT_EDGE, 15.0, format!("Date: {}", invoice.issue_date.format_en_gb()), right);
    text(
        flow,
        RIGHT_EDGE,
        22.0,
        format!("Invoice No: {}", normalize_text(&invoice.invoice_number)),
        right,
    );
}

fn consignee(flow: &mut Flow, customer: &Company) {
    text(flow, MARGIN, CONSIGNEE_Y, "Consignee", TextStyle::bold(10.0));
    flow.push(Element::Rect {
        x: MARGIN,
        y: CONSIGNEE_Y + 2.0,
        width: CONTENT_WIDTH,
        height: 35.0,
        stroke: Stroke::black(0.5),
    });
    text(flow, 18.0, CONSIGNEE_Y + 8.0, normalize_text(&customer.name), TextStyle::bold(10.0));

    let style = TextStyle::normal(9.0);
    let mut y = CONSIGNEE_Y + 13.0;
    if let Some(address) = normalize_opt(customer.address.as_deref()) {
        for line in wrap_text(&address, ADDRESS_WIDTH, style.size) {
            text(flow, 18.0, y, line, style);
            y += LINE_STEP;
        }
    }
    let fields = [
        normalize_opt(customer.country.as_deref()),
        normalize_opt(customer.tax_number.as_deref()).map(|tax| format!("TAX ID: {tax}")),
        normalize_opt(customer.contact_person.as_deref()),
        normalize_opt(customer.email.as_deref()).map(|email| format!("Email: {email}")),
        normalize_opt(customer.phone.as_deref()).map(|phone| format!("Phone/Whatsapp: {phone}")),
    ];
    for field in fields.into_iter().flatten() {
        text(flow, 18.0, y, field, style);
        y += LINE_STEP;
    }
}

/// Description cell: `USED <TYPE>`, brand and model, then the year.
fn description(machine_type: &str, brand: &str, model: &str, year: Option<u16>) -> String {
    let mut out = format!(
        "USED {}\n{} {}",
        normalize_text(machine_type).to_uppercase(),
        normalize_text(brand),
        normalize_text(model)
    );
    if let Some(year) = year {
        out.push_str(&format!("\nManufacturing Year: {year}"));
    }
    out
}

fn item_rows(bundle: &ProformaBundle) -> Result<Vec<Vec<CellInput>>, DocumentError> {
    let invoice = &bundle.invoice;
    let currency = invoice.currency.as_str();
    let port = invoice
        .destination_port
        .as_deref()
        .and_then(|port| port.split(',').next())
        .map(|name| normalize_text(name.trim()))
        .filter(|name| !name.is_empty());

    let mut rows: Vec<(String, String, u32, String, String)> = bundle
        .items
        .iter()
        .map(|item| {
            (
                normalize_text(&item.chassis_number),
                description(&item.machine_type, &item.brand, &item.model, item.year),
                item.quantity,
                item.unit_price.to_string(),
                item.total_price.to_string(),
            )
        })
        .collect();

    // invoices from before line items carry one machine inline
    if rows.is_empty() {
        let brand = invoice.brand.as_deref().ok_or_else(|| DocumentError::NoItems(invoice.invoice_number.clone()))?;
        rows.push((
            normalize_text(invoice.chassis_number.as_deref().unwrap_or_default()),
            description(
                invoice.machine_type.as_deref().unwrap_or_default(),
                brand,
                invoice.model.as_deref().unwrap_or_default(),
                None,
            ),
            1,
            invoice.unit_price.to_string(),
            invoice.unit_price.to_string(),
        ));
    }

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(index, (chassis, desc, quantity, unit, total))| {
            let desc = match (&port, index) {
                (Some(port), 0) => format!("{port}\n{desc}"),
                _ => desc,
            };
            vec![
                chassis.into(),
                desc.into(),
                format!("{quantity}\nUnits").into(),
                format!("{unit}\n{currency}").into(),
                format!("{total}\n{currency}").into(),
            ]
        })
        .collect())
}

fn items_table(flow: &mut Flow, bundle: &ProformaBundle) -> Result<f32, DocumentError> {
    let mut spec = TableSpec::new(MARGIN, vec![25.0, 93.0, 12.0, 25.0, 25.0]);
    spec.base = CellStyle {
        line_width: 0.5,
        ..CellStyle::default()
    };
    spec.head_style = StyleOverride::new()
        .fill(Rgb::gray(220))
        .bold()
        .size(8.0)
        .align(Align::Center)
        .padding(2.0);
    spec.body_style = StyleOverride::new().size(8.0).padding(2.0);
    spec.foot_style = StyleOverride::new()
        .fill(Rgb::gray(240))
        .bold()
        .size(10.0)
        .align(Align::Center);
    spec.column_styles = vec![
        StyleOverride::new().align(Align::Center).size(7.0),
        StyleOverride::new().align(Align::Left).normal(),
        StyleOverride::new().align(Align::Center).size(8.0),
        StyleOverride::new().align(Align::Center).normal(),
        StyleOverride::new().align(Align::Center).bold(),
    ];

    let head = vec![
        ["CHASIS NO", "DESCRIPTION", "QTY", "UNIT PRICE", "TOTAL PRICE"]
            .map(CellInput::from)
            .to_vec(),
    ];
    let body = item_rows(bundle)?;
    let total = invoice_total(&bundle.invoice);
    let foot = vec![vec![
        "".into(),
        "GRAND TOTAL".into(),
        "".into(),
        "".into(),
        format!("{total}\n{}", bundle.invoice.currency).into(),
    ]];

    Ok(flow.table(&spec, &head, &body, &foot, ITEMS_Y))
}

fn payment_terms(flow: &mut Flow, invoice: &ProformaInvoice, config: &LedgerConfig) {
    flow.ensure_space(16.0);
    let y = flow.y;
    let terms = normalize_opt(invoice.payment_terms.as_deref())
        .unwrap_or_else(|| config.invoice.payment_terms.clone());
    text(flow, MARGIN, y, "Terms of Payment:", TextStyle::bold(10.0));
    text(flow, 55.0, y, terms, TextStyle::normal(9.0));

    let mut y = y;
    if let Some(deposit) = invoice.deposit_amount.filter(|d| !d.is_zero()) {
        y += 6.0;
        text(
            flow,
            55.0,
            y,
            format!("Deposit Amount: {deposit} {}", invoice.currency),
            TextStyle::bold(9.0),
        );
    }
    flow.y = y + 10.0;
}

fn bank_table(flow: &mut Flow, bank: &BankAccount, config: &LedgerConfig) -> f32 {
    let mut spec = TableSpec::new(MARGIN, vec![45.0, 135.0]);
    spec.base = CellStyle {
        line_width: 0.5,
        ..CellStyle::default()
    };
    spec.head_style = StyleOverride::new().fill(Rgb::WHITE).bold().size(10.0);
    spec.body_style = StyleOverride::new().size(8.0);
    spec.column_styles = vec![StyleOverride::new().bold().fill(Rgb::gray(245))];

    let dash = |value: Option<&str>| normalize_opt(value).unwrap_or_else(|| "-".to_string());
    let head = vec![vec!["BANK DETAILS".into(), "".into()]];
    let body: Vec<Vec<CellInput>> = [
        ("BANK NAME", normalize_text(&bank.bank_name)),
        ("BANK ADRES", config.bank.address.clone()),
        ("ACCOUNT NAME", normalize_text(&bank.account_holder)),
        ("IBAN", dash(bank.iban.as_deref())),
        ("BRANCH", config.bank.branch.clone()),
        ("SWIFT CODE", dash(bank.swift_code.as_deref())),
    ]
    .into_iter()
    .map(|(label, value)| vec![label.into(), value.into()])
    .collect();

    let start = flow.y;
    flow.table(&spec, &head, &body, &[], start)
}

fn closing(flow: &mut Flow, config: &LedgerConfig) {
    if let Some(signature) = &config.invoice.signature {
        flow.ensure_space(31.0);
        let y = flow.y + 15.0;
        flow.push(Element::Image {
            source: signature.clone(),
            x: 140.0,
            y,
            width: 50.0,
            height: 16.0,
        });
        flow.y = y + 16.0;
    }

    // the footer sits at the page bottom and must not overlap the content
    if flow.y > PAGE_HEIGHT - 20.0 {
        flow.new_page();
    }
    let footer_y = PAGE_HEIGHT - 20.0;
    flow.push(Element::Line {
        from: (MARGIN, footer_y),
        to: (RIGHT_EDGE, footer_y),
        stroke: Stroke::black(0.5),
    });
    let center = PAGE_WIDTH / 2.0;
    text(
        flow,
        center,
        footer_y + 6.0,
        config.invoice.validity_notice(),
        TextStyle::italic(8.0).aligned(Align::Center).colored(Rgb::gray(80)),
    );
    text(
        flow,
        center,
        footer_y + 11.0,
        config.letterhead.legal_name.clone(),
        TextStyle::bold(9.0).aligned(Align::Center),
    );
    text(
        flow,
        center,
        footer_y + 15.0,
        config.letterhead.tagline.clone(),
        TextStyle::normal(7.0).aligned(Align::Center),
    );
}

/// Lay out the proforma invoice. Fails before drawing anything when the
/// customer or bank account is missing.
#[tracing::instrument(skip_all, fields(invoice = %bundle.invoice.invoice_number))]
pub fn render_proforma(bundle: &ProformaBundle, config: &LedgerConfig) -> Result<Document, DocumentError> {
    let invoice = &bundle.invoice;
    let customer = bundle.customer.as_ref().ok_or_else(|| DocumentError::MissingRelation {
        relation: "customer",
        invoice_number: invoice.invoice_number.clone(),
    })?;
    let bank = bundle.bank_account.as_ref().ok_or_else(|| DocumentError::MissingRelation {
        relation: "bank account",
        invoice_number: invoice.invoice_number.clone(),
    })?;

    let mut flow = Flow::new();
    letterhead(&mut flow, invoice, config);
    consignee(&mut flow, customer);
    items_table(&mut flow, bundle)?;
    flow.y += 10.0;
    payment_terms(&mut flow, invoice, config);
    bank_table(&mut flow, bank, config);
    closing(&mut flow, config);

    let document = flow.finish(file_name(&invoice.invoice_number));
    tracing::debug!(pages = document.pages.len(), "proforma laid out");
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::CompanyType;
    use crate::invoice::PaymentStatus;
    use crate::machine::Machine;
    use crate::types::{Amount, BusinessDate, Currency, TimeStamp};

    fn invoice() -> ProformaInvoice {
        ProformaInvoice {
            id: "inv_1".into(),
            invoice_number: "2025001".into(),
            customer_id: "cmp_1".into(),
            bank_account_id: Some("bnk_1".into()),
            currency: Currency::USD,
            unit_price: Amount::from_major(13_000),
            total_amount: Some(Amount::from_major(13_000)),
            delivery_terms: Some("FOB".into()),
            loading_port: Some("Istanbul".into()),
            destination_port: Some("Poti, Georgia".into()),
            payment_terms: None,
            deposit_amount: Some(Amount::from_major(2_600)),
            deposit_paid: false,
            deposit_date: None,
            issue_date: BusinessDate::from_ymd(2025, 3, 4).unwrap(),
            validity_date: None,
            status: PaymentStatus::Pending,
            notes: None,
            machine_id: None,
            brand: None,
            model: None,
            machine_type: None,
            chassis_number: None,
            created_at: TimeStamp::new(),
            sold_manually: false,
        }
    }

    fn bundle() -> ProformaBundle {
        let mut machine = Machine::draft("Komatsu", "PC200", "Ekskavatör", "KMT-0042").set_year(2016);
        machine.id = "mch_1".into();
        let item = ProformaInvoiceItem::from_machine(
            "itm_1".into(),
            "inv_1",
            0,
            &machine,
            Amount::from_major(13_000),
        );
        ProformaBundle {
            invoice: invoice(),
            customer: Some(
                Company::draft("Güneş İnşaat", CompanyType::Customer)
                    .set_address("Çırağan Cad. No:5 Beşiktaş")
                    .set_country("Türkiye"),
            ),
            bank_account: Some(
                BankAccount::draft("Ziraat Bankası", "AZZA İş Makineleri", "123", Currency::USD)
                    .set_iban("TR00 0000"),
            ),
            items: vec![item],
        }
    }

    #[test]
    fn missing_relations_fail_fast() {
        let mut b = bundle();
        b.customer = None;
        assert_eq!(
            render_proforma(&b, &LedgerConfig::default()),
            Err(DocumentError::MissingRelation {
                relation: "customer",
                invoice_number: "2025001".into()
            })
        );

        let mut b = bundle();
        b.bank_account = None;
        assert!(matches!(
            render_proforma(&b, &LedgerConfig::default()),
            Err(DocumentError::MissingRelation { relation: "bank account", .. })
        ));
    }

    #[test]
    fn user_text_is_normalized() {
        let doc = render_proforma(&bundle(), &LedgerConfig::default()).unwrap();
        let texts = doc.texts();
        assert!(texts.contains(&"Gunes Insaat".to_string()));
        assert!(texts.contains(&"Ciragan Cad. No:5 Besiktas".to_string()));
        assert!(texts.contains(&"Turkiye".to_string()));
        assert!(texts.contains(&"Ziraat Bankasi".to_string()));
        assert!(texts.contains(&"USED EKSKAVATOR".to_string()));
        assert!(texts.iter().all(|t| normalize_text(t) == *t));
        assert_eq!(doc.file_name, "Proforma_2025001.pdf");
    }

    #[test]
    fn port_only_on_first_row() {
        let mut b = bundle();
        let mut second = b.items[0].clone();
        second.id = "itm_2".into();
        second.position = 1;
        b.items.push(second);

        let doc = render_proforma(&b, &LedgerConfig::default()).unwrap();
        let items = doc.tables().next().unwrap();
        assert_eq!(items.y, ITEMS_Y);
        assert!(items.body[0].texts()[1].starts_with("Poti\nUSED EKSKAVATOR"));
        assert!(items.body[1].texts()[1].starts_with("USED EKSKAVATOR"));
        assert_eq!(items.body[0].texts()[2], "1\nUnits");
        assert_eq!(items.foot[0].texts()[1], "GRAND TOTAL");
        assert_eq!(items.foot[0].texts()[4], "13000\nUSD");
    }

    #[test]
    fn deposit_line_and_default_terms() {
        let doc = render_proforma(&bundle(), &LedgerConfig::default()).unwrap();
        let texts = doc.texts();
        assert!(texts.contains(&"30% deposit, 70% before delivery".to_string()));
        assert!(texts.contains(&"Deposit Amount: 2600 USD".to_string()));
        assert!(texts.contains(&"Invoice No: 2025001".to_string()));
        assert!(texts.contains(&"Date: 04/03/2025".to_string()));
    }

    #[test]
    fn amounts_print_in_whole_units() {
        let mut b = bundle();
        b.items[0].unit_price = Amount::from_minor(160_493);
        b.items[0].total_price = Amount::from_minor(160_493);
        b.invoice.total_amount = Some(Amount::from_minor(160_493));
        b.invoice.deposit_amount = Some(Amount::from_minor(48_148));

        let doc = render_proforma(&b, &LedgerConfig::default()).unwrap();
        let items = doc.tables().next().unwrap();
        assert_eq!(items.body[0].texts()[3], "1605\nUSD");
        assert_eq!(items.body[0].texts()[4], "1605\nUSD");
        assert_eq!(items.foot[0].texts()[4], "1605\nUSD");
        assert!(doc.texts().contains(&"Deposit Amount: 481 USD".to_string()));
    }

    #[test]
    fn legacy_invoice_without_items() {
        let mut b = bundle();
        b.items.clear();
        b.invoice.brand = Some("Hitachi".into());
        b.invoice.model = Some("ZX200".into());
        b.invoice.machine_type = Some("excavator".into());
        b.invoice.chassis_number = Some("HTC1".into());
        let doc = render_proforma(&b, &LedgerConfig::default()).unwrap();
        let items = doc.tables().next().unwrap();
        assert_eq!(items.body.len(), 1);
        assert_eq!(items.body[0].texts()[0], "HTC1");

        b.invoice.brand = None;
        assert_eq!(
            render_proforma(&b, &LedgerConfig::default()),
            Err(DocumentError::NoItems("2025001".into()))
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let config = LedgerConfig::default();
        let a = render_proforma(&bundle(), &config).unwrap();
        let b = render_proforma(&bundle(), &config).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
