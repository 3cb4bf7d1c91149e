//! Walk one sale through the back office: stock two machines, invoice them,
//! take a deposit, ship, deliver, and print the resulting documents' summary.
//!
//! ```text
//! RUST_LOG=azza_ledger=debug cargo run --example walkthrough
//! ```
use azza_ledger::{
    LedgerConfig, LedgerService,
    company::{BankAccount, Company, CompanyType},
    invoice::InvoiceDraft,
    ledger::PaymentDraft,
    machine::Machine,
    shipment::{ShipmentDraft, ShipmentStatus, ShipmentUpdate},
    types::{Amount, BusinessDate, Currency, Percent},
    utils::init_tracing,
};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let temp_dir = tempfile::tempdir()?;
    let mut config = LedgerConfig::load()?;
    config.database.path = temp_dir.path().join("walkthrough.db").display().to_string();
    let service = LedgerService::open(&config)?;

    let customer = service.create_company(
        Company::draft("Kafkas Madencilik", CompanyType::Customer)
            .set_country("Azerbaijan")
            .set_address("Nizami St 41, Baku")
            .set_contact_person("Elşən Məmmədov")
            .set_phone("+994 50 000 00 00"),
    )?;
    let bank = service.create_bank_account(
        BankAccount::draft("Albaraka Türk", "AZZA IS MAKINELERI", "1002003", Currency::USD)
            .set_iban("TR12 0020 3000 0000 1002 0030 01")
            .set_swift_code("BTFHTRIS"),
    )?;

    let excavator = service.create_machine(
        Machine::draft("Komatsu", "PC300-8", "Ekskavatör", "KMTPC300-40412")
            .set_year(2015)
            .set_purchase_price(Amount::from_major(62_000), Currency::USD),
    )?;
    let loader = service.create_machine(
        Machine::draft("Caterpillar", "966H", "Loader", "CAT966H-A6J01")
            .set_year(2012)
            .set_purchase_price(Amount::from_major(48_500), Currency::USD),
    )?;

    let number = service.suggest_invoice_number(BusinessDate::today().year())?;
    let invoice = service.create_invoice(
        InvoiceDraft::new(&number)
            .set_customer(&customer.id)
            .set_bank_account(&bank.id)
            .add_machine(&excavator.id)
            .add_machine(&loader.id)
            .set_ports("Istanbul, Turkey", "Poti, Georgia")
            .set_profit_margin(Percent::whole(18))
            .set_deposit_percentage(Percent::whole(30)),
    )?;

    let deposit = invoice.deposit_amount.unwrap_or(Amount::ZERO);
    service.add_payment(PaymentDraft::new(&invoice.id, deposit).as_deposit())?;

    let shipment = service.create_shipment(
        ShipmentDraft::new(&invoice.id)
            .set_machine(&excavator.id)
            .set_shipping_company("Arkas Line")
            .set_cost(Amount::from_major(3_400), Currency::USD),
    )?;
    service.update_shipment(&shipment.id, ShipmentUpdate::status(ShipmentStatus::Delivered))?;

    let view = service.invoice_view(&invoice.id)?;
    println!(
        "invoice {} total {} {} paid {} remaining {} ({})",
        view.invoice.invoice_number,
        view.reconciliation.total.grouped(),
        view.invoice.currency,
        view.reconciliation.paid.grouped(),
        view.remaining().grouped(),
        view.status()
    );
    for machine in service.machines()? {
        println!("  {} {} [{}]", machine.brand, machine.chassis_number, machine.status);
    }

    let proforma = service.proforma_document(&invoice.id, &config)?;
    println!(
        "{}: {} page(s), sha256 {}",
        proforma.file_name,
        proforma.pages.len(),
        proforma.fingerprint()?
    );

    for month in service.monthly_statements()? {
        let statement = azza_ledger::document::render_statement(&month, BusinessDate::today(), &config);
        println!(
            "{}: revenue {} expenses {} profit {}",
            statement.file_name,
            month.total_revenue.grouped(),
            month.total_expenses.grouped(),
            month.profit()
        );
    }

    service.flush()?;
    Ok(())
}
