//! Service layer API for the back-office workflows
//!
//! Each public operation reads what it needs, stages every resulting write
//! in one [`WriteSet`] and commits it as a single sled batch. Mutating
//! operations hold the service's write lock from the first read to the
//! commit, so two sequences touching the same invoice or machine never
//! interleave within a process.
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::company::{BankAccount, Company, CompanyUpdate};
use crate::config::LedgerConfig;
use crate::document::{Document, ProformaBundle, render_proforma, render_statement};
use crate::error::{LedgerError, ValidationError};
use crate::invoice::{
    InvoiceDraft, InvoiceTermsUpdate, PaymentStatus, ProformaInvoice, ProformaInvoiceItem,
    suggest_invoice_number,
};
use crate::ledger::{Expense, ExpenseCategory, Payment, PaymentDraft, PaymentUpdate};
use crate::machine::{Machine, MachineEvent, MachineStatus, MachineUpdate};
use crate::reconcile::{
    Reconciliation, compute_deposit_paid_flag, deposit_for, line_unit_price, payments_sum,
    reconcile, settled_status,
};
use crate::reports::{
    AccountingSummary, DashboardCounts, FinancialSummary, MachineFinancials, MonthlyStatement,
    accounting_summary, dashboard_counts, invoice_financial_summary, machine_financials,
    monthly_reports,
};
use crate::shipment::{Shipment, ShipmentDraft, ShipmentStatus, ShipmentUpdate};
use crate::store::{Record, Store, Table, WriteSet};
use crate::types::{Amount, BusinessDate, TimeStamp};
use crate::utils::new_record_id;

/// An invoice with its lines, payments and payment position as of this read.
#[derive(Debug, Clone)]
pub struct InvoiceView {
    pub invoice: ProformaInvoice,
    pub items: Vec<ProformaInvoiceItem>,
    pub payments: Vec<Payment>,
    pub reconciliation: Reconciliation,
}

impl InvoiceView {
    /// Status computed from the payments, whatever the stored column says.
    pub fn status(&self) -> PaymentStatus {
        self.reconciliation.status
    }
    pub fn remaining(&self) -> Amount {
        self.reconciliation.remaining
    }
}

pub struct LedgerService {
    store: Store,
    write_lock: Mutex<()>,
}

impl LedgerService {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            store: Store::new(instance),
            write_lock: Mutex::new(()),
        }
    }

    pub fn open(config: &LedgerConfig) -> anyhow::Result<Self> {
        let db = sled::open(&config.database.path)?;
        info!(path = %config.database.path, "ledger store opened");
        Ok(Self::new(Arc::new(db)))
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        self.store.flush()?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // guards no data, so a poisoned lock is still usable
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn put_one<R: Record>(&self, record: &R) -> anyhow::Result<()> {
        let mut writes = WriteSet::new();
        writes.put(record)?;
        self.store.commit(writes)?;
        Ok(())
    }

    fn delete_one<R: Record>(&self, id: &str) -> anyhow::Result<R> {
        let record: R = self.store.require(id)?;
        let mut writes = WriteSet::new();
        writes.delete(&record);
        self.store.commit(writes)?;
        Ok(record)
    }

    /// Stage the status change `event` causes on `machine_id`. A dangling
    /// reference is logged and skipped.
    fn stage_machine_event(
        &self,
        writes: &mut WriteSet,
        machine_id: &str,
        event: MachineEvent,
    ) -> anyhow::Result<()> {
        match self.store.get::<Machine>(machine_id)? {
            Some(mut machine) => {
                let from = machine.status;
                let to = machine.transition(event);
                debug!(machine = machine_id, ?event, %from, %to, "machine status");
                writes.put(&machine)?;
            }
            None => warn!(machine = machine_id, ?event, "referenced machine not found"),
        }
        Ok(())
    }

    fn stage_invoice_machines(
        &self,
        writes: &mut WriteSet,
        invoice: &ProformaInvoice,
        items: &[ProformaInvoiceItem],
        event: MachineEvent,
    ) -> anyhow::Result<()> {
        for machine_id in invoice.machine_ids(items) {
            self.stage_machine_event(writes, &machine_id, event)?;
        }
        Ok(())
    }

    // ---- companies and bank accounts ----

    #[tracing::instrument(skip_all, fields(name = %company.name))]
    pub fn create_company(&self, mut company: Company) -> anyhow::Result<Company> {
        company.validate()?;
        company.id = new_record_id(Table::Company)?;
        company.created_at = TimeStamp::new();

        let _guard = self.lock();
        self.put_one(&company)?;
        info!(id = %company.id, kind = company.kind.as_str(), "company created");
        Ok(company)
    }

    #[tracing::instrument(skip(self, update))]
    pub fn update_company(&self, id: &str, update: CompanyUpdate) -> anyhow::Result<Company> {
        let _guard = self.lock();
        let mut company: Company = self.store.require(id)?;
        company.apply(update);
        company.validate()?;
        self.put_one(&company)?;
        Ok(company)
    }

    /// Unconditional; invoices and machines keep their reference.
    #[tracing::instrument(skip(self))]
    pub fn delete_company(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock();
        self.delete_one::<Company>(id)?;
        info!("company deleted");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(bank = %account.bank_name))]
    pub fn create_bank_account(&self, mut account: BankAccount) -> anyhow::Result<BankAccount> {
        account.validate()?;
        account.id = new_record_id(Table::BankAccount)?;
        account.created_at = TimeStamp::new();

        let _guard = self.lock();
        self.put_one(&account)?;
        info!(id = %account.id, "bank account created");
        Ok(account)
    }

    #[tracing::instrument(skip(self))]
    pub fn set_bank_account_active(&self, id: &str, active: bool) -> anyhow::Result<BankAccount> {
        let _guard = self.lock();
        let mut account: BankAccount = self.store.require(id)?;
        account.is_active = active;
        self.put_one(&account)?;
        Ok(account)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_bank_account(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock();
        self.delete_one::<BankAccount>(id)?;
        info!("bank account deleted");
        Ok(())
    }

    // ---- machines ----

    #[tracing::instrument(skip_all, fields(chassis = %machine.chassis_number))]
    pub fn create_machine(&self, mut machine: Machine) -> anyhow::Result<Machine> {
        machine.validate()?;
        machine.id = new_record_id(Table::Machine)?;
        machine.status = MachineStatus::Available;
        machine.created_at = TimeStamp::new();

        let _guard = self.lock();
        self.put_one(&machine)?;
        info!(id = %machine.id, "machine created");
        Ok(machine)
    }

    #[tracing::instrument(skip(self, update))]
    pub fn update_machine(&self, id: &str, update: MachineUpdate) -> anyhow::Result<Machine> {
        let _guard = self.lock();
        let mut machine: Machine = self.store.require(id)?;
        machine.apply(update);
        self.put_one(&machine)?;
        Ok(machine)
    }

    #[tracing::instrument(skip(self))]
    pub fn attach_machine_document(&self, id: &str, url: &str) -> anyhow::Result<Machine> {
        let _guard = self.lock();
        let mut machine: Machine = self.store.require(id)?;
        machine.documents.push(url.to_string());
        self.put_one(&machine)?;
        Ok(machine)
    }

    #[tracing::instrument(skip(self))]
    pub fn attach_machine_image(&self, id: &str, url: &str) -> anyhow::Result<Machine> {
        let _guard = self.lock();
        let mut machine: Machine = self.store.require(id)?;
        machine.images.push(url.to_string());
        self.put_one(&machine)?;
        Ok(machine)
    }

    /// Unconditional, whatever the machine's status.
    #[tracing::instrument(skip(self))]
    pub fn delete_machine(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock();
        let machine = self.delete_one::<Machine>(id)?;
        info!(status = %machine.status, "machine deleted");
        Ok(())
    }

    // ---- invoices ----

    pub fn suggest_invoice_number(&self, year: i32) -> anyhow::Result<String> {
        let last = self
            .store
            .all::<ProformaInvoice>()?
            .into_iter()
            .max_by_key(|invoice| invoice.created_at.to_datetime_utc());
        Ok(suggest_invoice_number(
            last.as_ref().map(|invoice| invoice.invoice_number.as_str()),
            year,
        ))
    }

    /// Price the selected machines, write the invoice and its lines, and
    /// reserve every machine, all in one commit.
    #[tracing::instrument(skip_all, fields(number = %draft.invoice_number))]
    pub fn create_invoice(&self, draft: InvoiceDraft) -> anyhow::Result<ProformaInvoice> {
        draft.validate()?;
        let customer_id = draft
            .customer_id
            .as_deref()
            .ok_or(ValidationError::MissingCustomer)?;
        let bank_account_id = draft
            .bank_account_id
            .as_deref()
            .ok_or(ValidationError::MissingBankAccount)?;

        let _guard = self.lock();

        // relations must exist and every machine must still be in stock
        self.store.require::<Company>(customer_id)?;
        self.store.require::<BankAccount>(bank_account_id)?;
        let machines = draft
            .machine_ids
            .iter()
            .map(|id| self.store.require::<Machine>(id))
            .collect::<Result<Vec<Machine>, _>>()?;
        if let Some(taken) = machines.iter().find(|m| m.status != MachineStatus::Available) {
            return Err(ValidationError::MachineUnavailable(taken.id.clone()).into());
        }

        // one line per machine, in selection order
        let invoice_id = new_record_id(Table::Invoice)?;
        let mut items = Vec::with_capacity(machines.len());
        for (position, machine) in machines.iter().enumerate() {
            let unit_price = line_unit_price(machine.purchase_price, draft.profit_margin);
            items.push(ProformaInvoiceItem::from_machine(
                new_record_id(Table::InvoiceItem)?,
                &invoice_id,
                position as u32,
                machine,
                unit_price,
            ));
        }
        let total: Amount = items.iter().map(|item| item.total_price).sum();

        let invoice = ProformaInvoice {
            id: invoice_id,
            invoice_number: draft.invoice_number.trim().to_string(),
            customer_id: customer_id.to_string(),
            bank_account_id: Some(bank_account_id.to_string()),
            // first selected machine as the stock list shows it, newest first
            currency: machines
                .iter()
                .max_by_key(|m| m.created_at.to_datetime_utc())
                .map(|m| m.purchase_currency)
                .unwrap_or_default(),
            unit_price: total,
            total_amount: Some(total),
            delivery_terms: Some(draft.delivery_terms.clone()),
            loading_port: draft.loading_port.clone(),
            destination_port: draft.destination_port.clone(),
            payment_terms: draft.payment_terms.clone(),
            deposit_amount: Some(deposit_for(total, draft.deposit_percentage)),
            deposit_paid: false,
            deposit_date: None,
            issue_date: draft.issue_date,
            validity_date: draft.validity_date,
            status: PaymentStatus::Pending,
            notes: draft.notes.clone(),
            machine_id: None,
            brand: None,
            model: None,
            machine_type: None,
            chassis_number: None,
            created_at: TimeStamp::new(),
            sold_manually: false,
        };

        // invoice, items, reservations
        let mut writes = WriteSet::new();
        writes.put(&invoice)?;
        for item in &items {
            writes.put(item)?;
        }
        for machine in machines {
            self.stage_machine_event(&mut writes, &machine.id, MachineEvent::InvoiceCreated)?;
        }
        self.store.commit(writes)?;

        info!(id = %invoice.id, items = items.len(), total = %total, "invoice created");
        Ok(invoice)
    }

    /// Delete the invoice and its lines and release its machines. Payments,
    /// shipments and expenses that reference it are left in place.
    #[tracing::instrument(skip(self))]
    pub fn delete_invoice(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock();
        let invoice: ProformaInvoice = self.store.require(id)?;
        let items = self.store.children::<ProformaInvoiceItem>(id)?;

        let mut writes = WriteSet::new();
        for item in &items {
            writes.delete(item);
        }
        writes.delete(&invoice);
        self.stage_invoice_machines(&mut writes, &invoice, &items, MachineEvent::InvoiceDeleted)?;
        self.store.commit(writes)?;

        info!(items = items.len(), "invoice deleted");
        Ok(())
    }

    /// Edit header fields. The status column is recomputed from the current
    /// payments on every save, unless the invoice was marked sold by hand.
    #[tracing::instrument(skip(self, update))]
    pub fn update_invoice_terms(
        &self,
        id: &str,
        update: InvoiceTermsUpdate,
    ) -> anyhow::Result<ProformaInvoice> {
        let _guard = self.lock();
        let mut invoice: ProformaInvoice = self.store.require(id)?;
        if let Some(customer_id) = update.customer_id.as_deref() {
            self.store.require::<Company>(customer_id)?;
        }
        if let Some(bank_account_id) = update.bank_account_id.as_deref() {
            self.store.require::<BankAccount>(bank_account_id)?;
        }
        invoice.apply(update);

        let payments = self.store.children::<Payment>(id)?;
        invoice.status = settled_status(&invoice, payments_sum(&payments));
        self.put_one(&invoice)?;
        Ok(invoice)
    }

    /// Close the sale by hand: the invoice is marked paid whatever the
    /// payments say, and its machines are sold.
    #[tracing::instrument(skip(self))]
    pub fn mark_invoice_sold(&self, id: &str) -> anyhow::Result<ProformaInvoice> {
        let _guard = self.lock();
        let mut invoice: ProformaInvoice = self.store.require(id)?;
        let items = self.store.children::<ProformaInvoiceItem>(id)?;
        invoice.status = PaymentStatus::Paid;
        invoice.sold_manually = true;

        let mut writes = WriteSet::new();
        writes.put(&invoice)?;
        self.stage_invoice_machines(&mut writes, &invoice, &items, MachineEvent::InvoiceMarkedSold)?;
        self.store.commit(writes)?;

        info!("invoice marked sold");
        Ok(invoice)
    }

    #[tracing::instrument(skip(self))]
    pub fn reconcile_invoice(&self, id: &str) -> anyhow::Result<Reconciliation> {
        let _guard = self.lock();
        let mut invoice: ProformaInvoice = self.store.require(id)?;
        let payments = self.store.children::<Payment>(id)?;
        let reconciliation = reconcile(&invoice, &payments);
        if reconciliation.is_stale() {
            warn!(
                stored = %reconciliation.stored_status,
                computed = %reconciliation.status,
                "stale invoice status rewritten"
            );
            invoice.status = reconciliation.status;
            self.put_one(&invoice)?;
        }
        Ok(reconciliation)
    }

    // ---- payments ----

    // payments are keyed under their invoice, so look them up by suffix
    fn require_payment(&self, id: &str) -> anyhow::Result<Payment> {
        let payment = self.store.find_child(id)?.ok_or_else(|| LedgerError::NotFound {
            table: Table::Payment.name(),
            id: id.to_string(),
        })?;
        Ok(payment)
    }

    #[tracing::instrument(skip_all, fields(invoice = %draft.proforma_invoice_id, amount = %draft.amount))]
    pub fn add_payment(&self, draft: PaymentDraft) -> anyhow::Result<(Payment, ProformaInvoice)> {
        draft.validate()?;
        let _guard = self.lock();
        let mut invoice: ProformaInvoice = self.store.require(&draft.proforma_invoice_id)?;
        let payment = draft.into_payment(new_record_id(Table::Payment)?);

        let mut payments = self.store.children::<Payment>(&invoice.id)?;
        payments.push(payment.clone());
        invoice.status = settled_status(&invoice, payments_sum(&payments));
        invoice.deposit_paid = compute_deposit_paid_flag(invoice.deposit_paid, payment.is_deposit);
        if payment.is_deposit && invoice.deposit_date.is_none() {
            invoice.deposit_date = Some(payment.payment_date);
        }

        let mut writes = WriteSet::new();
        writes.put(&payment)?;
        writes.put(&invoice)?;
        self.store.commit(writes)?;

        info!(id = %payment.id, status = %invoice.status, "payment recorded");
        Ok((payment, invoice))
    }

    /// Remove a payment and recompute the status from what remains. The
    /// deposit flag is left as it was.
    #[tracing::instrument(skip(self))]
    pub fn delete_payment(&self, payment_id: &str) -> anyhow::Result<ProformaInvoice> {
        let _guard = self.lock();
        let payment = self.require_payment(payment_id)?;
        let mut invoice: ProformaInvoice = self.store.require(&payment.proforma_invoice_id)?;

        let remaining: Vec<Payment> = self
            .store
            .children::<Payment>(&invoice.id)?
            .into_iter()
            .filter(|p| p.id != payment.id)
            .collect();
        invoice.status = settled_status(&invoice, payments_sum(&remaining));

        let mut writes = WriteSet::new();
        writes.delete(&payment);
        writes.put(&invoice)?;
        self.store.commit(writes)?;

        info!(status = %invoice.status, "payment deleted");
        Ok(invoice)
    }

    #[tracing::instrument(skip(self, update))]
    pub fn update_payment(
        &self,
        payment_id: &str,
        update: PaymentUpdate,
    ) -> anyhow::Result<(Payment, ProformaInvoice)> {
        let _guard = self.lock();
        let mut payment = self.require_payment(payment_id)?;
        let mut invoice: ProformaInvoice = self.store.require(&payment.proforma_invoice_id)?;
        payment.apply(update);

        let payments: Vec<Payment> = self
            .store
            .children::<Payment>(&invoice.id)?
            .into_iter()
            .map(|p| if p.id == payment.id { payment.clone() } else { p })
            .collect();
        invoice.status = settled_status(&invoice, payments_sum(&payments));
        invoice.deposit_paid = compute_deposit_paid_flag(invoice.deposit_paid, payment.is_deposit);

        let mut writes = WriteSet::new();
        writes.put(&payment)?;
        writes.put(&invoice)?;
        self.store.commit(writes)?;
        Ok((payment, invoice))
    }

    // ---- shipments ----

    /// The shipped machine: the one asked for, else the invoice's legacy
    /// machine, else its first line's.
    fn shipment_machine(
        &self,
        draft: &ShipmentDraft,
        invoice: &ProformaInvoice,
    ) -> anyhow::Result<String> {
        let items = self.invoice_items(&invoice.id)?;
        let covered = invoice.machine_ids(&items);
        let chosen = draft
            .machine_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| invoice.machine_id.clone())
            .or_else(|| covered.first().cloned())
            .ok_or_else(|| ValidationError::NoShipmentMachine(invoice.invoice_number.clone()))?;
        if !covered.contains(&chosen) {
            warn!(machine = %chosen, "shipped machine is not on the invoice");
        }
        Ok(chosen)
    }

    /// Open a shipment for an invoice. A non-zero cost books an unpaid
    /// transport expense, and the machine goes in transit.
    #[tracing::instrument(skip_all, fields(invoice = %draft.proforma_invoice_id))]
    pub fn create_shipment(&self, draft: ShipmentDraft) -> anyhow::Result<Shipment> {
        draft.validate()?;
        let _guard = self.lock();
        let invoice: ProformaInvoice = self.store.require(&draft.proforma_invoice_id)?;
        let machine_id = self.shipment_machine(&draft, &invoice)?;

        let port = |given: &Option<String>, fallback: &Option<String>| {
            given
                .clone()
                .filter(|p| !p.is_empty())
                .or_else(|| fallback.clone())
                .unwrap_or_default()
        };
        let shipment = Shipment {
            id: new_record_id(Table::Shipment)?,
            proforma_invoice_id: invoice.id.clone(),
            machine_id: machine_id.clone(),
            loading_port: port(&draft.loading_port, &invoice.loading_port),
            destination_port: port(&draft.destination_port, &invoice.destination_port),
            shipping_company: draft.shipping_company.clone(),
            container_number: draft.container_number.clone(),
            bill_of_lading: draft.bill_of_lading.clone(),
            loading_date: draft.loading_date,
            departure_date: draft.departure_date,
            estimated_arrival_date: draft.estimated_arrival_date,
            actual_arrival_date: None,
            delivery_date: None,
            status: ShipmentStatus::Pending,
            current_location: None,
            shipping_cost: draft.shipping_cost,
            shipping_currency: draft.shipping_currency,
            notes: draft.notes.clone(),
            created_at: TimeStamp::new(),
        };

        let mut writes = WriteSet::new();
        writes.put(&shipment)?;
        if !draft.shipping_cost.is_zero() {
            let mut expense = Expense::draft(
                ExpenseCategory::Transport,
                &draft.expense_description(),
                draft.shipping_cost,
                draft.shipping_currency,
            )
            .for_invoice(&invoice.id)
            .for_shipment(&shipment.id)
            .for_machine(&machine_id);
            expense.id = new_record_id(Table::Expense)?;
            writes.put(&expense)?;
            debug!(expense = %expense.id, cost = %draft.shipping_cost, "transport expense booked");
        }
        self.stage_machine_event(&mut writes, &machine_id, MachineEvent::ShipmentCreated)?;
        self.store.commit(writes)?;

        info!(id = %shipment.id, machine = %machine_id, "shipment created");
        Ok(shipment)
    }

    /// Remove a shipment; its machine goes back to reserved. A booked
    /// transport expense stays.
    #[tracing::instrument(skip(self))]
    pub fn delete_shipment(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock();
        let shipment: Shipment = self.store.require(id)?;

        let mut writes = WriteSet::new();
        writes.delete(&shipment);
        self.stage_machine_event(&mut writes, &shipment.machine_id, MachineEvent::ShipmentDeleted)?;
        self.store.commit(writes)?;

        info!("shipment deleted");
        Ok(())
    }

    /// Apply edits; saving with status `Delivered` sells the machine.
    #[tracing::instrument(skip(self, update))]
    pub fn update_shipment(&self, id: &str, update: ShipmentUpdate) -> anyhow::Result<Shipment> {
        let _guard = self.lock();
        let mut shipment: Shipment = self.store.require(id)?;
        shipment.apply(update);

        let mut writes = WriteSet::new();
        writes.put(&shipment)?;
        if shipment.status == ShipmentStatus::Delivered {
            self.stage_machine_event(&mut writes, &shipment.machine_id, MachineEvent::ShipmentDelivered)?;
        }
        self.store.commit(writes)?;

        info!(status = %shipment.status, "shipment updated");
        Ok(shipment)
    }

    // ---- expenses ----

    #[tracing::instrument(skip_all, fields(category = %expense.category))]
    pub fn create_expense(&self, mut expense: Expense) -> anyhow::Result<Expense> {
        expense.validate()?;
        expense.id = new_record_id(Table::Expense)?;

        let _guard = self.lock();
        self.put_one(&expense)?;
        info!(id = %expense.id, amount = %expense.amount, "expense created");
        Ok(expense)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_expense(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock();
        self.delete_one::<Expense>(id)?;
        info!("expense deleted");
        Ok(())
    }

    // ---- readers ----

    pub fn invoice(&self, id: &str) -> anyhow::Result<ProformaInvoice> {
        Ok(self.store.require(id)?)
    }

    pub fn invoice_items(&self, invoice_id: &str) -> anyhow::Result<Vec<ProformaInvoiceItem>> {
        let mut items = self.store.children::<ProformaInvoiceItem>(invoice_id)?;
        items.sort_by_key(|item| item.position);
        Ok(items)
    }

    /// Oldest first.
    pub fn invoice_payments(&self, invoice_id: &str) -> anyhow::Result<Vec<Payment>> {
        let mut payments = self.store.children::<Payment>(invoice_id)?;
        payments.sort_by_key(|p| (p.payment_date, p.created_at.to_datetime_utc()));
        Ok(payments)
    }

    pub fn invoice_view(&self, id: &str) -> anyhow::Result<InvoiceView> {
        let invoice: ProformaInvoice = self.store.require(id)?;
        let items = self.invoice_items(id)?;
        let payments = self.invoice_payments(id)?;
        let reconciliation = reconcile(&invoice, &payments);
        if reconciliation.is_stale() {
            debug!(invoice = id, stored = %reconciliation.stored_status, computed = %reconciliation.status, "stored status differs");
        }
        Ok(InvoiceView {
            invoice,
            items,
            payments,
            reconciliation,
        })
    }

    // newest issue date first
    pub fn invoices(&self) -> anyhow::Result<Vec<ProformaInvoice>> {
        let mut invoices = self.store.all::<ProformaInvoice>()?;
        invoices.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
        Ok(invoices)
    }

    // newest payment date first
    pub fn payments(&self) -> anyhow::Result<Vec<Payment>> {
        let mut payments = self.store.all::<Payment>()?;
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    pub fn machine(&self, id: &str) -> anyhow::Result<Machine> {
        Ok(self.store.require(id)?)
    }

    /// Newest first.
    pub fn machines(&self) -> anyhow::Result<Vec<Machine>> {
        let mut machines = self.store.all::<Machine>()?;
        machines.sort_by_key(|m| std::cmp::Reverse(m.created_at.to_datetime_utc()));
        Ok(machines)
    }

    pub fn machines_with_status(&self, status: MachineStatus) -> anyhow::Result<Vec<Machine>> {
        Ok(self
            .machines()?
            .into_iter()
            .filter(|m| m.status == status)
            .collect())
    }

    pub fn available_machines(&self) -> anyhow::Result<Vec<Machine>> {
        self.machines_with_status(MachineStatus::Available)
    }

    pub fn companies(&self) -> anyhow::Result<Vec<Company>> {
        let mut companies = self.store.all::<Company>()?;
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    pub fn customers(&self) -> anyhow::Result<Vec<Company>> {
        Ok(self
            .companies()?
            .into_iter()
            .filter(Company::is_customer)
            .collect())
    }

    pub fn bank_accounts(&self) -> anyhow::Result<Vec<BankAccount>> {
        let mut accounts = self.store.all::<BankAccount>()?;
        accounts.sort_by(|a, b| a.bank_name.cmp(&b.bank_name));
        Ok(accounts)
    }

    pub fn active_bank_accounts(&self) -> anyhow::Result<Vec<BankAccount>> {
        Ok(self
            .bank_accounts()?
            .into_iter()
            .filter(|a| a.is_active)
            .collect())
    }

    /// Account preselected on new invoices: the first active Albaraka account.
    pub fn preferred_bank_account(&self) -> anyhow::Result<Option<BankAccount>> {
        Ok(self
            .active_bank_accounts()?
            .into_iter()
            .find(|a| a.bank_name.to_lowercase().contains("albaraka")))
    }

    pub fn shipment(&self, id: &str) -> anyhow::Result<Shipment> {
        Ok(self.store.require(id)?)
    }

    /// Newest first.
    pub fn shipments(&self) -> anyhow::Result<Vec<Shipment>> {
        let mut shipments = self.store.all::<Shipment>()?;
        shipments.sort_by_key(|s| std::cmp::Reverse(s.created_at.to_datetime_utc()));
        Ok(shipments)
    }

    /// Newest first.
    pub fn expenses(&self) -> anyhow::Result<Vec<Expense>> {
        let mut expenses = self.store.all::<Expense>()?;
        expenses.sort_by_key(|e| std::cmp::Reverse(e.created_at.to_datetime_utc()));
        Ok(expenses)
    }

    pub fn machine_expenses(&self, machine_id: &str) -> anyhow::Result<Vec<Expense>> {
        Ok(self
            .expenses()?
            .into_iter()
            .filter(|e| e.machine_id.as_deref() == Some(machine_id))
            .collect())
    }

    // ---- reports and documents ----

    pub fn monthly_statements(&self) -> anyhow::Result<Vec<MonthlyStatement>> {
        Ok(monthly_reports(
            &self.store.all::<ProformaInvoice>()?,
            &self.store.all::<Company>()?,
            &self.store.all::<Expense>()?,
            &self.store.all::<Payment>()?,
        ))
    }

    pub fn accounting_summary(&self) -> anyhow::Result<AccountingSummary> {
        Ok(accounting_summary(
            &self.store.all::<ProformaInvoice>()?,
            &self.store.all::<Expense>()?,
            &self.store.all::<Payment>()?,
        ))
    }

    pub fn dashboard_counts(&self) -> anyhow::Result<DashboardCounts> {
        Ok(dashboard_counts(
            &self.store.all::<Machine>()?,
            &self.store.all::<ProformaInvoice>()?,
            &self.store.all::<Shipment>()?,
        ))
    }

    /// Cost and profit of a machine. The sale side comes from the most recent
    /// invoice that has it on a line (or as its legacy machine).
    pub fn machine_financials(&self, machine_id: &str) -> anyhow::Result<MachineFinancials> {
        let machine: Machine = self.store.require(machine_id)?;
        let expenses = self.machine_expenses(machine_id)?;

        let mut invoice = None;
        for candidate in self.invoices()? {
            let items = self.store.children::<ProformaInvoiceItem>(&candidate.id)?;
            if candidate.machine_ids(&items).iter().any(|id| id == machine_id) {
                invoice = Some(candidate);
                break;
            }
        }
        Ok(machine_financials(&machine, &expenses, invoice.as_ref()))
    }

    pub fn invoice_financial_summary(&self, invoice_id: &str) -> anyhow::Result<FinancialSummary> {
        let view = self.invoice_view(invoice_id)?;
        let machines = view
            .invoice
            .machine_ids(&view.items)
            .iter()
            .filter_map(|id| self.store.get::<Machine>(id).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        let expenses: Vec<Expense> = self
            .expenses()?
            .into_iter()
            .filter(|e| e.proforma_invoice_id.as_deref() == Some(invoice_id))
            .collect();
        Ok(invoice_financial_summary(
            &view.invoice,
            &machines,
            &expenses,
            &view.payments,
        ))
    }

    /// Invoice with its customer, bank account and lines, ready to render.
    /// Missing relations are left `None` for the renderer to reject.
    pub fn proforma_bundle(&self, invoice_id: &str) -> anyhow::Result<ProformaBundle> {
        let invoice: ProformaInvoice = self.store.require(invoice_id)?;
        let customer = self.store.get::<Company>(&invoice.customer_id)?;
        let bank_account = match invoice.bank_account_id.as_deref() {
            Some(id) => self.store.get::<BankAccount>(id)?,
            None => None,
        };
        let items = self.invoice_items(invoice_id)?;
        Ok(ProformaBundle {
            invoice,
            customer,
            bank_account,
            items,
        })
    }

    pub fn proforma_document(
        &self,
        invoice_id: &str,
        config: &LedgerConfig,
    ) -> anyhow::Result<Document> {
        let bundle = self.proforma_bundle(invoice_id)?;
        Ok(render_proforma(&bundle, config)?)
    }

    /// Statement for the month `YYYY-MM`, if that month has invoices.
    pub fn statement_document(
        &self,
        month_key: &str,
        report_date: BusinessDate,
        config: &LedgerConfig,
    ) -> anyhow::Result<Option<Document>> {
        Ok(self
            .monthly_statements()?
            .iter()
            .find(|month| month.month_key == month_key)
            .map(|month| render_statement(month, report_date, config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::CompanyType;
    use crate::types::{Currency, Percent};

    fn service() -> (tempfile::TempDir, LedgerService) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("ledger.db")).unwrap();
        (dir, LedgerService::new(Arc::new(db)))
    }

    fn seed(service: &LedgerService, prices: &[u64]) -> (Company, BankAccount, Vec<Machine>) {
        let customer = service
            .create_company(Company::draft("Acme Construction", CompanyType::Customer))
            .unwrap();
        let bank = service
            .create_bank_account(BankAccount::draft("Albaraka", "AZZA", "001", Currency::USD))
            .unwrap();
        let machines = prices
            .iter()
            .enumerate()
            .map(|(i, price)| {
                service
                    .create_machine(
                        Machine::draft("Volvo", "EC210", "Excavator", &format!("CH{i}"))
                            .set_purchase_price(Amount::from_major(*price), Currency::USD),
                    )
                    .unwrap()
            })
            .collect();
        (customer, bank, machines)
    }

    fn draft(number: &str, customer: &Company, bank: &BankAccount, machines: &[Machine]) -> InvoiceDraft {
        machines.iter().fold(
            InvoiceDraft::new(number)
                .set_customer(&customer.id)
                .set_bank_account(&bank.id),
            |draft, m| draft.add_machine(&m.id),
        )
    }

    #[test]
    fn unavailable_machine_blocks_invoice() {
        let (_dir, service) = service();
        let (customer, bank, machines) = seed(&service, &[1_000]);
        service
            .create_invoice(draft("2025001", &customer, &bank, &machines))
            .unwrap();

        let err = service
            .create_invoice(draft("2025002", &customer, &bank, &machines))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::MachineUnavailable(machines[0].id.clone()))
        );
        // nothing from the failed attempt was written
        assert_eq!(service.invoices().unwrap().len(), 1);
    }

    #[test]
    fn missing_customer_row_is_not_found() {
        let (_dir, service) = service();
        let (_, bank, machines) = seed(&service, &[1_000]);
        let ghost = Company {
            id: "cmp_ghost".into(),
            ..Company::draft("Ghost", CompanyType::Customer)
        };
        let err = service
            .create_invoice(draft("2025001", &ghost, &bank, &machines))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::NotFound { table: "company", .. })
        ));
        assert_eq!(
            service.machine(&machines[0].id).unwrap().status,
            MachineStatus::Available
        );
    }

    #[test]
    fn invoice_numbers_follow_latest() {
        let (_dir, service) = service();
        assert_eq!(service.suggest_invoice_number(2025).unwrap(), "2025001");

        let (customer, bank, machines) = seed(&service, &[1_000]);
        service
            .create_invoice(draft("2025041", &customer, &bank, &machines))
            .unwrap();
        assert_eq!(service.suggest_invoice_number(2025).unwrap(), "2025042");
        assert_eq!(service.suggest_invoice_number(2026).unwrap(), "2026001");
    }

    #[test]
    fn editing_terms_recomputes_status() {
        let (_dir, service) = service();
        let (customer, bank, machines) = seed(&service, &[1_000]);
        let invoice = service
            .create_invoice(draft("2025001", &customer, &bank, &machines))
            .unwrap();
        service
            .add_payment(PaymentDraft::new(&invoice.id, Amount::from_major(1_000)))
            .unwrap();

        let edited = service
            .update_invoice_terms(
                &invoice.id,
                InvoiceTermsUpdate {
                    payment_terms: Some("100% before loading".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.status, PaymentStatus::Paid);
        assert_eq!(edited.payment_terms.as_deref(), Some("100% before loading"));
    }

    #[test]
    fn stale_status_is_reconciled() {
        let (_dir, service) = service();
        let (customer, bank, machines) = seed(&service, &[1_000]);
        let invoice = service
            .create_invoice(
                draft("2025001", &customer, &bank, &machines).set_profit_margin(Percent::ZERO),
            )
            .unwrap();
        service
            .add_payment(PaymentDraft::new(&invoice.id, Amount::from_major(400)))
            .unwrap();

        // mark sold overrides the payment-derived status
        service.mark_invoice_sold(&invoice.id).unwrap();
        let view = service.invoice_view(&invoice.id).unwrap();
        assert_eq!(view.invoice.status, PaymentStatus::Paid);
        assert_eq!(view.status(), PaymentStatus::Partial);
        assert!(view.reconciliation.is_stale());

        let fixed = service.reconcile_invoice(&invoice.id).unwrap();
        assert!(fixed.is_stale());
        assert_eq!(service.invoice(&invoice.id).unwrap().status, PaymentStatus::Partial);
        assert!(!service.reconcile_invoice(&invoice.id).unwrap().is_stale());
    }

    #[test]
    fn preferred_bank_is_albaraka() {
        let (_dir, service) = service();
        service
            .create_bank_account(BankAccount::draft("Ziraat", "AZZA", "1", Currency::TRY))
            .unwrap();
        assert!(service.preferred_bank_account().unwrap().is_none());
        service
            .create_bank_account(BankAccount::draft("ALBARAKA TURK", "AZZA", "2", Currency::USD))
            .unwrap();
        assert_eq!(
            service.preferred_bank_account().unwrap().unwrap().bank_name,
            "ALBARAKA TURK"
        );
    }
}
