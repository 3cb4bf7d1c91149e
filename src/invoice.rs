//! Proforma invoices and their line items
use std::fmt;
use std::str::FromStr;

use chrono::Utc;

use crate::error::ValidationError;
use crate::machine::Machine;
use crate::store::{Record, Table};
use crate::types::{Amount, BusinessDate, Currency, Percent, TimeStamp};

/// Payment state of an invoice, derived from the payments recorded against it.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    #[n(0)]
    #[default]
    Pending,
    #[n(1)]
    Partial,
    #[n(2)]
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
    /// Label printed on Turkish statements.
    pub fn statement_label(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "ODENDI",
            PaymentStatus::Partial => "KISMI",
            PaymentStatus::Pending => "BEKLIYOR",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(ValidationError::UnknownVariant {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ProformaInvoice {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub invoice_number: String,
    #[n(2)]
    pub customer_id: String,
    #[n(3)]
    pub bank_account_id: Option<String>,
    #[n(4)]
    pub currency: Currency,
    #[n(5)]
    pub unit_price: Amount,
    #[n(6)]
    pub total_amount: Option<Amount>,
    #[n(7)]
    pub delivery_terms: Option<String>,
    #[n(8)]
    pub loading_port: Option<String>,
    #[n(9)]
    pub destination_port: Option<String>,
    #[n(10)]
    pub payment_terms: Option<String>,
    #[n(11)]
    pub deposit_amount: Option<Amount>,
    #[n(12)]
    pub deposit_paid: bool,
    #[n(13)]
    pub deposit_date: Option<BusinessDate>,
    #[n(14)]
    pub issue_date: BusinessDate,
    #[n(15)]
    pub validity_date: Option<BusinessDate>,
    #[n(16)]
    pub status: PaymentStatus, // stored copy, see reconcile::reconcile
    #[n(17)]
    pub notes: Option<String>,
    // Single-machine fields from before invoices carried items. Still read
    // when an invoice has no items.
    #[n(18)]
    pub machine_id: Option<String>,
    #[n(19)]
    pub brand: Option<String>,
    #[n(20)]
    pub model: Option<String>,
    #[n(21)]
    pub machine_type: Option<String>,
    #[n(22)]
    pub chassis_number: Option<String>,
    #[n(23)]
    pub created_at: TimeStamp<Utc>,
    // set by mark-as-sold; pins the status to paid whatever the payments say
    #[n(24)]
    pub sold_manually: bool,
}

impl ProformaInvoice {
    /// Machines this invoice covers: the items' machines, or the legacy
    /// single machine when there are no items.
    pub fn machine_ids(&self, items: &[ProformaInvoiceItem]) -> Vec<String> {
        if !items.is_empty() {
            return items.iter().map(|item| item.machine_id.clone()).collect();
        }
        self.machine_id.iter().cloned().collect()
    }

    pub(crate) fn apply(&mut self, update: InvoiceTermsUpdate) {
        let InvoiceTermsUpdate {
            customer_id,
            bank_account_id,
            delivery_terms,
            loading_port,
            destination_port,
            payment_terms,
            deposit_amount,
            deposit_paid,
            validity_date,
            notes,
        } = update;
        if let Some(customer_id) = customer_id {
            self.customer_id = customer_id;
        }
        self.bank_account_id = bank_account_id.or(self.bank_account_id.take());
        self.delivery_terms = delivery_terms.or(self.delivery_terms.take());
        self.loading_port = loading_port.or(self.loading_port.take());
        self.destination_port = destination_port.or(self.destination_port.take());
        self.payment_terms = payment_terms.or(self.payment_terms.take());
        self.deposit_amount = deposit_amount.or(self.deposit_amount);
        self.deposit_paid = deposit_paid.unwrap_or(self.deposit_paid);
        self.validity_date = validity_date.or(self.validity_date);
        self.notes = notes.or(self.notes.take());
    }
}

impl Record for ProformaInvoice {
    const TABLE: Table = Table::Invoice;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Snapshot of a machine's descriptive fields at invoice time plus its price line.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ProformaInvoiceItem {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub proforma_invoice_id: String,
    #[n(2)]
    pub machine_id: String,
    #[n(3)]
    pub position: u32, // order of selection, drives document row order
    #[n(4)]
    pub brand: String,
    #[n(5)]
    pub model: String,
    #[n(6)]
    pub machine_type: String,
    #[n(7)]
    pub chassis_number: String,
    #[n(8)]
    pub year: Option<u16>,
    #[n(9)]
    pub unit_price: Amount,
    #[n(10)]
    pub quantity: u32,
    #[n(11)]
    pub total_price: Amount,
    #[n(12)]
    pub notes: Option<String>,
}

impl ProformaInvoiceItem {
    pub fn from_machine(
        id: String,
        invoice_id: &str,
        position: u32,
        machine: &Machine,
        unit_price: Amount,
    ) -> Self {
        let quantity = 1;
        Self {
            id,
            proforma_invoice_id: invoice_id.to_string(),
            machine_id: machine.id.clone(),
            position,
            brand: machine.brand.clone(),
            model: machine.model.clone(),
            machine_type: machine.machine_type.clone(),
            chassis_number: machine.chassis_number.clone(),
            year: machine.year,
            unit_price,
            quantity,
            total_price: unit_price.times(quantity),
            notes: None,
        }
    }
}

impl Record for ProformaInvoiceItem {
    const TABLE: Table = Table::InvoiceItem;

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> Option<&str> {
        Some(&self.proforma_invoice_id)
    }
}

/// Request to create a proforma invoice from a selection of available machines.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub customer_id: Option<String>,
    pub bank_account_id: Option<String>,
    pub machine_ids: Vec<String>,
    pub delivery_terms: String,
    pub loading_port: Option<String>,
    pub destination_port: Option<String>,
    pub payment_terms: Option<String>,
    pub profit_margin: Percent,
    pub deposit_percentage: Percent,
    pub issue_date: BusinessDate,
    pub validity_date: Option<BusinessDate>,
    pub notes: Option<String>,
}

impl Default for InvoiceDraft {
    fn default() -> Self {
        Self {
            invoice_number: String::new(),
            customer_id: None,
            bank_account_id: None,
            machine_ids: vec![],
            delivery_terms: "FOB".to_string(),
            loading_port: None,
            destination_port: None,
            payment_terms: None,
            profit_margin: Percent::ZERO,
            deposit_percentage: Percent::ZERO,
            issue_date: BusinessDate::today(),
            validity_date: None,
            notes: None,
        }
    }
}

impl InvoiceDraft {
    pub fn new(invoice_number: &str) -> Self {
        Self {
            invoice_number: invoice_number.to_string(),
            ..Self::default()
        }
    }
    pub fn set_customer(mut self, customer_id: &str) -> Self {
        self.customer_id = Some(customer_id.to_string());
        self
    }
    pub fn set_bank_account(mut self, bank_account_id: &str) -> Self {
        self.bank_account_id = Some(bank_account_id.to_string());
        self
    }
    pub fn add_machine(mut self, machine_id: &str) -> Self {
        self.machine_ids.push(machine_id.to_string());
        self
    }
    pub fn set_delivery_terms(mut self, terms: &str) -> Self {
        self.delivery_terms = terms.to_string();
        self
    }
    pub fn set_ports(mut self, loading: &str, destination: &str) -> Self {
        self.loading_port = Some(loading.to_string());
        self.destination_port = Some(destination.to_string());
        self
    }
    pub fn set_payment_terms(mut self, terms: &str) -> Self {
        self.payment_terms = Some(terms.to_string());
        self
    }
    pub fn set_profit_margin(mut self, margin: Percent) -> Self {
        self.profit_margin = margin;
        self
    }
    pub fn set_deposit_percentage(mut self, pct: Percent) -> Self {
        self.deposit_percentage = pct;
        self
    }
    pub fn set_issue_date(mut self, date: BusinessDate) -> Self {
        self.issue_date = date;
        self
    }
    pub fn set_validity_date(mut self, date: BusinessDate) -> Self {
        self.validity_date = Some(date);
        self
    }

    /// Checks required selections in the order the form reported them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.machine_ids.is_empty() {
            return Err(ValidationError::NoMachinesSelected);
        }
        if self.customer_id.as_deref().is_none_or(str::is_empty) {
            return Err(ValidationError::MissingCustomer);
        }
        if self.bank_account_id.as_deref().is_none_or(str::is_empty) {
            return Err(ValidationError::MissingBankAccount);
        }
        if self.invoice_number.trim().is_empty() {
            return Err(ValidationError::MissingInvoiceNumber);
        }
        for (i, id) in self.machine_ids.iter().enumerate() {
            if self.machine_ids[..i].contains(id) {
                return Err(ValidationError::DuplicateMachine(id.clone()));
            }
        }
        Ok(())
    }
}

/// Editable invoice header fields. `status` is deliberately absent: it is a
/// function of the payments and is recomputed on save.
#[derive(Debug, Clone, Default)]
pub struct InvoiceTermsUpdate {
    pub customer_id: Option<String>,
    pub bank_account_id: Option<String>,
    pub delivery_terms: Option<String>,
    pub loading_port: Option<String>,
    pub destination_port: Option<String>,
    pub payment_terms: Option<String>,
    pub deposit_amount: Option<Amount>,
    pub deposit_paid: Option<bool>,
    pub validity_date: Option<BusinessDate>,
    pub notes: Option<String>,
}

/// Next invoice number: `<year>001`, or the last number plus one when it is
/// numeric and already belongs to `year`.
pub fn suggest_invoice_number(last: Option<&str>, year: i32) -> String {
    let prefix = year.to_string();
    last.filter(|last| last.starts_with(&prefix))
        .and_then(|last| last.parse::<u64>().ok())
        .map(|n| (n + 1).to_string())
        .unwrap_or_else(|| format!("{prefix}001"))
}
