//! Money movements: customer payments against invoices and operating expenses
use std::fmt;
use std::str::FromStr;

use chrono::Utc;

use crate::error::ValidationError;
use crate::store::{Record, Table};
use crate::types::{Amount, BusinessDate, Currency, TimeStamp};

/// A receipt against exactly one proforma invoice.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub proforma_invoice_id: String,
    #[n(2)]
    pub amount: Amount,
    #[n(3)]
    pub currency: Currency,
    #[n(4)]
    pub payment_date: BusinessDate,
    #[n(5)]
    pub payment_method: Option<String>,
    #[n(6)]
    pub reference_number: Option<String>,
    #[n(7)]
    pub is_deposit: bool,
    #[n(8)]
    pub notes: Option<String>,
    #[n(9)]
    pub created_at: TimeStamp<Utc>,
}

impl Record for Payment {
    const TABLE: Table = Table::Payment;

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> Option<&str> {
        Some(&self.proforma_invoice_id)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub proforma_invoice_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub payment_date: BusinessDate,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub is_deposit: bool,
    pub notes: Option<String>,
}

impl PaymentDraft {
    pub fn new(invoice_id: &str, amount: Amount) -> Self {
        Self {
            proforma_invoice_id: invoice_id.to_string(),
            amount,
            currency: Currency::USD,
            payment_date: BusinessDate::today(),
            payment_method: Some("bank_transfer".to_string()),
            reference_number: None,
            is_deposit: false,
            notes: None,
        }
    }
    pub fn set_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }
    pub fn set_payment_date(mut self, date: BusinessDate) -> Self {
        self.payment_date = date;
        self
    }
    pub fn set_method(mut self, method: &str) -> Self {
        self.payment_method = Some(method.to_string());
        self
    }
    pub fn set_reference(mut self, reference: &str) -> Self {
        self.reference_number = Some(reference.to_string());
        self
    }
    pub fn as_deposit(mut self) -> Self {
        self.is_deposit = true;
        self
    }
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.proforma_invoice_id.is_empty() {
            return Err(ValidationError::MissingInvoice);
        }
        Ok(())
    }
    pub(crate) fn into_payment(self, id: String) -> Payment {
        Payment {
            id,
            proforma_invoice_id: self.proforma_invoice_id,
            amount: self.amount,
            currency: self.currency,
            payment_date: self.payment_date,
            payment_method: self.payment_method,
            reference_number: self.reference_number.filter(|r| !r.is_empty()),
            is_deposit: self.is_deposit,
            notes: self.notes.filter(|n| !n.is_empty()),
            created_at: TimeStamp::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub amount: Option<Amount>,
    pub currency: Option<Currency>,
    pub payment_date: Option<BusinessDate>,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub is_deposit: Option<bool>,
    pub notes: Option<String>,
}

impl Payment {
    pub(crate) fn apply(&mut self, update: PaymentUpdate) {
        let PaymentUpdate {
            amount,
            currency,
            payment_date,
            payment_method,
            reference_number,
            is_deposit,
            notes,
        } = update;
        self.amount = amount.unwrap_or(self.amount);
        self.currency = currency.unwrap_or(self.currency);
        self.payment_date = payment_date.unwrap_or(self.payment_date);
        self.payment_method = payment_method.or(self.payment_method.take());
        self.reference_number = reference_number.or(self.reference_number.take());
        self.is_deposit = is_deposit.unwrap_or(self.is_deposit);
        self.notes = notes.or(self.notes.take());
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpenseCategory {
    #[n(0)]
    Transport,
    #[n(1)]
    Customs,
    #[n(2)]
    PortFees,
    #[n(3)]
    Insurance,
    #[n(4)]
    Inspection,
    #[n(5)]
    Storage,
    #[n(6)]
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Transport,
        ExpenseCategory::Customs,
        ExpenseCategory::PortFees,
        ExpenseCategory::Insurance,
        ExpenseCategory::Inspection,
        ExpenseCategory::Storage,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Transport => "transport",
            ExpenseCategory::Customs => "customs",
            ExpenseCategory::PortFees => "port_fees",
            ExpenseCategory::Insurance => "insurance",
            ExpenseCategory::Inspection => "inspection",
            ExpenseCategory::Storage => "storage",
            ExpenseCategory::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                kind: "expense category",
                value: s.to_string(),
            })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub proforma_invoice_id: Option<String>,
    #[n(2)]
    pub shipment_id: Option<String>,
    #[n(3)]
    pub machine_id: Option<String>,
    #[n(4)]
    pub category: ExpenseCategory,
    #[n(5)]
    pub description: String,
    #[n(6)]
    pub amount: Amount,
    #[n(7)]
    pub currency: Currency,
    #[n(8)]
    pub invoice_number: Option<String>, // supplier's invoice, not ours
    #[n(9)]
    pub invoice_date: Option<BusinessDate>,
    #[n(10)]
    pub paid: bool,
    #[n(11)]
    pub payment_date: Option<BusinessDate>,
    #[n(12)]
    pub notes: Option<String>,
    #[n(13)]
    pub attachments: Vec<String>,
    #[n(14)]
    pub created_on: BusinessDate,
    #[n(15)]
    pub created_at: TimeStamp<Utc>,
}

impl Expense {
    pub fn draft(category: ExpenseCategory, description: &str, amount: Amount, currency: Currency) -> Self {
        let created_at = TimeStamp::new();
        Self {
            id: String::new(),
            proforma_invoice_id: None,
            shipment_id: None,
            machine_id: None,
            category,
            description: description.to_string(),
            amount,
            currency,
            invoice_number: None,
            invoice_date: None,
            paid: false,
            payment_date: None,
            notes: None,
            attachments: vec![],
            created_on: created_at.date(),
            created_at,
        }
    }
    pub fn for_invoice(mut self, invoice_id: &str) -> Self {
        self.proforma_invoice_id = Some(invoice_id.to_string());
        self
    }
    pub fn for_shipment(mut self, shipment_id: &str) -> Self {
        self.shipment_id = Some(shipment_id.to_string());
        self
    }
    pub fn for_machine(mut self, machine_id: &str) -> Self {
        self.machine_id = Some(machine_id.to_string());
        self
    }
    pub fn set_source_invoice(mut self, number: &str, date: BusinessDate) -> Self {
        self.invoice_number = Some(number.to_string());
        self.invoice_date = Some(date);
        self
    }
    pub fn mark_paid(mut self, date: BusinessDate) -> Self {
        self.paid = true;
        self.payment_date = Some(date);
        self
    }
    /// Backdate the booking day, used by the monthly statement.
    pub fn set_created_on(mut self, date: BusinessDate) -> Self {
        self.created_on = date;
        self
    }
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::MissingField("expense description"));
        }
        Ok(())
    }
    pub fn statement_label(&self) -> &'static str {
        if self.paid { "ODENDI" } else { "BEKLIYOR" }
    }
}

impl Record for Expense {
    const TABLE: Table = Table::Expense;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_category_wire_names() {
        for category in ExpenseCategory::ALL {
            assert_eq!(category.as_str().parse::<ExpenseCategory>().unwrap(), category);
        }
        assert_eq!(ExpenseCategory::PortFees.as_str(), "port_fees");
    }

    #[test]
    fn blank_optional_strings_are_dropped() {
        let payment = PaymentDraft::new("inv_1", Amount::from_major(10))
            .set_reference("")
            .into_payment("pay_1".into());

        assert_eq!(payment.reference_number, None);
        assert_eq!(payment.payment_method.as_deref(), Some("bank_transfer"));
    }

    #[test]
    fn payment_update_merges() {
        let mut payment = PaymentDraft::new("inv_1", Amount::from_major(10)).into_payment("pay_1".into());
        payment.apply(PaymentUpdate {
            amount: Some(Amount::from_major(25)),
            is_deposit: Some(true),
            ..Default::default()
        });

        assert_eq!(payment.amount, Amount::from_major(25));
        assert!(payment.is_deposit);
        assert_eq!(payment.currency, Currency::USD);
    }
}
