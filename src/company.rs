//! Counterparties and settlement accounts
use std::str::FromStr;

use chrono::Utc;

use crate::error::ValidationError;
use crate::store::{Record, Table};
use crate::types::{Currency, TimeStamp};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompanyType {
    #[n(0)]
    Customer,
    #[n(1)]
    Supplier,
}

impl CompanyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyType::Customer => "customer",
            CompanyType::Supplier => "supplier",
        }
    }
}

impl FromStr for CompanyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(CompanyType::Customer),
            "supplier" => Ok(CompanyType::Supplier),
            other => Err(ValidationError::UnknownVariant {
                kind: "company type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Company {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub kind: CompanyType,
    #[n(3)]
    pub country: Option<String>,
    #[n(4)]
    pub address: Option<String>,
    #[n(5)]
    pub contact_person: Option<String>,
    #[n(6)]
    pub phone: Option<String>,
    #[n(7)]
    pub email: Option<String>,
    #[n(8)]
    pub tax_number: Option<String>,
    #[n(9)]
    pub notes: Option<String>,
    #[n(10)]
    pub created_at: TimeStamp<Utc>,
}

/// Contact fields a user may change. Identity (`name`, `kind`) is fixed.
#[derive(Debug, Clone, Default)]
pub struct CompanyUpdate {
    pub country: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_number: Option<String>,
    pub notes: Option<String>,
}

impl Company {
    /// Unsaved company; the service assigns the id on create.
    pub fn draft(name: &str, kind: CompanyType) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            kind,
            country: None,
            address: None,
            contact_person: None,
            phone: None,
            email: None,
            tax_number: None,
            notes: None,
            created_at: TimeStamp::new(),
        }
    }
    pub fn set_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }
    pub fn set_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }
    pub fn set_contact_person(mut self, person: &str) -> Self {
        self.contact_person = Some(person.to_string());
        self
    }
    pub fn set_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }
    pub fn set_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
    pub fn set_tax_number(mut self, tax_number: &str) -> Self {
        self.tax_number = Some(tax_number.to_string());
        self
    }
    pub fn is_customer(&self) -> bool {
        self.kind == CompanyType::Customer
    }
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("company name"));
        }
        Ok(())
    }
    pub(crate) fn apply(&mut self, update: CompanyUpdate) {
        let CompanyUpdate {
            country,
            address,
            contact_person,
            phone,
            email,
            tax_number,
            notes,
        } = update;
        self.country = country.or(self.country.take());
        self.address = address.or(self.address.take());
        self.contact_person = contact_person.or(self.contact_person.take());
        self.phone = phone.or(self.phone.take());
        self.email = email.or(self.email.take());
        self.tax_number = tax_number.or(self.tax_number.take());
        self.notes = notes.or(self.notes.take());
    }
}

impl Record for Company {
    const TABLE: Table = Table::Company;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct BankAccount {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub bank_name: String,
    #[n(2)]
    pub account_holder: String,
    #[n(3)]
    pub account_number: String,
    #[n(4)]
    pub iban: Option<String>,
    #[n(5)]
    pub swift_code: Option<String>,
    #[n(6)]
    pub currency: Currency,
    #[n(7)]
    pub is_active: bool,
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
}

impl BankAccount {
    pub fn draft(bank_name: &str, account_holder: &str, account_number: &str, currency: Currency) -> Self {
        Self {
            id: String::new(),
            bank_name: bank_name.to_string(),
            account_holder: account_holder.to_string(),
            account_number: account_number.to_string(),
            iban: None,
            swift_code: None,
            currency,
            is_active: true,
            created_at: TimeStamp::new(),
        }
    }
    pub fn set_iban(mut self, iban: &str) -> Self {
        self.iban = Some(iban.to_string());
        self
    }
    pub fn set_swift_code(mut self, swift: &str) -> Self {
        self.swift_code = Some(swift.to_string());
        self
    }
    pub fn set_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bank_name.trim().is_empty() {
            return Err(ValidationError::MissingField("bank name"));
        }
        if self.account_holder.trim().is_empty() {
            return Err(ValidationError::MissingField("account holder"));
        }
        if self.account_number.trim().is_empty() {
            return Err(ValidationError::MissingField("account number"));
        }
        Ok(())
    }
}

impl Record for BankAccount {
    const TABLE: Table = Table::BankAccount;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_untouched_fields() {
        let mut company = Company::draft("Acme", CompanyType::Customer)
            .set_country("Iraq")
            .set_phone("+964 1");

        company.apply(CompanyUpdate {
            phone: Some("+964 2".into()),
            ..Default::default()
        });

        assert_eq!(company.country.as_deref(), Some("Iraq"));
        assert_eq!(company.phone.as_deref(), Some("+964 2"));
    }

    #[test]
    fn company_type_round_trips_wire_name() {
        for kind in [CompanyType::Customer, CompanyType::Supplier] {
            assert_eq!(kind.as_str().parse::<CompanyType>().unwrap(), kind);
        }
        assert!("partner".parse::<CompanyType>().is_err());
    }
}
