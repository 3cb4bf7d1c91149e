//! Smoke Screen Unit tests for the ledger components
//!
//! Happy-path checks of the public API from outside the crate, one module
//! at a time, without a store.

use azza_ledger::{
    company::{BankAccount, Company, CompanyType},
    invoice::{PaymentStatus, suggest_invoice_number},
    ledger::ExpenseCategory,
    machine::{Machine, MachineEvent, MachineStatus},
    shipment::ShipmentStatus,
    store::Table,
    types::{Amount, BusinessDate, Currency, Percent, SignedAmount, TimeStamp},
    utils::{new_record_id, new_uuid_to_bech32},
    ValidationError,
};

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Ids are bech32m strings carrying the table's prefix
    #[test]
    fn record_ids_carry_table_prefix() {
        let id = new_record_id(Table::Invoice).unwrap();
        assert!(id.starts_with("inv_1"));
        assert!(id.len() > 10);

        let (hrp, data) = bech32::decode(&id).unwrap();
        assert_eq!(hrp.as_str(), "inv_");
        assert_eq!(data.len(), 16); // a uuid
    }

    #[test]
    fn ids_are_unique() {
        let a = new_uuid_to_bech32("mch_").unwrap();
        let b = new_uuid_to_bech32("mch_").unwrap();
        assert_ne!(a, b);
    }
}

// TYPES MODULE TESTS
#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn currencies_parse_by_code() {
        assert_eq!("EUR".parse::<Currency>().unwrap(), Currency::EUR);
        assert_eq!(Currency::default(), Currency::USD);
        assert!(matches!(
            "GBP".parse::<Currency>(),
            Err(ValidationError::UnknownVariant { kind: "currency", .. })
        ));
    }

    #[test]
    fn amounts_group_thousands() {
        assert_eq!(Amount::from_major(1_234_567).grouped(), "1,234,567");
        assert_eq!(Amount::from_minor(150).grouped(), "1.5");
        assert_eq!(SignedAmount::from_minor(-250_000).grouped(), "-2,500");
        assert_eq!(Percent::whole(30).to_string(), "30%");
    }

    #[test]
    fn business_dates_format_both_ways() {
        let date = BusinessDate::from_ymd(2025, 11, 3).unwrap();
        assert_eq!(date.format_en_gb(), "03/11/2025");
        assert_eq!(date.format_tr(), "03.11.2025");
        assert_eq!(date.month_key(), "2025-11");
        assert_eq!("2025-11-03".parse::<BusinessDate>().unwrap(), date);
    }

    #[test]
    fn timestamp_date_is_utc_day() {
        let ts = TimeStamp::new_with(2025, 2, 28, 23, 59, 0).unwrap();
        assert_eq!(ts.date(), BusinessDate::from_ymd(2025, 2, 28).unwrap());
        assert!(TimeStamp::new_with(2025, 2, 30, 0, 0, 0).is_none());
    }
}

// ENTITY TESTS
#[cfg(test)]
mod entity_tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for status in [
            MachineStatus::Available,
            MachineStatus::Reserved,
            MachineStatus::InTransit,
            MachineStatus::Sold,
        ] {
            assert_eq!(status.as_str().parse::<MachineStatus>().unwrap(), status);
        }
        assert_eq!("in_transit".parse::<ShipmentStatus>().unwrap(), ShipmentStatus::InTransit);
        assert_eq!("partial".parse::<PaymentStatus>().unwrap(), PaymentStatus::Partial);
        assert_eq!("customs".parse::<ExpenseCategory>().unwrap(), ExpenseCategory::Customs);
        assert_eq!("supplier".parse::<CompanyType>().unwrap(), CompanyType::Supplier);
    }

    #[test]
    fn machine_follows_linked_events() {
        let mut machine = Machine::draft("JCB", "3CX", "Backhoe Loader", "JCB3CX-77");
        assert_eq!(machine.status, MachineStatus::Available);
        assert_eq!(machine.transition(MachineEvent::InvoiceCreated), MachineStatus::Reserved);
        assert_eq!(machine.transition(MachineEvent::ShipmentCreated), MachineStatus::InTransit);
        assert_eq!(machine.transition(MachineEvent::ShipmentDeleted), MachineStatus::Reserved);
        assert_eq!(machine.transition(MachineEvent::ShipmentDelivered), MachineStatus::Sold);
        assert!(!machine.status.is_in_stock());
    }

    #[test]
    fn drafts_validate_required_fields() {
        assert!(Company::draft("", CompanyType::Customer).validate().is_err());
        assert!(Company::draft("Acme", CompanyType::Customer).validate().is_ok());
        assert!(BankAccount::draft("Ziraat", "AZZA", "1", Currency::TRY).validate().is_ok());
        assert_eq!(
            Machine::draft("Volvo", "L90", "Wheel Loader", " ").validate(),
            Err(ValidationError::MissingField("chassis number"))
        );
    }

    #[test]
    fn next_invoice_number() {
        assert_eq!(suggest_invoice_number(Some("2025099"), 2025), "2025100");
        assert_eq!(suggest_invoice_number(None, 2026), "2026001");
    }
}
