//! Shipments of invoiced machines
use std::fmt;
use std::str::FromStr;

use chrono::Utc;

use crate::error::ValidationError;
use crate::store::{Record, Table};
use crate::types::{Amount, BusinessDate, Currency, TimeStamp};

/// Freely settable by the user; only entering `Delivered` has a side effect
/// (the machine is sold).
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShipmentStatus {
    #[n(0)]
    #[default]
    Pending,
    #[n(1)]
    Loading,
    #[n(2)]
    InTransit,
    #[n(3)]
    Arrived,
    #[n(4)]
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Loading => "loading",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Arrived => "arrived",
            ShipmentStatus::Delivered => "delivered",
        }
    }
    /// Counted as an open shipment on the dashboard.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Pending | ShipmentStatus::Loading | ShipmentStatus::InTransit
        )
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ShipmentStatus::Pending),
            "loading" => Ok(ShipmentStatus::Loading),
            "in_transit" => Ok(ShipmentStatus::InTransit),
            "arrived" => Ok(ShipmentStatus::Arrived),
            "delivered" => Ok(ShipmentStatus::Delivered),
            other => Err(ValidationError::UnknownVariant {
                kind: "shipment status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub proforma_invoice_id: String,
    #[n(2)]
    pub machine_id: String,
    #[n(3)]
    pub loading_port: String,
    #[n(4)]
    pub destination_port: String,
    #[n(5)]
    pub shipping_company: Option<String>,
    #[n(6)]
    pub container_number: Option<String>,
    #[n(7)]
    pub bill_of_lading: Option<String>,
    #[n(8)]
    pub loading_date: Option<BusinessDate>,
    #[n(9)]
    pub departure_date: Option<BusinessDate>,
    #[n(10)]
    pub estimated_arrival_date: Option<BusinessDate>,
    #[n(11)]
    pub actual_arrival_date: Option<BusinessDate>,
    #[n(12)]
    pub delivery_date: Option<BusinessDate>,
    #[n(13)]
    pub status: ShipmentStatus,
    #[n(14)]
    pub current_location: Option<String>,
    #[n(15)]
    pub shipping_cost: Amount,
    #[n(16)]
    pub shipping_currency: Currency,
    #[n(17)]
    pub notes: Option<String>,
    #[n(18)]
    pub created_at: TimeStamp<Utc>,
}

impl Record for Shipment {
    const TABLE: Table = Table::Shipment;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Request to ship (part of) an invoice. Blank ports fall back to the invoice's.
#[derive(Debug, Clone, Default)]
pub struct ShipmentDraft {
    pub proforma_invoice_id: String,
    pub machine_id: Option<String>,
    pub loading_port: Option<String>,
    pub destination_port: Option<String>,
    pub shipping_company: Option<String>,
    pub container_number: Option<String>,
    pub bill_of_lading: Option<String>,
    pub loading_date: Option<BusinessDate>,
    pub departure_date: Option<BusinessDate>,
    pub estimated_arrival_date: Option<BusinessDate>,
    pub shipping_cost: Amount,
    pub shipping_currency: Currency,
    pub notes: Option<String>,
}

impl ShipmentDraft {
    pub fn new(invoice_id: &str) -> Self {
        Self {
            proforma_invoice_id: invoice_id.to_string(),
            ..Self::default()
        }
    }
    pub fn set_machine(mut self, machine_id: &str) -> Self {
        self.machine_id = Some(machine_id.to_string());
        self
    }
    pub fn set_ports(mut self, loading: &str, destination: &str) -> Self {
        self.loading_port = Some(loading.to_string());
        self.destination_port = Some(destination.to_string());
        self
    }
    pub fn set_shipping_company(mut self, company: &str) -> Self {
        self.shipping_company = Some(company.to_string());
        self
    }
    pub fn set_container(mut self, container: &str, bill_of_lading: &str) -> Self {
        self.container_number = Some(container.to_string());
        self.bill_of_lading = Some(bill_of_lading.to_string());
        self
    }
    pub fn set_dates(
        mut self,
        loading: Option<BusinessDate>,
        departure: Option<BusinessDate>,
        estimated_arrival: Option<BusinessDate>,
    ) -> Self {
        self.loading_date = loading;
        self.departure_date = departure;
        self.estimated_arrival_date = estimated_arrival;
        self
    }
    pub fn set_cost(mut self, cost: Amount, currency: Currency) -> Self {
        self.shipping_cost = cost;
        self.shipping_currency = currency;
        self
    }
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.proforma_invoice_id.is_empty() {
            return Err(ValidationError::MissingInvoice);
        }
        Ok(())
    }
    /// Description of the transport expense booked for a non-zero cost.
    pub fn expense_description(&self) -> String {
        let carrier = self
            .shipping_company
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("Deniz tasima");
        format!("Nakliye ucreti - {carrier}")
    }
}

/// Fields set from the shipment edit form. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ShipmentUpdate {
    pub loading_port: Option<String>,
    pub destination_port: Option<String>,
    pub shipping_company: Option<String>,
    pub container_number: Option<String>,
    pub bill_of_lading: Option<String>,
    pub loading_date: Option<BusinessDate>,
    pub departure_date: Option<BusinessDate>,
    pub estimated_arrival_date: Option<BusinessDate>,
    pub actual_arrival_date: Option<BusinessDate>,
    pub delivery_date: Option<BusinessDate>,
    pub status: Option<ShipmentStatus>,
    pub current_location: Option<String>,
    pub shipping_cost: Option<Amount>,
    pub shipping_currency: Option<Currency>,
    pub notes: Option<String>,
}

impl ShipmentUpdate {
    pub fn status(status: ShipmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Shipment {
    pub(crate) fn apply(&mut self, update: ShipmentUpdate) {
        let ShipmentUpdate {
            loading_port,
            destination_port,
            shipping_company,
            container_number,
            bill_of_lading,
            loading_date,
            departure_date,
            estimated_arrival_date,
            actual_arrival_date,
            delivery_date,
            status,
            current_location,
            shipping_cost,
            shipping_currency,
            notes,
        } = update;
        if let Some(port) = loading_port {
            self.loading_port = port;
        }
        if let Some(port) = destination_port {
            self.destination_port = port;
        }
        self.shipping_company = shipping_company.or(self.shipping_company.take());
        self.container_number = container_number.or(self.container_number.take());
        self.bill_of_lading = bill_of_lading.or(self.bill_of_lading.take());
        self.loading_date = loading_date.or(self.loading_date);
        self.departure_date = departure_date.or(self.departure_date);
        self.estimated_arrival_date = estimated_arrival_date.or(self.estimated_arrival_date);
        self.actual_arrival_date = actual_arrival_date.or(self.actual_arrival_date);
        self.delivery_date = delivery_date.or(self.delivery_date);
        self.status = status.unwrap_or(self.status);
        self.current_location = current_location.or(self.current_location.take());
        self.shipping_cost = shipping_cost.unwrap_or(self.shipping_cost);
        self.shipping_currency = shipping_currency.unwrap_or(self.shipping_currency);
        self.notes = notes.or(self.notes.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_description_names_carrier() {
        let draft = ShipmentDraft::new("inv_1").set_shipping_company("MSC");
        assert_eq!(draft.expense_description(), "Nakliye ucreti - MSC");

        let draft = ShipmentDraft::new("inv_1");
        assert_eq!(draft.expense_description(), "Nakliye ucreti - Deniz tasima");
    }

    #[test]
    fn active_statuses() {
        assert!(ShipmentStatus::Pending.is_active());
        assert!(ShipmentStatus::InTransit.is_active());
        assert!(!ShipmentStatus::Arrived.is_active());
        assert!(!ShipmentStatus::Delivered.is_active());
    }
}
