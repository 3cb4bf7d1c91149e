//! Machines held in inventory and their lifecycle
//!
//! ```text
//! Available ──▶ Reserved ──▶ InTransit ──▶ Sold
//!     ▲            │  ▲           │
//!     └────────────┘  └───────────┘
//!   invoice deleted    shipment deleted
//! ```
//!
//! Transitions are driven by events on linked records (see [`MachineEvent`]).
//! None of them is guarded: the target status is applied whatever the
//! current one is, and a machine can be deleted in any status.
use std::fmt;
use std::str::FromStr;

use chrono::Utc;

use crate::error::ValidationError;
use crate::store::{Record, Table};
use crate::types::{Amount, BusinessDate, Currency, TimeStamp};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MachineStatus {
    #[n(0)]
    #[default]
    Available,
    #[n(1)]
    Reserved,
    #[n(2)]
    InTransit,
    #[n(3)]
    Sold,
}

/// Something that happened to a record linked to a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    /// Included as a line on a new proforma invoice.
    InvoiceCreated,
    /// Its proforma invoice was deleted.
    InvoiceDeleted,
    /// A shipment referencing it was created.
    ShipmentCreated,
    /// That shipment was deleted.
    ShipmentDeleted,
    /// The shipment was marked delivered.
    ShipmentDelivered,
    /// Its invoice was marked sold.
    InvoiceMarkedSold,
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Available => "available",
            MachineStatus::Reserved => "reserved",
            MachineStatus::InTransit => "in_transit",
            MachineStatus::Sold => "sold",
        }
    }

    /// Status after `event`. Unconditional, see module docs.
    pub fn after(self, event: MachineEvent) -> MachineStatus {
        match event {
            MachineEvent::InvoiceCreated => MachineStatus::Reserved,
            MachineEvent::InvoiceDeleted => MachineStatus::Available,
            MachineEvent::ShipmentCreated => MachineStatus::InTransit,
            MachineEvent::ShipmentDeleted => MachineStatus::Reserved,
            MachineEvent::ShipmentDelivered | MachineEvent::InvoiceMarkedSold => MachineStatus::Sold,
        }
    }

    pub fn is_in_stock(&self) -> bool {
        !matches!(self, MachineStatus::Sold)
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(MachineStatus::Available),
            "reserved" => Ok(MachineStatus::Reserved),
            "in_transit" => Ok(MachineStatus::InTransit),
            "sold" => Ok(MachineStatus::Sold),
            other => Err(ValidationError::UnknownVariant {
                kind: "machine status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub brand: String,
    #[n(2)]
    pub model: String,
    #[n(3)]
    pub machine_type: String,
    #[n(4)]
    pub chassis_number: String, // business key, not unique
    #[n(5)]
    pub year: Option<u16>,
    #[n(6)]
    pub hours_used: Option<u32>,
    #[n(7)]
    pub status: MachineStatus,
    #[n(8)]
    pub purchase_price: Option<Amount>,
    #[n(9)]
    pub purchase_currency: Currency,
    #[n(10)]
    pub supplier_id: Option<String>,
    #[n(11)]
    pub purchase_date: Option<BusinessDate>,
    #[n(12)]
    pub location: Option<String>,
    #[n(13)]
    pub notes: Option<String>,
    #[n(14)]
    pub images: Vec<String>, // object storage urls
    #[n(15)]
    pub documents: Vec<String>,
    #[n(16)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct MachineUpdate {
    pub year: Option<u16>,
    pub hours_used: Option<u32>,
    pub purchase_price: Option<Amount>,
    pub purchase_currency: Option<Currency>,
    pub supplier_id: Option<String>,
    pub purchase_date: Option<BusinessDate>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl Machine {
    /// Unsaved machine; the service assigns the id and forces `Available` on create.
    pub fn draft(brand: &str, model: &str, machine_type: &str, chassis_number: &str) -> Self {
        Self {
            id: String::new(),
            brand: brand.to_string(),
            model: model.to_string(),
            machine_type: machine_type.to_string(),
            chassis_number: chassis_number.to_string(),
            year: None,
            hours_used: None,
            status: MachineStatus::Available,
            purchase_price: None,
            purchase_currency: Currency::USD,
            supplier_id: None,
            purchase_date: None,
            location: None,
            notes: None,
            images: vec![],
            documents: vec![],
            created_at: TimeStamp::new(),
        }
    }
    pub fn set_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }
    pub fn set_hours_used(mut self, hours: u32) -> Self {
        self.hours_used = Some(hours);
        self
    }
    pub fn set_purchase_price(mut self, price: Amount, currency: Currency) -> Self {
        self.purchase_price = Some(price);
        self.purchase_currency = currency;
        self
    }
    pub fn set_supplier(mut self, supplier_id: &str) -> Self {
        self.supplier_id = Some(supplier_id.to_string());
        self
    }
    pub fn set_purchase_date(mut self, date: BusinessDate) -> Self {
        self.purchase_date = Some(date);
        self
    }
    pub fn set_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.brand.trim().is_empty() {
            return Err(ValidationError::MissingField("brand"));
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingField("model"));
        }
        if self.machine_type.trim().is_empty() {
            return Err(ValidationError::MissingField("machine type"));
        }
        if self.chassis_number.trim().is_empty() {
            return Err(ValidationError::MissingField("chassis number"));
        }
        Ok(())
    }

    pub fn transition(&mut self, event: MachineEvent) -> MachineStatus {
        self.status = self.status.after(event);
        self.status
    }

    pub(crate) fn apply(&mut self, update: MachineUpdate) {
        let MachineUpdate {
            year,
            hours_used,
            purchase_price,
            purchase_currency,
            supplier_id,
            purchase_date,
            location,
            notes,
        } = update;
        self.year = year.or(self.year);
        self.hours_used = hours_used.or(self.hours_used);
        self.purchase_price = purchase_price.or(self.purchase_price);
        self.purchase_currency = purchase_currency.unwrap_or(self.purchase_currency);
        self.supplier_id = supplier_id.or(self.supplier_id.take());
        self.purchase_date = purchase_date.or(self.purchase_date);
        self.location = location.or(self.location.take());
        self.notes = notes.or(self.notes.take());
    }
}

impl Record for Machine {
    const TABLE: Table = Table::Machine;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_map_to_fixed_targets() {
        use MachineEvent::*;
        let cases = [
            (InvoiceCreated, MachineStatus::Reserved),
            (InvoiceDeleted, MachineStatus::Available),
            (ShipmentCreated, MachineStatus::InTransit),
            (ShipmentDeleted, MachineStatus::Reserved),
            (ShipmentDelivered, MachineStatus::Sold),
            (InvoiceMarkedSold, MachineStatus::Sold),
        ];
        for from in [
            MachineStatus::Available,
            MachineStatus::Reserved,
            MachineStatus::InTransit,
            MachineStatus::Sold,
        ] {
            for (event, target) in cases {
                assert_eq!(from.after(event), target);
            }
        }
    }

    #[test]
    fn machine_cbor_roundtrip() {
        let machine = Machine::draft("Caterpillar", "320D", "Excavator", "CAT0320DXYZ")
            .set_year(2015)
            .set_purchase_price(Amount::from_major(45_000), Currency::USD);

        let encoded = minicbor::to_vec(&machine).unwrap();
        let decoded: Machine = minicbor::decode(&encoded).unwrap();

        assert_eq!(machine, decoded);
    }

    #[test]
    fn validate_rejects_blank_chassis() {
        let machine = Machine::draft("Komatsu", "PC200", "Excavator", " ");
        assert_eq!(
            machine.validate(),
            Err(ValidationError::MissingField("chassis number"))
        );
    }
}
