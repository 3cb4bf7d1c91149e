//! Error taxonomy for ledger operations and document generation

/// Rejected input, raised before anything is written.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one machine must be selected")]
    NoMachinesSelected,
    #[error("A customer must be selected")]
    MissingCustomer,
    #[error("A bank account must be selected")]
    MissingBankAccount,
    #[error("A proforma invoice must be selected")]
    MissingInvoice,
    #[error("Invoice number is empty")]
    MissingInvoiceNumber,
    #[error("Machine {0} is not available for a new invoice")]
    MachineUnavailable(String),
    #[error("Machine {0} was selected more than once")]
    DuplicateMachine(String),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("Shipment for invoice {0} has no machine to track")]
    NoShipmentMachine(String),
}

/// Failure while talking to the store.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("{table} record {id} not found")]
    NotFound { table: &'static str, id: String },
    #[error("Store failure: {0}")]
    Store(#[from] sled::Error),
    #[error("Failed to encode record: {0}")]
    Encode(String),
    #[error("Failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
}

/// Document generation aborted before any output was produced.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Invoice {invoice_number} has no {relation}; cannot generate document")]
    MissingRelation {
        relation: &'static str,
        invoice_number: String,
    },
    #[error("Invoice {0} has no line items")]
    NoItems(String),
}
