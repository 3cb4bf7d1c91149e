pub mod company;
pub mod config;
pub mod document;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod machine;
pub mod reconcile;
pub mod reports;
pub mod service;
pub mod shipment;
pub mod store;
pub mod types;
pub mod utils;

pub use config::LedgerConfig;
pub use error::{DocumentError, LedgerError, ValidationError};
pub use service::LedgerService;
