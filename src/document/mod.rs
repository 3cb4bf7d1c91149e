//! Printable documents: proforma invoices and monthly statements
//!
//! Generators produce a [`Document`], a renderer-neutral description of A4
//! pages. Output is a pure function of the input rows and configuration, so
//! two renders can be compared by [`Document::fingerprint`].
pub mod layout;
pub mod model;
pub mod normalize;
pub mod proforma;
pub mod statement;

pub use layout::wrap_text;
pub use model::Document;
pub use normalize::normalize_text;
pub use proforma::{ProformaBundle, render_proforma};
pub use statement::render_statement;
