//! Utility functions for record identifiers and diagnostics

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique record id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// New id for a row of `table`. The table's prefix doubles as the bech32 hrp,
/// so ids are self-describing (`mch_1...`, `inv_1...`).
pub fn new_record_id(table: crate::store::Table) -> anyhow::Result<String> {
    new_uuid_to_bech32(table.id_prefix())
}

/// Install a fmt subscriber filtered by `RUST_LOG`. Safe to call more than once;
/// later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
