//! Typed access to the embedded sled store
//!
//! Every row is CBOR under a namespaced key:
//!
//! ```text
//! machine/<id>                 top-level rows
//! payment/<invoice_id>/<id>    rows owned by (or hanging off) an invoice
//! ```
//!
//! so "all payments of invoice X" is a prefix scan. Writes are staged in a
//! [`WriteSet`] and committed as one sled batch, which sled applies atomically.
use std::sync::Arc;

use sled::{Batch, Db};
use tracing::trace;

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Company,
    BankAccount,
    Machine,
    Invoice,
    InvoiceItem,
    Payment,
    Shipment,
    Expense,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Company => "company",
            Table::BankAccount => "bank",
            Table::Machine => "machine",
            Table::Invoice => "invoice",
            Table::InvoiceItem => "item",
            Table::Payment => "payment",
            Table::Shipment => "shipment",
            Table::Expense => "expense",
        }
    }
    /// Human-readable part of this table's bech32 record ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Table::Company => "cmp_",
            Table::BankAccount => "bnk_",
            Table::Machine => "mch_",
            Table::Invoice => "inv_",
            Table::InvoiceItem => "itm_",
            Table::Payment => "pay_",
            Table::Shipment => "shp_",
            Table::Expense => "exp_",
        }
    }
}

/// A row type persisted in one [`Table`].
pub trait Record: Sized + minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()> {
    const TABLE: Table;

    fn id(&self) -> &str;

    /// Set for rows keyed under an invoice.
    fn parent_id(&self) -> Option<&str> {
        None
    }

    fn key(&self) -> String {
        match self.parent_id() {
            Some(parent) => format!("{}/{}/{}", Self::TABLE.name(), parent, self.id()),
            None => format!("{}/{}", Self::TABLE.name(), self.id()),
        }
    }
}

fn table_prefix(table: Table) -> String {
    format!("{}/", table.name())
}

fn encode<R: Record>(record: &R) -> Result<Vec<u8>, LedgerError> {
    minicbor::to_vec(record).map_err(|e| LedgerError::Encode(e.to_string()))
}

fn decode<R: Record>(bytes: &[u8]) -> Result<R, LedgerError> {
    Ok(minicbor::decode(bytes)?)
}

#[derive(Clone)]
pub struct Store {
    db: Arc<Db>,
}

impl Store {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Top-level row by id.
    pub fn get<R: Record>(&self, id: &str) -> Result<Option<R>, LedgerError> {
        let key = format!("{}{}", table_prefix(R::TABLE), id);
        self.db
            .get(key.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Like [`Store::get`] but a missing row is an error.
    pub fn require<R: Record>(&self, id: &str) -> Result<R, LedgerError> {
        self.get(id)?.ok_or_else(|| LedgerError::NotFound {
            table: R::TABLE.name(),
            id: id.to_string(),
        })
    }

    /// Child row by its own id, whichever parent it sits under.
    pub fn find_child<R: Record>(&self, id: &str) -> Result<Option<R>, LedgerError> {
        let suffix = format!("/{id}");
        for entry in self.db.scan_prefix(table_prefix(R::TABLE).as_bytes()) {
            let (key, value) = entry?;
            if key.ends_with(suffix.as_bytes()) {
                return Ok(Some(decode(&value)?));
            }
        }
        Ok(None)
    }

    /// All rows keyed under `parent_id`.
    pub fn children<R: Record>(&self, parent_id: &str) -> Result<Vec<R>, LedgerError> {
        let prefix = format!("{}{}/", table_prefix(R::TABLE), parent_id);
        self.scan(&prefix)
    }

    pub fn all<R: Record>(&self) -> Result<Vec<R>, LedgerError> {
        self.scan(&table_prefix(R::TABLE))
    }

    fn scan<R: Record>(&self, prefix: &str) -> Result<Vec<R>, LedgerError> {
        self.db
            .scan_prefix(prefix.as_bytes())
            .map(|entry| {
                let (_, value) = entry?;
                decode(&value)
            })
            .collect()
    }

    /// Apply every staged write at once.
    pub fn commit(&self, writes: WriteSet) -> Result<(), LedgerError> {
        trace!(ops = writes.ops, "committing write set");
        self.db.apply_batch(writes.batch)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        self.db.flush()?;
        Ok(())
    }
}

/// Staged inserts and removals committed together by [`Store::commit`].
#[derive(Default)]
pub struct WriteSet {
    batch: Batch,
    ops: usize,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<R: Record>(&mut self, record: &R) -> Result<(), LedgerError> {
        self.batch.insert(record.key().as_bytes(), encode(record)?);
        self.ops += 1;
        Ok(())
    }

    pub fn delete<R: Record>(&mut self, record: &R) {
        self.batch.remove(record.key().as_bytes());
        self.ops += 1;
    }

    pub fn len(&self) -> usize {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Payment, PaymentDraft};
    use crate::machine::Machine;
    use crate::types::Amount;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("store.db")).unwrap();
        (dir, Store::new(Arc::new(db)))
    }

    #[test]
    fn put_get_delete() {
        let (_dir, store) = temp_store();
        let mut machine = Machine::draft("Volvo", "EC210", "Excavator", "VCE123");
        machine.id = "mch_a".into();

        let mut writes = WriteSet::new();
        writes.put(&machine).unwrap();
        store.commit(writes).unwrap();

        let loaded: Machine = store.require("mch_a").unwrap();
        assert_eq!(loaded, machine);

        let mut writes = WriteSet::new();
        writes.delete(&machine);
        store.commit(writes).unwrap();

        assert!(store.get::<Machine>("mch_a").unwrap().is_none());
        assert!(matches!(
            store.require::<Machine>("mch_a"),
            Err(LedgerError::NotFound { table: "machine", .. })
        ));
    }

    #[test]
    fn children_are_scoped_to_parent() {
        let (_dir, store) = temp_store();
        let mut writes = WriteSet::new();
        for (invoice, id) in [("inv_a", "pay_1"), ("inv_a", "pay_2"), ("inv_b", "pay_3")] {
            let payment: Payment = PaymentDraft::new(invoice, Amount::from_major(1)).into_payment(id.into());
            writes.put(&payment).unwrap();
        }
        assert_eq!(writes.len(), 3);
        store.commit(writes).unwrap();

        assert_eq!(store.children::<Payment>("inv_a").unwrap().len(), 2);
        assert_eq!(store.children::<Payment>("inv_b").unwrap().len(), 1);
        assert_eq!(store.all::<Payment>().unwrap().len(), 3);

        let found: Payment = store.find_child("pay_3").unwrap().unwrap();
        assert_eq!(found.proforma_invoice_id, "inv_b");
    }
}
