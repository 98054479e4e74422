//! The record store.
//!
//! One logical collection per entity, all held in memory and indexed by key
//! so lookups never scan. Durability is a full [`Snapshot`] flushed through
//! a [`SnapshotBackend`] after mutating operations; a missing snapshot loads
//! an empty store rather than failing.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    Account, BankResult, Credential, Loan, Stock, StockTransaction, Transaction,
};

/// A record that knows its own collection key.
pub trait Keyed {
    type Key: Ord + Clone;

    fn key(&self) -> Self::Key;
}

/// An in-memory keyed collection with `get`/`get_all`/`upsert`/`delete`.
#[derive(Debug, Clone)]
pub struct Table<R: Keyed> {
    rows: BTreeMap<R::Key, R>,
}

impl<R: Keyed> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<R: Keyed> Table<R> {
    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.rows.get(key)
    }

    pub fn get_mut(&mut self, key: &R::Key) -> Option<&mut R> {
        self.rows.get_mut(key)
    }

    pub fn contains(&self, key: &R::Key) -> bool {
        self.rows.contains_key(key)
    }

    /// Inserts or replaces, returning the previous record if any.
    pub fn upsert(&mut self, row: R) -> Option<R> {
        self.rows.insert(row.key(), row)
    }

    pub fn delete(&mut self, key: &R::Key) -> Option<R> {
        self.rows.remove(key)
    }

    pub fn get_all(&self) -> impl Iterator<Item = &R> {
        self.rows.values()
    }

    pub fn get_all_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.rows.values_mut()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R: Keyed + Clone> Table<R> {
    fn from_rows(rows: Vec<R>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.upsert(row);
        }
        table
    }

    fn to_rows(&self) -> Vec<R> {
        self.rows.values().cloned().collect()
    }
}

/// An append-only collection.
#[derive(Debug, Clone)]
pub struct Journal<R> {
    rows: Vec<R>,
}

impl<R> Default for Journal<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R: Clone> Journal<R> {
    pub fn append(&mut self, row: R) {
        self.rows.push(row);
    }

    pub fn get_all(&self) -> impl Iterator<Item = &R> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn genesis_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// Full store state as flushed to durable storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub credentials: Vec<Credential>,
    pub accounts: Vec<Account>,
    pub loans_pending: Vec<Loan>,
    pub loans_active: Vec<Loan>,
    pub stocks: Vec<Stock>,
    pub transactions: Vec<Transaction>,
    pub stock_transactions: Vec<StockTransaction>,
    #[serde(default = "genesis_date")]
    pub current_date: NaiveDate,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            accounts: Vec::new(),
            loans_pending: Vec::new(),
            loans_active: Vec::new(),
            stocks: Vec::new(),
            transactions: Vec::new(),
            stock_transactions: Vec::new(),
            current_date: genesis_date(),
        }
    }
}

/// Durability seam behind the in-memory store.
pub trait SnapshotBackend: fmt::Debug {
    /// Loads the last persisted snapshot; `None` when nothing was persisted
    /// yet.
    fn load(&self) -> BankResult<Option<Snapshot>>;

    fn persist(&self, snapshot: &Snapshot) -> BankResult<()>;
}

/// Backend for tests and throwaway sessions: nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend;

impl SnapshotBackend for MemoryBackend {
    fn load(&self) -> BankResult<Option<Snapshot>> {
        Ok(None)
    }

    fn persist(&self, _snapshot: &Snapshot) -> BankResult<()> {
        Ok(())
    }
}

/// Snapshot as a single JSON file, written to a temp file and renamed so a
/// crash mid-flush leaves the previous snapshot intact.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotBackend for JsonFileBackend {
    fn load(&self) -> BankResult<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn persist(&self, snapshot: &Snapshot) -> BankResult<()> {
        let raw = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// The in-memory indexed store, one collection per entity.
#[derive(Debug)]
pub struct Store {
    pub credentials: Table<Credential>,
    pub accounts: Table<Account>,
    pub loans_pending: Table<Loan>,
    pub loans_active: Table<Loan>,
    pub stocks: Table<Stock>,
    pub transactions: Journal<Transaction>,
    pub stock_transactions: Journal<StockTransaction>,
    pub current_date: NaiveDate,
    backend: Box<dyn SnapshotBackend>,
}

impl Store {
    /// Opens the store, loading the backend's snapshot when one exists.
    pub fn open(backend: Box<dyn SnapshotBackend>) -> BankResult<Self> {
        let snapshot = backend.load()?.unwrap_or_default();
        Ok(Self {
            credentials: Table::from_rows(snapshot.credentials),
            accounts: Table::from_rows(snapshot.accounts),
            loans_pending: Table::from_rows(snapshot.loans_pending),
            loans_active: Table::from_rows(snapshot.loans_active),
            stocks: Table::from_rows(snapshot.stocks),
            transactions: Journal {
                rows: snapshot.transactions,
            },
            stock_transactions: Journal {
                rows: snapshot.stock_transactions,
            },
            current_date: snapshot.current_date,
            backend,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            credentials: self.credentials.to_rows(),
            accounts: self.accounts.to_rows(),
            loans_pending: self.loans_pending.to_rows(),
            loans_active: self.loans_active.to_rows(),
            stocks: self.stocks.to_rows(),
            transactions: self.transactions.rows.clone(),
            stock_transactions: self.stock_transactions.rows.clone(),
            current_date: self.current_date,
        }
    }

    /// Flushes the current state through the backend.
    pub fn flush(&self) -> BankResult<()> {
        self.backend.persist(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn json_backend() -> JsonFileBackend {
        let path = std::env::temp_dir().join(format!("teller_{}.json", uuid::Uuid::new_v4()));
        JsonFileBackend::new(path)
    }

    #[test]
    fn empty_backend_opens_empty_store() {
        let store = Store::open(Box::new(MemoryBackend)).unwrap();
        assert!(store.accounts.is_empty());
        assert_eq!(store.current_date, genesis_date());
    }

    #[test]
    fn table_upsert_and_delete() {
        let mut table: Table<Stock> = Table::default();
        table.upsert(Stock::new("ACME", dec!(10)));
        assert!(table.contains(&"ACME".to_string()));

        let previous = table.upsert(Stock::new("ACME", dec!(15)));
        assert_eq!(previous.unwrap().price, dec!(10));
        assert_eq!(table.len(), 1);

        assert!(table.delete(&"ACME".to_string()).is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn snapshot_round_trips_through_json_file() {
        let backend = json_backend();
        {
            let mut store = Store::open(Box::new(JsonFileBackend::new(
                backend.path.clone(),
            )))
            .unwrap();
            store.stocks.upsert(Stock::new("ACME", dec!(10)));
            store.current_date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
            store.flush().unwrap();
        }

        let reloaded = Store::open(Box::new(backend)).unwrap();
        assert_eq!(
            reloaded.stocks.get(&"ACME".to_string()).unwrap().price,
            dec!(10)
        );
        assert_eq!(
            reloaded.current_date,
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
        );
    }
}
