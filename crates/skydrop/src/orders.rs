//! Per-user order logs.
//!
//! The wizard appends to a log and the dashboard sweep rewrites it. Both go
//! through the [`OrderLog`] trait so they can run against the `SQLite`
//! store or an in-memory map.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::BookingRecord;
use crate::storage::Storage;

/// A keyed store of order logs.
///
/// Writes replace the whole log. Read-modify-write sequences are not
/// atomic across processes.
pub trait OrderLog: Send + Sync + std::fmt::Debug {
    /// Load the log stored under `key`, empty if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or parsed.
    fn load(&self, key: &str) -> Result<Vec<BookingRecord>>;

    /// Replace the log stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written.
    fn save(&self, key: &str, orders: &[BookingRecord]) -> Result<()>;

    /// Delete the log stored under `key`. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be deleted.
    fn clear(&self, key: &str) -> Result<bool>;

    /// Append one record to the log stored under `key`.
    ///
    /// Returns the new length of the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or written.
    fn append(&self, key: &str, record: BookingRecord) -> Result<usize> {
        let mut orders = self.load(key)?;
        orders.push(record);
        self.save(key, &orders)?;
        debug!(key, len = orders.len(), "Appended booking to order log");
        Ok(orders.len())
    }
}

/// Order logs kept in the `SQLite` database.
#[derive(Debug)]
pub struct SqliteOrderLog {
    storage: Mutex<Storage>,
}

impl SqliteOrderLog {
    /// Wrap an open storage.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage: Mutex::new(storage),
        }
    }

    /// Run a closure against the underlying storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lock is poisoned or the closure fails.
    pub fn with_storage<T>(&self, f: impl FnOnce(&Storage) -> Result<T>) -> Result<T> {
        f(&*self.lock()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Storage>> {
        self.storage
            .lock()
            .map_err(|_| Error::internal("order storage lock poisoned"))
    }
}

impl OrderLog for SqliteOrderLog {
    fn load(&self, key: &str) -> Result<Vec<BookingRecord>> {
        self.lock()?.load_orders(key)
    }

    fn save(&self, key: &str, orders: &[BookingRecord]) -> Result<()> {
        self.lock()?.save_orders(key, orders)
    }

    fn clear(&self, key: &str) -> Result<bool> {
        self.lock()?.clear_orders(key)
    }
}

/// Order logs held in memory.
#[derive(Debug, Default)]
pub struct MemoryOrderLog {
    logs: Mutex<HashMap<String, Vec<BookingRecord>>>,
}

impl MemoryOrderLog {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<BookingRecord>>>> {
        self.logs
            .lock()
            .map_err(|_| Error::internal("order log lock poisoned"))
    }
}

impl OrderLog for MemoryOrderLog {
    fn load(&self, key: &str) -> Result<Vec<BookingRecord>> {
        Ok(self.lock()?.get(key).cloned().unwrap_or_default())
    }

    fn save(&self, key: &str, orders: &[BookingRecord]) -> Result<()> {
        self.lock()?.insert(key.to_string(), orders.to_vec());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }
}
