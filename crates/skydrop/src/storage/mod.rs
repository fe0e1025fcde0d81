//! Storage layer for skydrop.
//!
//! This module provides `SQLite`-based persistent storage for per-user order
//! logs. A log is stored whole, as the JSON array of its booking records, and
//! every write replaces the previous value for that key.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::BookingRecord;

/// Storage engine for order logs.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets the dashboard read while a booking is being written
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the order log stored under `key`.
    ///
    /// A key that was never written yields an empty log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptOrderLog`] if the stored value is not a valid
    /// log, or an error if the database operation fails.
    pub fn load_orders(&self, key: &str) -> Result<Vec<BookingRecord>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT orders FROM order_logs WHERE user_key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| Error::CorruptOrderLog {
                key: key.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the order log stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database operation fails.
    pub fn save_orders(&self, key: &str, orders: &[BookingRecord]) -> Result<()> {
        let raw = serde_json::to_string(orders)?;
        let updated_at = Utc::now().to_rfc3339();

        self.conn.execute(
            r"
            INSERT INTO order_logs (user_key, orders, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_key) DO UPDATE SET
                orders = excluded.orders,
                updated_at = excluded.updated_at
            ",
            params![key, raw, updated_at],
        )?;

        debug!(key, orders = orders.len(), "Saved order log");
        Ok(())
    }

    /// Delete the order log stored under `key`.
    ///
    /// Returns `true` if a log was deleted, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear_orders(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM order_logs WHERE user_key = ?1", [key])?;
        if affected > 0 {
            info!(key, "Cleared order log");
        }
        Ok(affected > 0)
    }

    /// Keys of every stored order log, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user_keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_key FROM order_logs ORDER BY updated_at DESC, user_key")?;

        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(keys)
    }

    /// Count orders across every well-formed log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_orders(&self) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            r"
            SELECT COALESCE(SUM(
                CASE WHEN json_valid(orders) THEN json_array_length(orders) ELSE 0 END
            ), 0)
            FROM order_logs
            ",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let user_logs: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM order_logs", [], |row| row.get(0))?;
        let total_orders = self.count_orders()?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM order_logs ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let last_updated = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            user_logs,
            total_orders,
            last_updated,
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of stored order logs.
    pub user_logs: i64,
    /// Total number of orders across all logs.
    pub total_orders: i64,
    /// When any log was last written.
    pub last_updated: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use crate::model::BookingStatus;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_load_missing_key_is_empty() {
        let storage = create_test_storage();
        assert!(storage.load_orders("drone_orders_nobody").unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let storage = create_test_storage();
        let orders = vec![
            fixtures::record("DRN-1", Utc::now()),
            fixtures::record("DRN-2", Utc::now()),
        ];

        storage.save_orders("drone_orders_a", &orders).unwrap();
        let loaded = storage.load_orders("drone_orders_a").unwrap();
        assert_eq!(loaded, orders);
    }

    #[test]
    fn test_save_replaces_existing_log() {
        let storage = create_test_storage();
        let mut orders = vec![fixtures::record("DRN-1", Utc::now())];
        storage.save_orders("k", &orders).unwrap();

        orders[0].status = BookingStatus::Delivered;
        orders.push(fixtures::record("DRN-2", Utc::now()));
        storage.save_orders("k", &orders).unwrap();

        let loaded = storage.load_orders("k").unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].is_delivered());
        assert_eq!(storage.user_keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_logs_are_isolated_per_key() {
        let storage = create_test_storage();
        storage
            .save_orders("drone_orders_a", &[fixtures::record("DRN-A", Utc::now())])
            .unwrap();

        assert!(storage.load_orders("drone_orders_b").unwrap().is_empty());
        assert_eq!(storage.load_orders("drone_orders_a").unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_log_is_reported() {
        let storage = create_test_storage();
        storage
            .conn
            .execute(
                "INSERT INTO order_logs (user_key, orders, updated_at) VALUES (?1, ?2, ?3)",
                params!["bad", "{not json", Utc::now().to_rfc3339()],
            )
            .unwrap();

        let err = storage.load_orders("bad").unwrap_err();
        assert!(matches!(err, Error::CorruptOrderLog { ref key, .. } if key == "bad"));
        // Counting skips logs it cannot parse.
        assert_eq!(storage.count_orders().unwrap(), 0);
    }

    #[test]
    fn test_clear_orders() {
        let storage = create_test_storage();
        storage
            .save_orders("k", &[fixtures::record("DRN-1", Utc::now())])
            .unwrap();

        assert!(storage.clear_orders("k").unwrap());
        assert!(!storage.clear_orders("k").unwrap());
        assert!(storage.load_orders("k").unwrap().is_empty());
    }

    #[test]
    fn test_count_orders_across_logs() {
        let storage = create_test_storage();
        storage
            .save_orders(
                "a",
                &[
                    fixtures::record("DRN-1", Utc::now()),
                    fixtures::record("DRN-2", Utc::now()),
                ],
            )
            .unwrap();
        storage
            .save_orders("b", &[fixtures::record("DRN-3", Utc::now())])
            .unwrap();
        storage.save_orders("c", &[]).unwrap();

        assert_eq!(storage.count_orders().unwrap(), 3);
        assert_eq!(storage.user_keys().unwrap().len(), 3);
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.user_logs, 0);
        assert_eq!(stats.total_orders, 0);
        assert!(stats.last_updated.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let storage = create_test_storage();
        storage
            .save_orders("a", &[fixtures::record("DRN-1", Utc::now())])
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.user_logs, 1);
        assert_eq!(stats.total_orders, 1);
        assert!(stats.last_updated.is_some());
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path(), Path::new(":memory:"));
    }

    #[test]
    fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("orders.db");

        let storage = Storage::open(&db_path).unwrap();
        storage
            .save_orders("a", &[fixtures::record("DRN-1", Utc::now())])
            .unwrap();
        assert_eq!(storage.path(), db_path);
        drop(storage);

        // Reopening sees the same log.
        let storage = Storage::open(&db_path).unwrap();
        assert_eq!(storage.load_orders("a").unwrap().len(), 1);
        assert!(storage.stats().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested_path = dir.path().join("nested/deeper/orders.db");

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());
        drop(storage);
    }
}
