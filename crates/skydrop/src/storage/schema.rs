//! `SQLite` schema definitions for skydrop.
//!
//! Each user's order log is one row holding the whole log as a JSON array,
//! keyed by `drone_orders_<user id>`.

/// SQL statement to create the order log table.
pub const CREATE_ORDER_LOGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS order_logs (
    user_key TEXT PRIMARY KEY,
    orders TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on `updated_at` for recency queries.
pub const CREATE_UPDATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_order_logs_updated ON order_logs(updated_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ORDER_LOGS_TABLE,
    CREATE_UPDATED_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_order_logs_table_columns() {
        assert!(CREATE_ORDER_LOGS_TABLE.contains("user_key TEXT PRIMARY KEY"));
        assert!(CREATE_ORDER_LOGS_TABLE.contains("orders TEXT NOT NULL"));
        assert!(CREATE_ORDER_LOGS_TABLE.contains("updated_at TEXT NOT NULL"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
