//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the reader core.
//! - Apply schema migrations in deterministic order.
//! - Register the SQL functions listing queries depend on.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.

mod functions;
pub mod migrations;
mod open;

pub use functions::{register_functions, UNICODE_LOWER};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("table `{table}` from migration `{migration}` is missing")]
    MissingTable {
        table: &'static str,
        migration: &'static str,
    },
}
