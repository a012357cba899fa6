//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite statements from service orchestration.
//!
//! # Invariants
//! - Repositories are constructed only over connections at the latest
//!   schema version.
//! - Soft-deleted rows are invisible to every read path.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod note_repo;
pub mod outline_repo;
pub mod publication_repo;
pub mod reader_repo;
pub mod tag_repo;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::Connection;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    /// Target row does not exist or is soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    /// Write would violate a uniqueness rule.
    #[error("{0}")]
    Conflict(String),
    /// Requested outline links contradict the stored ones.
    #[error("invalid outline link: {0}")]
    InvalidLink(String),
    /// Persisted data cannot be converted to a valid read model.
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("repository requires column `{column}` in table `{table}`")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Required tables and their columns for one repository.
pub(crate) type SchemaRequirement = (&'static str, &'static [&'static str]);

/// Checks schema version and the presence of every required column.
pub(crate) fn ensure_schema_ready(
    conn: &Connection,
    requirements: &[SchemaRequirement],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in requirements {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

/// Decodes a JSON string array column.
pub(crate) fn parse_string_array(value: &str, column: &'static str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid JSON array in {column}: {err}")))
}

pub(crate) fn encode_string_array(values: &[String]) -> RepoResult<String> {
    serde_json::to_string(values)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode JSON array: {err}")))
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
