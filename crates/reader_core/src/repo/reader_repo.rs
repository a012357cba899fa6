//! Reader repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `auth_id` is unique across readers.
//! - A reader is created together with its default flag and colour tags.

use crate::model::reader::{Reader, ReaderId};
use crate::model::tag::{TagType, DEFAULT_COLOURS, DEFAULT_FLAGS};
use crate::repo::tag_repo::insert_tag;
use crate::repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult, SchemaRequirement};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const READER_SELECT_SQL: &str = "SELECT id, auth_id, name, created_at FROM readers";

const READER_SCHEMA: &[SchemaRequirement] = &[
    ("readers", &["id", "auth_id", "name", "created_at"]),
    ("tags", &["id", "reader_id", "type", "name"]),
];

pub trait ReaderRepository {
    /// Creates a reader and seeds its default tags in one transaction.
    fn create_reader(&self, auth_id: &str, name: Option<&str>) -> RepoResult<Reader>;
    fn find_by_auth_id(&self, auth_id: &str) -> RepoResult<Option<Reader>>;
    fn get_reader(&self, reader_id: ReaderId) -> RepoResult<Option<Reader>>;
}

/// SQLite-backed reader repository.
pub struct SqliteReaderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReaderRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, READER_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl ReaderRepository for SqliteReaderRepository<'_> {
    fn create_reader(&self, auth_id: &str, name: Option<&str>) -> RepoResult<Reader> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let taken: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM readers WHERE auth_id = ?1);",
            [auth_id],
            |row| row.get(0),
        )?;
        if taken == 1 {
            return Err(RepoError::Conflict(format!(
                "reader already exists for auth id `{auth_id}`"
            )));
        }

        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO readers (id, auth_id, name) VALUES (?1, ?2, ?3);",
            params![id.to_string(), auth_id, name],
        )?;
        for flag in DEFAULT_FLAGS {
            insert_tag(&tx, id, TagType::Flag, flag)?;
        }
        for colour in DEFAULT_COLOURS {
            insert_tag(&tx, id, TagType::Colour, colour)?;
        }

        let sql = format!("{READER_SELECT_SQL} WHERE id = ?1;");
        let reader = tx.query_row(&sql, [id.to_string()], |row| Ok(parse_reader_row(row)))??;
        tx.commit()?;
        Ok(reader)
    }

    fn find_by_auth_id(&self, auth_id: &str) -> RepoResult<Option<Reader>> {
        let sql = format!("{READER_SELECT_SQL} WHERE auth_id = ?1;");
        self.conn
            .query_row(&sql, [auth_id], |row| Ok(parse_reader_row(row)))
            .optional()?
            .transpose()
    }

    fn get_reader(&self, reader_id: ReaderId) -> RepoResult<Option<Reader>> {
        let sql = format!("{READER_SELECT_SQL} WHERE id = ?1;");
        self.conn
            .query_row(&sql, [reader_id.to_string()], |row| Ok(parse_reader_row(row)))
            .optional()?
            .transpose()
    }
}

fn parse_reader_row(row: &Row<'_>) -> RepoResult<Reader> {
    let id: String = row.get("id")?;
    Ok(Reader {
        id: parse_uuid(&id, "readers.id")?,
        auth_id: row.get("auth_id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}
