//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes with their bodies.
//! - Run notes listings compiled by [`crate::query`].
//! - Share note row hydration with the outline repository.
//!
//! # Invariants
//! - Listings only cover notes outside any context.
//! - Bodies are returned in insertion order.
//! - A note may only reference an active publication of its own reader.

use crate::model::note::{ContextId, NewNote, Note, NoteBody, NoteId, NoteUpdate};
use crate::model::reader::ReaderId;
use crate::query::{note_predicate, NoteFilter, NoteQuery};
use crate::repo::tag_repo::load_note_tags;
use crate::repo::{
    ensure_schema_ready, parse_optional_uuid, parse_uuid, RepoError, RepoResult,
    SchemaRequirement,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

pub(crate) const NOTE_SELECT_SQL: &str = "SELECT
    n.id,
    n.reader_id,
    n.publication_id,
    n.document,
    n.context_id,
    n.original_id,
    n.previous_id,
    n.next_id,
    n.parent_id,
    n.created_at,
    n.updated_at
FROM notes n";

pub(crate) const NOTE_SCHEMA: &[SchemaRequirement] = &[
    (
        "notes",
        &[
            "id",
            "reader_id",
            "publication_id",
            "document",
            "context_id",
            "original_id",
            "previous_id",
            "next_id",
            "parent_id",
            "created_at",
            "updated_at",
            "deleted_at",
        ],
    ),
    (
        "note_bodies",
        &["note_id", "position", "content", "motivation", "language"],
    ),
    ("note_tags", &["note_id", "tag_id"]),
];

/// Repository interface for notes outside outlines.
pub trait NoteRepository {
    /// Creates one note; outline links on `note` are not stored.
    fn create_note(&self, reader_id: ReaderId, note: &NewNote) -> RepoResult<Note>;
    /// Loads one active note, in or outside a context.
    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>>;
    /// Replaces the bodies of one active note, and its tags when given.
    fn update_note(&self, note_id: NoteId, update: &NoteUpdate) -> RepoResult<Note>;
    /// Soft-deletes one note outside any context.
    fn delete_note(&self, note_id: NoteId) -> RepoResult<()>;
    /// One page of the reader's notes.
    fn list_notes(&self, reader_id: ReaderId, query: &NoteQuery) -> RepoResult<Vec<Note>>;
    /// Size of the filtered notes set, ignoring pagination.
    fn count_notes(&self, reader_id: ReaderId, filters: &[NoteFilter]) -> RepoResult<u64>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, NOTE_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&self, reader_id: ReaderId, note: &NewNote) -> RepoResult<Note> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let id = insert_note(&tx, reader_id, note, &NoteLinks::default())?;
        let created = load_active_note(&tx, id)?
            .ok_or_else(|| RepoError::InvalidData("created note not readable".to_string()))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>> {
        load_active_note(self.conn, note_id)
    }

    fn update_note(&self, note_id: NoteId, update: &NoteUpdate) -> RepoResult<Note> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let id = note_id.to_string();
        let changed = tx.execute(
            "UPDATE notes
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            [id.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("note", note_id));
        }

        tx.execute("DELETE FROM note_bodies WHERE note_id = ?1;", [id.as_str()])?;
        insert_bodies(&tx, &id, &update.bodies)?;

        if let Some(tag_ids) = &update.tag_ids {
            tx.execute("DELETE FROM note_tags WHERE note_id = ?1;", [id.as_str()])?;
            for tag_id in tag_ids {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO note_tags (note_id, tag_id)
                     SELECT ?1, id FROM tags WHERE id = ?2 AND deleted_at IS NULL;",
                    params![id, tag_id.to_string()],
                )?;
                if inserted == 0 && !note_has_tag(&tx, &id, *tag_id)? {
                    return Err(RepoError::not_found("tag", *tag_id));
                }
            }
        }

        let updated = load_active_note(&tx, note_id)?
            .ok_or_else(|| RepoError::InvalidData("updated note not readable".to_string()))?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_note(&self, note_id: NoteId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND context_id IS NULL
               AND deleted_at IS NULL;",
            [note_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("note", note_id));
        }
        Ok(())
    }

    fn list_notes(&self, reader_id: ReaderId, query: &NoteQuery) -> RepoResult<Vec<Note>> {
        let predicate = note_predicate(reader_id, &query.filters);
        let sql = format!(
            "{NOTE_SELECT_SQL}{}{} LIMIT ? OFFSET ?;",
            predicate.where_sql(),
            query.order.order_sql()
        );

        let mut binds: Vec<Value> = predicate.binds().to_vec();
        binds.push(Value::Integer(i64::from(query.pagination.limit)));
        binds.push(Value::Integer(
            i64::try_from(query.pagination.offset()).unwrap_or(i64::MAX),
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(hydrate_note(self.conn, row)?);
        }
        Ok(notes)
    }

    fn count_notes(&self, reader_id: ReaderId, filters: &[NoteFilter]) -> RepoResult<u64> {
        let predicate = note_predicate(reader_id, filters);
        let sql = format!("SELECT COUNT(*) FROM notes n{};", predicate.where_sql());
        let count: i64 = self.conn.query_row(
            &sql,
            params_from_iter(predicate.binds().iter()),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Context and link columns written alongside a new note.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NoteLinks {
    pub context_id: Option<ContextId>,
    pub original_id: Option<NoteId>,
    pub previous: Option<NoteId>,
    pub next: Option<NoteId>,
    pub parent_id: Option<NoteId>,
}

/// Inserts one note and its bodies. Callers own the transaction.
pub(crate) fn insert_note(
    conn: &Connection,
    reader_id: ReaderId,
    note: &NewNote,
    links: &NoteLinks,
) -> RepoResult<NoteId> {
    if let Some(publication_id) = note.publication_id {
        let owned: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM publications
                WHERE id = ?1 AND reader_id = ?2 AND deleted_at IS NULL
            );",
            params![publication_id.to_string(), reader_id.to_string()],
            |row| row.get(0),
        )?;
        if owned != 1 {
            return Err(RepoError::not_found("publication", publication_id));
        }
    }

    let id = Uuid::new_v4();
    let id_text = id.to_string();
    conn.execute(
        "INSERT INTO notes (
            id, reader_id, publication_id, document, context_id,
            original_id, previous_id, next_id, parent_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            id_text,
            reader_id.to_string(),
            note.publication_id.map(|value| value.to_string()),
            note.document,
            links.context_id.map(|value| value.to_string()),
            links.original_id.map(|value| value.to_string()),
            links.previous.map(|value| value.to_string()),
            links.next.map(|value| value.to_string()),
            links.parent_id.map(|value| value.to_string()),
        ],
    )?;
    insert_bodies(conn, &id_text, &note.bodies)?;
    Ok(id)
}

pub(crate) fn insert_bodies(conn: &Connection, note_id: &str, bodies: &[NoteBody]) -> RepoResult<()> {
    for (position, body) in bodies.iter().enumerate() {
        conn.execute(
            "INSERT INTO note_bodies (note_id, position, content, motivation, language)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                note_id,
                i64::try_from(position).unwrap_or(i64::MAX),
                body.content,
                body.motivation,
                body.language,
            ],
        )?;
    }
    Ok(())
}

fn note_has_tag(conn: &Connection, note_id: &str, tag_id: Uuid) -> RepoResult<bool> {
    let found: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM note_tags WHERE note_id = ?1 AND tag_id = ?2);",
        params![note_id, tag_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(found == 1)
}

pub(crate) fn load_active_note(conn: &Connection, note_id: NoteId) -> RepoResult<Option<Note>> {
    let sql = format!("{NOTE_SELECT_SQL} WHERE n.id = ?1 AND n.deleted_at IS NULL;");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([note_id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(hydrate_note(conn, row)?)),
        None => Ok(None),
    }
}

/// Builds one note from a `NOTE_SELECT_SQL` row plus bodies and tags.
pub(crate) fn hydrate_note(conn: &Connection, row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let reader_text: String = row.get("reader_id")?;

    Ok(Note {
        id: parse_uuid(&id_text, "notes.id")?,
        reader_id: parse_uuid(&reader_text, "notes.reader_id")?,
        publication_id: parse_optional_uuid(row.get("publication_id")?, "notes.publication_id")?,
        document: row.get("document")?,
        context_id: parse_optional_uuid(row.get("context_id")?, "notes.context_id")?,
        original_id: parse_optional_uuid(row.get("original_id")?, "notes.original_id")?,
        previous: parse_optional_uuid(row.get("previous_id")?, "notes.previous_id")?,
        next: parse_optional_uuid(row.get("next_id")?, "notes.next_id")?,
        parent_id: parse_optional_uuid(row.get("parent_id")?, "notes.parent_id")?,
        bodies: load_bodies(conn, &id_text)?,
        tags: load_note_tags(conn, &id_text)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_bodies(conn: &Connection, note_id: &str) -> RepoResult<Vec<NoteBody>> {
    let mut stmt = conn.prepare(
        "SELECT content, motivation, language
         FROM note_bodies
         WHERE note_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([note_id])?;
    let mut bodies = Vec::new();
    while let Some(row) = rows.next()? {
        bodies.push(NoteBody {
            content: row.get("content")?,
            motivation: row.get("motivation")?,
            language: row.get("language")?,
        });
    }
    Ok(bodies)
}
