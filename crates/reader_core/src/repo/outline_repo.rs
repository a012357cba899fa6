//! Outline (note context) repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist outline contexts and the notes placed in them.
//! - Keep `previous`/`next` links consistent on insert, copy and removal.
//!
//! # Invariants
//! - Every link write runs in one immediate transaction together with the
//!   note insert or delete it belongs to.
//! - Linked neighbours and parents must be active notes of the same context.
//! - Siblings share one `parent_id`; a new note inherits it from its
//!   neighbour when none is given.
//! - Removing a note removes its whole subtree.

use crate::model::note::{ContextId, NewNote, Note, NoteContext, NoteId};
use crate::model::reader::ReaderId;
use crate::repo::note_repo::{
    hydrate_note, insert_bodies, insert_note, load_active_note, NoteLinks, NOTE_SCHEMA,
    NOTE_SELECT_SQL,
};
use crate::repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult, SchemaRequirement};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Context type stored for outlines.
pub const OUTLINE_CONTEXT_TYPE: &str = "outline";

const CONTEXT_SELECT_SQL: &str = "SELECT
    id, reader_id, type, name, description, created_at, updated_at
FROM note_contexts";

const CONTEXT_SCHEMA: &[SchemaRequirement] = &[(
    "note_contexts",
    &[
        "id",
        "reader_id",
        "type",
        "name",
        "description",
        "created_at",
        "updated_at",
        "deleted_at",
    ],
)];

/// Repository interface for outline operations.
pub trait OutlineRepository {
    fn create_context(
        &self,
        reader_id: ReaderId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> RepoResult<NoteContext>;
    /// Loads one active context.
    fn get_context(&self, context_id: ContextId) -> RepoResult<Option<NoteContext>>;
    /// Soft-deletes a context and every note in it.
    fn delete_context(&self, context_id: ContextId) -> RepoResult<()>;
    /// Active notes of one context, oldest first.
    fn list_context_notes(&self, context_id: ContextId) -> RepoResult<Vec<Note>>;
    /// Inserts a note into a context and relinks its neighbours.
    ///
    /// Without `previous` and `next` the note is appended to the tail of
    /// its sibling list.
    fn add_note(
        &self,
        reader_id: ReaderId,
        context_id: ContextId,
        note: &NewNote,
    ) -> RepoResult<Note>;
    /// Copies a note (bodies and tags) to the tail of the context's root list.
    fn copy_note(
        &self,
        reader_id: ReaderId,
        context_id: ContextId,
        source_id: NoteId,
    ) -> RepoResult<Note>;
    /// Removes a note and its subtree, joining its neighbours.
    fn remove_note(&self, context_id: ContextId, note_id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed outline repository.
pub struct SqliteOutlineRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOutlineRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, CONTEXT_SCHEMA)?;
        ensure_schema_ready(conn, NOTE_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl OutlineRepository for SqliteOutlineRepository<'_> {
    fn create_context(
        &self,
        reader_id: ReaderId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> RepoResult<NoteContext> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO note_contexts (id, reader_id, type, name, description)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                reader_id.to_string(),
                OUTLINE_CONTEXT_TYPE,
                name,
                description
            ],
        )?;
        self.get_context(id)?
            .ok_or_else(|| RepoError::InvalidData("created context not readable".to_string()))
    }

    fn get_context(&self, context_id: ContextId) -> RepoResult<Option<NoteContext>> {
        load_active_context(self.conn, context_id)
    }

    fn delete_context(&self, context_id: ContextId) -> RepoResult<()> {
        let id = context_id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE note_contexts
             SET deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            [id.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("outline", context_id));
        }
        tx.execute(
            "UPDATE notes
             SET deleted_at = (strftime('%s', 'now') * 1000)
             WHERE context_id = ?1
               AND deleted_at IS NULL;",
            [id.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_context_notes(&self, context_id: ContextId) -> RepoResult<Vec<Note>> {
        let sql = format!(
            "{NOTE_SELECT_SQL}
             WHERE n.context_id = ?1
               AND n.deleted_at IS NULL
             ORDER BY n.created_at ASC, n.id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([context_id.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(hydrate_note(self.conn, row)?);
        }
        Ok(notes)
    }

    fn add_note(
        &self,
        reader_id: ReaderId,
        context_id: ContextId,
        note: &NewNote,
    ) -> RepoResult<Note> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_context_exists(&tx, context_id)?;

        let previous = note
            .previous
            .map(|id| load_context_note(&tx, context_id, id))
            .transpose()?;
        let next = note
            .next
            .map(|id| load_context_note(&tx, context_id, id))
            .transpose()?;
        if let Some(parent_id) = note.parent_id {
            load_context_note(&tx, context_id, parent_id)?;
        }

        let links = resolve_links(&tx, context_id, note.parent_id, previous.as_ref(), next.as_ref())?;
        let id = insert_note(&tx, reader_id, note, &links)?;
        relink_neighbours(&tx, id, links.previous, links.next)?;

        let created = load_active_note(&tx, id)?
            .ok_or_else(|| RepoError::InvalidData("created note not readable".to_string()))?;
        tx.commit()?;
        Ok(created)
    }

    fn copy_note(
        &self,
        reader_id: ReaderId,
        context_id: ContextId,
        source_id: NoteId,
    ) -> RepoResult<Note> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_context_exists(&tx, context_id)?;
        let source = load_active_note(&tx, source_id)?
            .filter(|source| source.reader_id == reader_id)
            .ok_or_else(|| RepoError::not_found("note", source_id))?;

        let links = NoteLinks {
            context_id: Some(context_id),
            original_id: Some(source.id),
            previous: sibling_tail(&tx, context_id, None)?,
            next: None,
            parent_id: None,
        };
        let copy = NewNote {
            publication_id: source.publication_id,
            document: source.document.clone(),
            bodies: Vec::new(),
            previous: None,
            next: None,
            parent_id: None,
        };
        let id = insert_note(&tx, reader_id, &copy, &links)?;
        insert_bodies(&tx, &id.to_string(), &source.bodies)?;
        tx.execute(
            "INSERT INTO note_tags (note_id, tag_id)
             SELECT ?1, tag_id FROM note_tags WHERE note_id = ?2;",
            params![id.to_string(), source.id.to_string()],
        )?;
        relink_neighbours(&tx, id, links.previous, None)?;

        let created = load_active_note(&tx, id)?
            .ok_or_else(|| RepoError::InvalidData("copied note not readable".to_string()))?;
        tx.commit()?;
        Ok(created)
    }

    fn remove_note(&self, context_id: ContextId, note_id: NoteId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let note = load_context_note(&tx, context_id, note_id)?;

        tx.execute(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id FROM notes WHERE id = ?1
                UNION ALL
                SELECT child.id
                FROM notes child
                INNER JOIN subtree parent ON child.parent_id = parent.id
                WHERE child.deleted_at IS NULL
            )
            UPDATE notes
            SET deleted_at = (strftime('%s', 'now') * 1000),
                updated_at = (strftime('%s', 'now') * 1000)
            WHERE id IN (SELECT id FROM subtree)
              AND deleted_at IS NULL;",
            [note_id.to_string()],
        )?;

        if let Some(previous) = note.previous {
            set_link(&tx, previous, "next_id", note.next)?;
        }
        if let Some(next) = note.next {
            set_link(&tx, next, "previous_id", note.previous)?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Picks the final links of a new note from the requested neighbours.
///
/// Given only one neighbour, the other side is taken from that
/// neighbour's current link so the note is spliced in, not forked off.
fn resolve_links(
    conn: &Connection,
    context_id: ContextId,
    parent_id: Option<NoteId>,
    previous: Option<&Note>,
    next: Option<&Note>,
) -> RepoResult<NoteLinks> {
    let neighbour_parent = previous.or(next).map(|neighbour| neighbour.parent_id);
    let parent_id = match (parent_id, neighbour_parent) {
        (Some(requested), Some(actual)) if actual != Some(requested) => {
            return Err(RepoError::InvalidLink(format!(
                "neighbour is not a child of {requested}"
            )));
        }
        (Some(requested), _) => Some(requested),
        (None, Some(actual)) => actual,
        (None, None) => None,
    };
    if let (Some(previous), Some(next)) = (previous, next) {
        if previous.parent_id != next.parent_id {
            return Err(RepoError::InvalidLink(
                "previous and next belong to different parents".to_string(),
            ));
        }
        if previous.id == next.id || previous.next != Some(next.id) {
            return Err(RepoError::InvalidLink(format!(
                "{} is not directly followed by {}",
                previous.id, next.id
            )));
        }
    }

    let (previous, next) = match (previous, next) {
        (Some(previous), Some(next)) => (Some(previous.id), Some(next.id)),
        (Some(previous), None) => (Some(previous.id), previous.next),
        (None, Some(next)) => (next.previous, Some(next.id)),
        (None, None) => (sibling_tail(conn, context_id, parent_id)?, None),
    };

    Ok(NoteLinks {
        context_id: Some(context_id),
        original_id: None,
        previous,
        next,
        parent_id,
    })
}

fn relink_neighbours(
    conn: &Connection,
    note_id: NoteId,
    previous: Option<NoteId>,
    next: Option<NoteId>,
) -> RepoResult<()> {
    if let Some(previous) = previous {
        set_link(conn, previous, "next_id", Some(note_id))?;
    }
    if let Some(next) = next {
        set_link(conn, next, "previous_id", Some(note_id))?;
    }
    Ok(())
}

fn set_link(
    conn: &Connection,
    note_id: NoteId,
    column: &'static str,
    target: Option<NoteId>,
) -> RepoResult<()> {
    conn.execute(
        &format!(
            "UPDATE notes
             SET {column} = ?1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;"
        ),
        params![target.map(|id| id.to_string()), note_id.to_string()],
    )?;
    Ok(())
}

/// Last active sibling under `parent_id` (`None` = root list).
fn sibling_tail(
    conn: &Connection,
    context_id: ContextId,
    parent_id: Option<NoteId>,
) -> RepoResult<Option<NoteId>> {
    let tail: Option<String> = conn
        .query_row(
            "SELECT id FROM notes
             WHERE context_id = ?1
               AND parent_id IS ?2
               AND next_id IS NULL
               AND deleted_at IS NULL
             ORDER BY created_at DESC, id ASC
             LIMIT 1;",
            params![context_id.to_string(), parent_id.map(|id| id.to_string())],
            |row| row.get(0),
        )
        .optional()?;
    tail.map(|id| parse_uuid(&id, "notes.id")).transpose()
}

fn load_context_note(conn: &Connection, context_id: ContextId, note_id: NoteId) -> RepoResult<Note> {
    load_active_note(conn, note_id)?
        .filter(|note| note.context_id == Some(context_id))
        .ok_or_else(|| RepoError::not_found("note", note_id))
}

fn ensure_context_exists(conn: &Connection, context_id: ContextId) -> RepoResult<()> {
    match load_active_context(conn, context_id)? {
        Some(_) => Ok(()),
        None => Err(RepoError::not_found("outline", context_id)),
    }
}

fn load_active_context(conn: &Connection, context_id: ContextId) -> RepoResult<Option<NoteContext>> {
    let sql = format!("{CONTEXT_SELECT_SQL} WHERE id = ?1 AND deleted_at IS NULL;");
    conn.query_row(&sql, [context_id.to_string()], |row| {
        Ok(parse_context_row(row))
    })
    .optional()?
    .transpose()
}

fn parse_context_row(row: &Row<'_>) -> RepoResult<NoteContext> {
    let id: String = row.get("id")?;
    let reader_id: String = row.get("reader_id")?;
    Ok(NoteContext {
        id: parse_uuid(&id, "note_contexts.id")?,
        reader_id: parse_uuid(&reader_id, "note_contexts.reader_id")?,
        kind: row.get("type")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
