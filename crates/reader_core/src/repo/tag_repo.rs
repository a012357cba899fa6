//! Tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist reader tags (stacks, flags, colours, modes).
//! - Own publication/note tag association writes.
//!
//! # Invariants
//! - Active tag names are unique per `(reader, type)`.
//! - Deleting a tag tombstones the row and removes every association in
//!   the same transaction; other tags are untouched.
//! - Tag lists are ordered by `name COLLATE NOCASE ASC, id ASC`.

use crate::model::note::NoteId;
use crate::model::publication::PublicationId;
use crate::model::reader::ReaderId;
use crate::model::tag::{normalize_tag_name, Tag, TagId, TagType};
use crate::repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult, SchemaRequirement};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const TAG_SELECT_SQL: &str = "SELECT t.id, t.reader_id, t.type, t.name FROM tags t";

const TAG_SCHEMA: &[SchemaRequirement] = &[
    ("tags", &["id", "reader_id", "type", "name", "deleted_at"]),
    ("publication_tags", &["publication_id", "tag_id"]),
    ("note_tags", &["note_id", "tag_id"]),
];

/// Repository interface for tag operations.
pub trait TagRepository {
    /// Creates one tag. Flag names are stored lowercase.
    fn create_tag(&self, reader_id: ReaderId, kind: TagType, name: &str) -> RepoResult<Tag>;
    /// Loads one active tag.
    fn get_tag(&self, tag_id: TagId) -> RepoResult<Option<Tag>>;
    /// Lists active tags of one reader.
    fn list_tags(&self, reader_id: ReaderId) -> RepoResult<Vec<Tag>>;
    /// Tombstones one tag and drops its associations.
    fn delete_tag(&self, tag_id: TagId) -> RepoResult<()>;
    fn assign_to_publication(&self, tag_id: TagId, publication_id: PublicationId)
        -> RepoResult<()>;
    fn unassign_from_publication(
        &self,
        tag_id: TagId,
        publication_id: PublicationId,
    ) -> RepoResult<()>;
    fn assign_to_note(&self, tag_id: TagId, note_id: NoteId) -> RepoResult<()>;
    fn unassign_from_note(&self, tag_id: TagId, note_id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, TAG_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&self, reader_id: ReaderId, kind: TagType, name: &str) -> RepoResult<Tag> {
        let name = normalize_tag_name(kind, name)
            .ok_or_else(|| RepoError::InvalidData("tag name must not be blank".to_string()))?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let tag = insert_tag(&tx, reader_id, kind, &name)?;
        tx.commit()?;
        Ok(tag)
    }

    fn get_tag(&self, tag_id: TagId) -> RepoResult<Option<Tag>> {
        let sql = format!("{TAG_SELECT_SQL} WHERE t.id = ?1 AND t.deleted_at IS NULL;");
        let tag = self
            .conn
            .query_row(&sql, [tag_id.to_string()], |row| Ok(parse_tag_row(row)))
            .optional()?;
        tag.transpose()
    }

    fn list_tags(&self, reader_id: ReaderId) -> RepoResult<Vec<Tag>> {
        let sql = format!(
            "{TAG_SELECT_SQL}
             WHERE t.reader_id = ?1 AND t.deleted_at IS NULL
             ORDER BY t.name COLLATE NOCASE ASC, t.id ASC;"
        );
        collect_tags(self.conn, &sql, &reader_id.to_string())
    }

    fn delete_tag(&self, tag_id: TagId) -> RepoResult<()> {
        let id = tag_id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE tags
             SET deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            [id.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("tag", tag_id));
        }
        tx.execute("DELETE FROM publication_tags WHERE tag_id = ?1;", [id.as_str()])?;
        tx.execute("DELETE FROM note_tags WHERE tag_id = ?1;", [id.as_str()])?;
        tx.commit()?;
        Ok(())
    }

    fn assign_to_publication(
        &self,
        tag_id: TagId,
        publication_id: PublicationId,
    ) -> RepoResult<()> {
        self.ensure_active(tag_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO publication_tags (publication_id, tag_id) VALUES (?1, ?2);",
            params![publication_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    }

    fn unassign_from_publication(
        &self,
        tag_id: TagId,
        publication_id: PublicationId,
    ) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM publication_tags WHERE publication_id = ?1 AND tag_id = ?2;",
            params![publication_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    }

    fn assign_to_note(&self, tag_id: TagId, note_id: NoteId) -> RepoResult<()> {
        self.ensure_active(tag_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2);",
            params![note_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    }

    fn unassign_from_note(&self, tag_id: TagId, note_id: NoteId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2;",
            params![note_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    }
}

impl SqliteTagRepository<'_> {
    fn ensure_active(&self, tag_id: TagId) -> RepoResult<()> {
        match self.get_tag(tag_id)? {
            Some(_) => Ok(()),
            None => Err(RepoError::not_found("tag", tag_id)),
        }
    }
}

/// Inserts one active tag; `name` must already be normalized.
pub(crate) fn insert_tag(
    conn: &Connection,
    reader_id: ReaderId,
    kind: TagType,
    name: &str,
) -> RepoResult<Tag> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM tags
            WHERE reader_id = ?1 AND type = ?2 AND name = ?3 AND deleted_at IS NULL
        );",
        params![reader_id.to_string(), kind.as_str(), name],
        |row| row.get(0),
    )?;
    if exists == 1 {
        return Err(RepoError::Conflict(format!(
            "{} tag `{name}` already exists",
            kind.as_str()
        )));
    }

    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO tags (id, reader_id, type, name) VALUES (?1, ?2, ?3, ?4);",
        params![id.to_string(), reader_id.to_string(), kind.as_str(), name],
    )?;
    Ok(Tag {
        id,
        reader_id,
        name: name.to_string(),
        kind,
    })
}

/// Active tags attached to one publication.
pub(crate) fn load_publication_tags(conn: &Connection, publication_id: &str) -> RepoResult<Vec<Tag>> {
    let sql = format!(
        "{TAG_SELECT_SQL}
         INNER JOIN publication_tags pt ON pt.tag_id = t.id
         WHERE pt.publication_id = ?1 AND t.deleted_at IS NULL
         ORDER BY t.name COLLATE NOCASE ASC, t.id ASC;"
    );
    collect_tags(conn, &sql, publication_id)
}

/// Active tags attached to one note.
pub(crate) fn load_note_tags(conn: &Connection, note_id: &str) -> RepoResult<Vec<Tag>> {
    let sql = format!(
        "{TAG_SELECT_SQL}
         INNER JOIN note_tags nt ON nt.tag_id = t.id
         WHERE nt.note_id = ?1 AND t.deleted_at IS NULL
         ORDER BY t.name COLLATE NOCASE ASC, t.id ASC;"
    );
    collect_tags(conn, &sql, note_id)
}

fn collect_tags(conn: &Connection, sql: &str, key: &str) -> RepoResult<Vec<Tag>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(parse_tag_row(row)?);
    }
    Ok(tags)
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let id: String = row.get("id")?;
    let reader_id: String = row.get("reader_id")?;
    let kind_text: String = row.get("type")?;
    let kind = TagType::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid tag type `{kind_text}` in tags.type"))
    })?;

    Ok(Tag {
        id: parse_uuid(&id, "tags.id")?,
        reader_id: parse_uuid(&reader_id, "tags.reader_id")?,
        name: row.get("name")?,
        kind,
    })
}
