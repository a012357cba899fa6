//! Publication (library) repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist publications with their attributions and read activity.
//! - Run library listings compiled by [`crate::query`].
//!
//! # Invariants
//! - Listing count and listing page are driven by the same predicate.
//! - Type, keywords and attribution names are normalized on write.
//! - Attributions are returned in insertion order.

use crate::model::publication::{
    normalize_keywords, normalize_name, normalize_publication_type, Attribution, AttributionRole,
    NewPublication, Publication, PublicationId, ReadActivity,
};
use crate::model::reader::ReaderId;
use crate::query::{library_predicate, LibraryFilter, LibraryQuery};
use crate::repo::tag_repo::load_publication_tags;
use crate::repo::{
    encode_string_array, ensure_schema_ready, parse_string_array, parse_uuid, RepoError,
    RepoResult, SchemaRequirement,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use uuid::Uuid;

const PUBLICATION_SELECT_SQL: &str = "SELECT
    p.id,
    p.reader_id,
    p.name,
    p.type,
    p.abstract,
    p.description,
    p.date_published,
    p.languages,
    p.keywords,
    p.created_at,
    p.updated_at
FROM publications p";

const PUBLICATION_SCHEMA: &[SchemaRequirement] = &[
    (
        "publications",
        &[
            "id",
            "reader_id",
            "name",
            "type",
            "abstract",
            "description",
            "date_published",
            "languages",
            "keywords",
            "created_at",
            "updated_at",
            "deleted_at",
        ],
    ),
    (
        "attributions",
        &["id", "publication_id", "role", "name", "normalized_name", "position"],
    ),
    (
        "read_activities",
        &["id", "reader_id", "publication_id", "selector", "created_at"],
    ),
    ("publication_tags", &["publication_id", "tag_id"]),
];

/// Repository interface for library operations.
pub trait PublicationRepository {
    fn create_publication(
        &self,
        reader_id: ReaderId,
        publication: &NewPublication,
    ) -> RepoResult<Publication>;
    /// Loads one active publication.
    fn get_publication(&self, publication_id: PublicationId) -> RepoResult<Option<Publication>>;
    /// Soft-deletes one publication.
    fn delete_publication(&self, publication_id: PublicationId) -> RepoResult<()>;
    /// One page of the reader's library.
    fn list_library(&self, reader_id: ReaderId, query: &LibraryQuery)
        -> RepoResult<Vec<Publication>>;
    /// Size of the filtered library, ignoring pagination.
    fn count_library(&self, reader_id: ReaderId, filters: &[LibraryFilter]) -> RepoResult<u64>;
    fn record_read_activity(
        &self,
        reader_id: ReaderId,
        publication_id: PublicationId,
        selector: Option<&serde_json::Value>,
    ) -> RepoResult<ReadActivity>;
    /// Most recent read activity of one publication.
    fn latest_read_activity(
        &self,
        publication_id: PublicationId,
    ) -> RepoResult<Option<ReadActivity>>;
}

/// SQLite-backed publication repository.
pub struct SqlitePublicationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePublicationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, PUBLICATION_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl PublicationRepository for SqlitePublicationRepository<'_> {
    fn create_publication(
        &self,
        reader_id: ReaderId,
        publication: &NewPublication,
    ) -> RepoResult<Publication> {
        let id = Uuid::new_v4();
        let id_text = id.to_string();
        let reader_text = reader_id.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO publications (
                id, reader_id, name, type, abstract, description,
                date_published, languages, keywords
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                id_text,
                reader_text,
                publication.name.trim(),
                normalize_publication_type(&publication.kind),
                publication.summary,
                publication.description,
                publication.date_published,
                encode_string_array(&publication.languages)?,
                encode_string_array(&normalize_keywords(&publication.keywords))?,
            ],
        )?;

        for (position, attribution) in publication.attributions.iter().enumerate() {
            let position = i64::try_from(position).unwrap_or(i64::MAX);
            tx.execute(
                "INSERT INTO attributions (
                    id, reader_id, publication_id, role, name, normalized_name, position
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    Uuid::new_v4().to_string(),
                    reader_text,
                    id_text,
                    attribution.role.as_str(),
                    attribution.name.trim(),
                    normalize_name(&attribution.name),
                    position,
                ],
            )?;
        }

        let created = load_active_publication(&tx, &id_text)?
            .ok_or_else(|| RepoError::InvalidData("created publication not readable".to_string()))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_publication(&self, publication_id: PublicationId) -> RepoResult<Option<Publication>> {
        load_active_publication(self.conn, &publication_id.to_string())
    }

    fn delete_publication(&self, publication_id: PublicationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE publications
             SET deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            [publication_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("publication", publication_id));
        }
        Ok(())
    }

    fn list_library(
        &self,
        reader_id: ReaderId,
        query: &LibraryQuery,
    ) -> RepoResult<Vec<Publication>> {
        let predicate = library_predicate(reader_id, &query.filters);
        let sql = format!(
            "{PUBLICATION_SELECT_SQL}{}{} LIMIT ? OFFSET ?;",
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
        let mut publications = Vec::new();
        while let Some(row) = rows.next()? {
            publications.push(hydrate_publication(self.conn, row)?);
        }
        Ok(publications)
    }

    fn count_library(&self, reader_id: ReaderId, filters: &[LibraryFilter]) -> RepoResult<u64> {
        let predicate = library_predicate(reader_id, filters);
        let sql = format!("SELECT COUNT(*) FROM publications p{};", predicate.where_sql());
        let count: i64 = self.conn.query_row(
            &sql,
            params_from_iter(predicate.binds().iter()),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn record_read_activity(
        &self,
        reader_id: ReaderId,
        publication_id: PublicationId,
        selector: Option<&serde_json::Value>,
    ) -> RepoResult<ReadActivity> {
        if self.get_publication(publication_id)?.is_none() {
            return Err(RepoError::not_found("publication", publication_id));
        }

        let id = Uuid::new_v4();
        let selector_text = selector
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| RepoError::InvalidData(format!("cannot encode selector: {err}")))?;
        self.conn.execute(
            "INSERT INTO read_activities (id, reader_id, publication_id, selector)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                reader_id.to_string(),
                publication_id.to_string(),
                selector_text
            ],
        )?;

        self.conn
            .query_row(
                "SELECT id, reader_id, publication_id, selector, created_at
                 FROM read_activities WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_read_activity_row(row)),
            )?
    }

    fn latest_read_activity(
        &self,
        publication_id: PublicationId,
    ) -> RepoResult<Option<ReadActivity>> {
        // rowid breaks ties between activities recorded in the same millisecond.
        self.conn
            .query_row(
                "SELECT id, reader_id, publication_id, selector, created_at
                 FROM read_activities
                 WHERE publication_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1;",
                [publication_id.to_string()],
                |row| Ok(parse_read_activity_row(row)),
            )
            .optional()?
            .transpose()
    }
}

fn load_active_publication(conn: &Connection, id: &str) -> RepoResult<Option<Publication>> {
    let sql = format!("{PUBLICATION_SELECT_SQL} WHERE p.id = ?1 AND p.deleted_at IS NULL;");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(hydrate_publication(conn, row)?)),
        None => Ok(None),
    }
}

/// Builds one publication from a `PUBLICATION_SELECT_SQL` row plus its
/// attributions and tags.
fn hydrate_publication(conn: &Connection, row: &Row<'_>) -> RepoResult<Publication> {
    let id_text: String = row.get("id")?;
    let reader_text: String = row.get("reader_id")?;
    let languages: String = row.get("languages")?;
    let keywords: String = row.get("keywords")?;

    Ok(Publication {
        id: parse_uuid(&id_text, "publications.id")?,
        reader_id: parse_uuid(&reader_text, "publications.reader_id")?,
        name: row.get("name")?,
        kind: row.get("type")?,
        summary: row.get("abstract")?,
        description: row.get("description")?,
        date_published: row.get("date_published")?,
        languages: parse_string_array(&languages, "publications.languages")?,
        keywords: parse_string_array(&keywords, "publications.keywords")?,
        attributions: load_attributions(conn, &id_text)?,
        tags: load_publication_tags(conn, &id_text)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_attributions(conn: &Connection, publication_id: &str) -> RepoResult<Vec<Attribution>> {
    let mut stmt = conn.prepare(
        "SELECT id, role, name, normalized_name
         FROM attributions
         WHERE publication_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([publication_id])?;
    let mut attributions = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get("id")?;
        let role_text: String = row.get("role")?;
        let role = AttributionRole::parse(&role_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid attribution role `{role_text}` in attributions.role"
            ))
        })?;
        attributions.push(Attribution {
            id: parse_uuid(&id, "attributions.id")?,
            role,
            name: row.get("name")?,
            normalized_name: row.get("normalized_name")?,
        });
    }
    Ok(attributions)
}

fn parse_read_activity_row(row: &Row<'_>) -> RepoResult<ReadActivity> {
    let id: String = row.get("id")?;
    let reader_id: String = row.get("reader_id")?;
    let publication_id: String = row.get("publication_id")?;
    let selector = row
        .get::<_, Option<String>>("selector")?
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|err| {
            RepoError::InvalidData(format!("invalid JSON in read_activities.selector: {err}"))
        })?;

    Ok(ReadActivity {
        id: parse_uuid(&id, "read_activities.id")?,
        reader_id: parse_uuid(&reader_id, "read_activities.reader_id")?,
        publication_id: parse_uuid(&publication_id, "read_activities.publication_id")?,
        selector,
        created_at: row.get("created_at")?,
    })
}
