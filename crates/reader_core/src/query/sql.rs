//! SQL compilation of listing queries.
//!
//! Library statements alias `publications` as `p`, notes statements alias
//! `notes` as `n`. Tag and attribution filters are `EXISTS` semi-joins so a
//! row matching several tags is still returned once.

use crate::model::reader::ReaderId;
use crate::query::filter::{
    LibraryFilter, LibraryOrder, LibrarySortKey, NoteFilter, NoteOrder, NoteSortKey,
};
use rusqlite::types::Value;

/// AND-ed SQL clauses with their positional bind values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<String>,
    binds: Vec<Value>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one clause; `binds` must match its `?` placeholders in order.
    pub fn push(&mut self, clause: impl Into<String>, binds: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.into());
        self.binds.extend(binds);
    }

    /// Adds one clause without bind values.
    pub fn push_clause(&mut self, clause: impl Into<String>) {
        self.clauses.push(clause.into());
    }

    /// `WHERE ...` fragment, empty when there is no clause.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }
}

/// Ownership, soft-delete and every active library filter.
pub fn library_predicate(reader_id: ReaderId, filters: &[LibraryFilter]) -> Predicate {
    let mut predicate = Predicate::new();
    predicate.push("p.reader_id = ?", [text(reader_id.to_string())]);
    predicate.push_clause("p.deleted_at IS NULL");

    for filter in filters {
        match filter {
            LibraryFilter::Title(title) => {
                predicate.push("unicode_lower(p.name) LIKE ? ESCAPE '\\'", [text(like_pattern(title))]);
            }
            LibraryFilter::Kind(kind) => predicate.push("p.type = ?", [text(kind)]),
            LibraryFilter::Language(language) => predicate.push(
                "EXISTS (SELECT 1 FROM json_each(p.languages) WHERE json_each.value = ?)",
                [text(language)],
            ),
            LibraryFilter::Keyword(keyword) => predicate.push(
                "EXISTS (SELECT 1 FROM json_each(p.keywords) WHERE json_each.value = ?)",
                [text(keyword)],
            ),
            LibraryFilter::Author(name) => predicate.push(
                "EXISTS (
                    SELECT 1 FROM attributions a
                    WHERE a.publication_id = p.id
                      AND a.role = 'author'
                      AND a.normalized_name = ?
                )",
                [text(name)],
            ),
            LibraryFilter::Attribution { name, role } => {
                let mut clause = String::from(
                    "EXISTS (
                    SELECT 1 FROM attributions a
                    WHERE a.publication_id = p.id
                      AND a.normalized_name LIKE ? ESCAPE '\\'",
                );
                let mut binds = vec![text(like_pattern(name))];
                if let Some(role) = role {
                    clause.push_str(" AND a.role = ?");
                    binds.push(text(role));
                }
                clause.push(')');
                predicate.push(clause, binds);
            }
            LibraryFilter::Collection(name) => predicate.push(
                publication_tag_exists("t.type = 'stack' AND t.name = ?"),
                [text(name)],
            ),
            LibraryFilter::Tag(id) => {
                predicate.push(publication_tag_exists("t.id = ?"), [text(id)]);
            }
            LibraryFilter::Flags(names) => predicate.push(
                publication_tag_exists(&format!(
                    "t.type = 'flag' AND t.name IN ({})",
                    placeholders(names.len())
                )),
                names.iter().map(text),
            ),
            LibraryFilter::Search(term) => {
                let pattern = like_pattern(term);
                predicate.push(
                    "(unicode_lower(p.name) LIKE ? ESCAPE '\\'
                      OR unicode_lower(coalesce(p.abstract, '')) LIKE ? ESCAPE '\\'
                      OR unicode_lower(coalesce(p.description, '')) LIKE ? ESCAPE '\\'
                      OR EXISTS (SELECT 1 FROM json_each(p.keywords) WHERE json_each.value = ?))",
                    [
                        text(&pattern),
                        text(&pattern),
                        text(&pattern),
                        text(term),
                    ],
                );
            }
        }
    }

    predicate
}

/// Ownership, soft-delete, context exclusion and every active note filter.
pub fn note_predicate(reader_id: ReaderId, filters: &[NoteFilter]) -> Predicate {
    let mut predicate = Predicate::new();
    predicate.push("n.reader_id = ?", [text(reader_id.to_string())]);
    predicate.push_clause("n.deleted_at IS NULL");
    predicate.push_clause("n.context_id IS NULL");

    for filter in filters {
        match filter {
            NoteFilter::Publication(id) => predicate.push("n.publication_id = ?", [text(id)]),
            NoteFilter::Document(document) => {
                predicate.push("n.document = ?", [text(document)]);
            }
            NoteFilter::Motivation(motivation) => predicate.push(
                "EXISTS (SELECT 1 FROM note_bodies b WHERE b.note_id = n.id AND b.motivation = ?)",
                [text(motivation)],
            ),
            NoteFilter::Search(term) => predicate.push(
                "EXISTS (
                    SELECT 1 FROM note_bodies b
                    WHERE b.note_id = n.id
                      AND unicode_lower(coalesce(b.content, '')) LIKE ? ESCAPE '\\'
                )",
                [text(like_pattern(term))],
            ),
            NoteFilter::PublishedStart(start) => {
                predicate.push("n.created_at >= ?", [Value::Integer(*start)]);
            }
            NoteFilter::PublishedEnd(end) => {
                predicate.push("n.created_at <= ?", [Value::Integer(*end)]);
            }
            NoteFilter::Collection(name) => predicate.push(
                note_tag_exists("t.type = 'stack' AND t.name = ?"),
                [text(name)],
            ),
            NoteFilter::Tag(id) => predicate.push(note_tag_exists("t.id = ?"), [text(id)]),
            NoteFilter::Flags(names) => predicate.push(
                note_tag_exists(&format!(
                    "t.type = 'flag' AND t.name IN ({})",
                    placeholders(names.len())
                )),
                names.iter().map(text),
            ),
        }
    }

    predicate
}

impl LibraryOrder {
    /// `ORDER BY` fragment over alias `p`.
    pub fn order_sql(&self) -> &'static str {
        match (self.key, self.reverse) {
            (LibrarySortKey::Title, false) => " ORDER BY p.name COLLATE NOCASE ASC, p.id ASC",
            (LibrarySortKey::Title, true) => " ORDER BY p.name COLLATE NOCASE DESC, p.id ASC",
            (LibrarySortKey::DatePublished, false) => {
                " ORDER BY p.date_published DESC NULLS LAST, p.id ASC"
            }
            (LibrarySortKey::DatePublished, true) => {
                " ORDER BY p.date_published ASC NULLS FIRST, p.id ASC"
            }
            (LibrarySortKey::Created, false) => " ORDER BY p.created_at DESC, p.id ASC",
            (LibrarySortKey::Created, true) => " ORDER BY p.created_at ASC, p.id ASC",
            (LibrarySortKey::Updated, false) => " ORDER BY p.updated_at DESC, p.id ASC",
            (LibrarySortKey::Updated, true) => " ORDER BY p.updated_at ASC, p.id ASC",
        }
    }
}

impl NoteOrder {
    /// `ORDER BY` fragment over alias `n`.
    pub fn order_sql(&self) -> &'static str {
        match (self.key, self.reverse) {
            (NoteSortKey::Created, false) => " ORDER BY n.created_at DESC, n.id ASC",
            (NoteSortKey::Created, true) => " ORDER BY n.created_at ASC, n.id ASC",
            (NoteSortKey::Updated, false) => " ORDER BY n.updated_at DESC, n.id ASC",
            (NoteSortKey::Updated, true) => " ORDER BY n.updated_at ASC, n.id ASC",
        }
    }
}

fn publication_tag_exists(condition: &str) -> String {
    format!(
        "EXISTS (
            SELECT 1 FROM publication_tags pt
            INNER JOIN tags t ON t.id = pt.tag_id
            WHERE pt.publication_id = p.id
              AND t.deleted_at IS NULL
              AND {condition}
        )"
    )
}

fn note_tag_exists(condition: &str) -> String {
    format!(
        "EXISTS (
            SELECT 1 FROM note_tags nt
            INNER JOIN tags t ON t.id = nt.tag_id
            WHERE nt.note_id = n.id
              AND t.deleted_at IS NULL
              AND {condition}
        )"
    )
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// `%value%` with LIKE wildcards in `value` escaped by `\`.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn text(value: impl AsRef<str>) -> Value {
    Value::Text(value.as_ref().to_string())
}

#[cfg(test)]
mod tests {
    use super::{library_predicate, like_pattern, note_predicate};
    use crate::query::filter::{LibraryFilter, NoteFilter};
    use rusqlite::types::Value;
    use uuid::Uuid;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn base_predicate_scopes_to_reader_and_active_rows() {
        let reader = Uuid::new_v4();
        let predicate = library_predicate(reader, &[]);
        assert_eq!(predicate.clause_count(), 2);
        assert_eq!(predicate.binds(), &[Value::Text(reader.to_string())]);
        assert!(predicate.where_sql().contains("p.deleted_at IS NULL"));
    }

    #[test]
    fn binds_follow_placeholder_order() {
        let predicate = library_predicate(
            Uuid::new_v4(),
            &[
                LibraryFilter::Flags(vec!["a".to_string(), "b".to_string()]),
                LibraryFilter::Search("x".to_string()),
            ],
        );
        let sql = predicate.where_sql();
        assert_eq!(sql.matches('?').count(), predicate.binds().len());
        assert_eq!(predicate.binds().len(), 1 + 2 + 4);
    }

    #[test]
    fn note_predicate_excludes_context_notes() {
        let predicate = note_predicate(Uuid::new_v4(), &[NoteFilter::PublishedEnd(5)]);
        let sql = predicate.where_sql();
        assert!(sql.contains("n.context_id IS NULL"));
        assert_eq!(predicate.binds().last(), Some(&Value::Integer(5)));
    }
}
