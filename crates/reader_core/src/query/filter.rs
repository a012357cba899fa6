//! Typed listing queries and their coercion from raw parameters.
//!
//! # Invariants
//! - Blank or unparseable values never produce a filter.
//! - Unknown sort keys fall back to `updated`.
//! - `limit` and `page` fall back to defaults when non-positive.

use crate::config::ListingConfig;
use crate::model::publication::{normalize_name, normalize_publication_type, AttributionRole};
use crate::query::params::QueryParams;
use chrono::{DateTime, NaiveDate};

/// One library (publication) filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryFilter {
    /// Case-insensitive substring of the name, stored lowercased.
    Title(String),
    /// Exact PascalCase type.
    Kind(String),
    Language(String),
    /// Lowercased keyword.
    Keyword(String),
    /// Normalized author name, exact match.
    Author(String),
    /// Normalized contributor name substring, optionally limited to one role.
    ///
    /// `role` carries the raw lowercased value when it is not a known role,
    /// so the filter matches nothing.
    Attribution { name: String, role: Option<String> },
    /// Stack tag name, exact.
    Collection(String),
    /// Tag id as text; a value that is not an id matches nothing.
    Tag(String),
    /// Lowercased, de-duplicated flag names, OR-ed.
    Flags(Vec<String>),
    /// Lowercased search term.
    Search(String),
}

/// One notes listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteFilter {
    /// Owning publication id as text.
    Publication(String),
    /// Exact document url/path.
    Document(String),
    Motivation(String),
    /// Lowercased body content substring.
    Search(String),
    /// Inclusive lower bound on `created_at`, epoch ms.
    PublishedStart(i64),
    /// Inclusive upper bound on `created_at`, epoch ms.
    PublishedEnd(i64),
    Collection(String),
    Tag(String),
    Flags(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LibrarySortKey {
    Title,
    DatePublished,
    Created,
    #[default]
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryOrder {
    pub key: LibrarySortKey,
    pub reverse: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteSortKey {
    Created,
    #[default]
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteOrder {
    pub key: NoteSortKey,
    pub reverse: bool,
}

/// 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    fn from_params(params: &QueryParams, default_limit: u32) -> Self {
        Self::new(
            params.positive_u32("page").unwrap_or(1),
            params.positive_u32("limit").unwrap_or(default_limit),
        )
    }
}

/// Fully coerced library listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryQuery {
    pub filters: Vec<LibraryFilter>,
    pub order: LibraryOrder,
    pub pagination: Pagination,
}

impl LibraryQuery {
    pub fn from_params(params: &QueryParams, config: &ListingConfig) -> Self {
        let mut filters = Vec::new();

        if let Some(title) = params.first("title") {
            filters.push(LibraryFilter::Title(title.to_lowercase()));
        }
        if let Some(kind) = params.first("type") {
            filters.push(LibraryFilter::Kind(normalize_publication_type(kind)));
        }
        if let Some(language) = params.first("language") {
            filters.push(LibraryFilter::Language(language.to_string()));
        }
        if let Some(keyword) = params.first("keyword") {
            filters.push(LibraryFilter::Keyword(keyword.to_lowercase()));
        }
        if let Some(author) = params.first("author") {
            filters.push(LibraryFilter::Author(normalize_name(author)));
        }
        if let Some(attribution) = params.first("attribution") {
            let role = params.first("role").map(|raw| {
                AttributionRole::parse(raw)
                    .map(|role| role.as_str().to_string())
                    .unwrap_or_else(|| raw.to_lowercase())
            });
            filters.push(LibraryFilter::Attribution {
                name: normalize_name(attribution),
                role,
            });
        }
        if let Some(collection) = params.first_of(&["collection", "stack"]) {
            filters.push(LibraryFilter::Collection(collection.to_string()));
        }
        if let Some(tag) = params.first("tag") {
            filters.push(LibraryFilter::Tag(tag.to_string()));
        }
        if let Some(flags) = flag_values(params) {
            filters.push(LibraryFilter::Flags(flags));
        }
        if let Some(search) = params.first("search") {
            filters.push(LibraryFilter::Search(search.to_lowercase()));
        }

        let key = match params.first("orderBy") {
            Some("title") => LibrarySortKey::Title,
            Some("datePublished") => LibrarySortKey::DatePublished,
            Some("created") => LibrarySortKey::Created,
            _ => LibrarySortKey::Updated,
        };

        Self {
            filters,
            order: LibraryOrder {
                key,
                reverse: params.flag("reverse"),
            },
            pagination: Pagination::from_params(params, config.default_limit),
        }
    }
}

/// Fully coerced notes listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteQuery {
    pub filters: Vec<NoteFilter>,
    pub order: NoteOrder,
    pub pagination: Pagination,
}

impl NoteQuery {
    /// A `document` filter replaces pagination with one page of
    /// `config.document_limit` rows.
    pub fn from_params(params: &QueryParams, config: &ListingConfig) -> Self {
        let mut filters = Vec::new();

        if let Some(publication) = params.first_of(&["publication", "source"]) {
            filters.push(NoteFilter::Publication(publication.to_string()));
        }
        let document = params.first("document");
        if let Some(document) = document {
            filters.push(NoteFilter::Document(document.to_string()));
        }
        if let Some(motivation) = params.first("motivation") {
            filters.push(NoteFilter::Motivation(motivation.to_string()));
        }
        if let Some(search) = params.first("search") {
            filters.push(NoteFilter::Search(search.to_lowercase()));
        }
        if let Some(start) = params
            .first("publishedStart")
            .and_then(|value| parse_time_bound(value, Bound::Start))
        {
            filters.push(NoteFilter::PublishedStart(start));
        }
        if let Some(end) = params
            .first("publishedEnd")
            .and_then(|value| parse_time_bound(value, Bound::End))
        {
            filters.push(NoteFilter::PublishedEnd(end));
        }
        if let Some(collection) = params.first_of(&["collection", "stack"]) {
            filters.push(NoteFilter::Collection(collection.to_string()));
        }
        if let Some(tag) = params.first("tag") {
            filters.push(NoteFilter::Tag(tag.to_string()));
        }
        if let Some(flags) = flag_values(params) {
            filters.push(NoteFilter::Flags(flags));
        }

        let key = match params.first("orderBy") {
            Some("created") => NoteSortKey::Created,
            _ => NoteSortKey::Updated,
        };

        let pagination = if document.is_some() {
            Pagination::new(1, config.document_limit)
        } else {
            Pagination::from_params(params, config.default_limit)
        };

        Self {
            filters,
            order: NoteOrder {
                key,
                reverse: params.flag("reverse"),
            },
            pagination,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date into epoch ms.
///
/// A bare date covers the whole UTC day: start bounds take its first
/// millisecond, end bounds its last.
fn parse_time_bound(value: &str, bound: Bound) -> Option<i64> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.timestamp_millis());
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let day = match bound {
        Bound::Start => date,
        Bound::End => date.succ_opt()?,
    };
    let millis = day.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis();
    match bound {
        Bound::Start => Some(millis),
        Bound::End => Some(millis - 1),
    }
}

fn flag_values(params: &QueryParams) -> Option<Vec<String>> {
    let mut flags: Vec<String> = Vec::new();
    for value in params.all("flag") {
        let flag = value.to_lowercase();
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    }
    if flags.is_empty() {
        None
    } else {
        Some(flags)
    }
}
