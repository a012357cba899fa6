//! Publication (library item) and attribution model.
//!
//! # Responsibility
//! - Define the library item shape returned by listings.
//! - Own name/type normalization used by both writes and filters.
//!
//! # Invariants
//! - `normalize_name` is idempotent: applying it twice yields the same value.
//! - Keywords are stored lowercase; filters compare lowercase values.
//! - `deleted_at`, once set, excludes the publication from all listings.

use crate::model::reader::ReaderId;
use crate::model::tag::Tag;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable publication identifier.
pub type PublicationId = Uuid;

/// Credited role of an attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionRole {
    Author,
    Editor,
    Contributor,
    Creator,
    Illustrator,
    Publisher,
    Translator,
}

impl AttributionRole {
    pub const ALL: [AttributionRole; 7] = [
        Self::Author,
        Self::Editor,
        Self::Contributor,
        Self::Creator,
        Self::Illustrator,
        Self::Publisher,
        Self::Translator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Editor => "editor",
            Self::Contributor => "contributor",
            Self::Creator => "creator",
            Self::Illustrator => "illustrator",
            Self::Publisher => "publisher",
            Self::Translator => "translator",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

/// Credited contributor of one publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub id: Uuid,
    pub role: AttributionRole,
    /// Name as provided by the reader.
    pub name: String,
    /// Matching key, see [`normalize_name`].
    pub normalized_name: String,
}

/// Write model for one attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttribution {
    pub role: AttributionRole,
    pub name: String,
}

impl NewAttribution {
    pub fn new(role: AttributionRole, name: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
        }
    }
}

/// Library item read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: PublicationId,
    pub reader_id: ReaderId,
    pub name: String,
    /// PascalCase type such as `Book` or `Article`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Epoch milliseconds.
    pub date_published: Option<i64>,
    pub languages: Vec<String>,
    pub keywords: Vec<String>,
    pub attributions: Vec<Attribution>,
    pub tags: Vec<Tag>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Publication {
    /// Attributions credited with `role`, in insertion order.
    pub fn attributions_with_role(&self, role: AttributionRole) -> Vec<&Attribution> {
        self.attributions
            .iter()
            .filter(|attribution| attribution.role == role)
            .collect()
    }
}

/// Write model for publication creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPublication {
    pub name: String,
    pub kind: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub date_published: Option<i64>,
    pub languages: Vec<String>,
    pub keywords: Vec<String>,
    pub attributions: Vec<NewAttribution>,
}

impl NewPublication {
    /// Creates a `Book` with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "Book".to_string(),
            summary: None,
            description: None,
            date_published: None,
            languages: Vec::new(),
            keywords: Vec::new(),
            attributions: Vec::new(),
        }
    }

    pub fn with_attribution(mut self, role: AttributionRole, name: impl Into<String>) -> Self {
        self.attributions.push(NewAttribution::new(role, name));
        self
    }
}

/// One reading position recorded for a publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadActivity {
    pub id: Uuid,
    pub reader_id: ReaderId,
    pub publication_id: PublicationId,
    pub selector: Option<serde_json::Value>,
    pub created_at: i64,
}

/// Normalizes a contributor name into its matching key.
///
/// Lowercases and drops everything that is not alphanumeric, so
/// `"jo H. n'dOe"`, `"John  Doe"` and `"johndoe"` share one key.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Capitalizes the first character and lowercases the rest (`book` -> `Book`).
pub fn normalize_publication_type(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Lowercases, trims and deduplicates keywords, keeping first-seen order.
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let value = keyword.trim().to_lowercase();
        if !value.is_empty() && !normalized.contains(&value) {
            normalized.push(value);
        }
    }
    normalized
}
