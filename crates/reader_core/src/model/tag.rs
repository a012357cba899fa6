//! Tag model shared by publications and notes.
//!
//! # Invariants
//! - Flag names are stored lowercase so flag filters are case-insensitive.
//! - A deleted tag keeps its row (tombstone) but loses every association.

use crate::model::reader::ReaderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable tag identifier.
pub type TagId = Uuid;

/// Tag category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    /// Reader-defined collection (`reader:Stack` in activity payloads).
    Stack,
    /// Marker on notes (`important`, `urgent`, ...).
    Flag,
    Colour,
    Mode,
}

impl TagType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::Flag => "flag",
            Self::Colour => "colour",
            Self::Mode => "mode",
        }
    }

    /// Parses a stored or user-provided tag type.
    ///
    /// Accepts the `reader:Stack` alias used by older clients.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "stack" | "reader:Stack" => Some(Self::Stack),
            "flag" => Some(Self::Flag),
            "colour" => Some(Self::Colour),
            "mode" => Some(Self::Mode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub reader_id: ReaderId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TagType,
}

/// Flags seeded for every new reader.
pub const DEFAULT_FLAGS: &[&str] = &[
    "important",
    "question",
    "revisit",
    "to do",
    "idea",
    "important term",
    "further reading",
    "urgent",
    "reference",
];

/// Colour tags seeded for every new reader.
pub const DEFAULT_COLOURS: &[&str] = &["colour 1", "colour 2", "colour 3", "colour 4"];

/// Normalizes a tag name for storage.
///
/// Returns `None` for blank names. Flag names are lowercased.
pub fn normalize_tag_name(kind: TagType, name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    match kind {
        TagType::Flag => Some(trimmed.to_lowercase()),
        _ => Some(trimmed.to_string()),
    }
}
