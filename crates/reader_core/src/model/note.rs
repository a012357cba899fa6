//! Note, note body and note context (outline) model.
//!
//! # Invariants
//! - Within one context, `previous`/`next` of active notes describe disjoint
//!   lists; siblings sharing `parent_id` form one list with a single head.
//! - A note outside any context has no outline links.

use crate::model::publication::PublicationId;
use crate::model::reader::ReaderId;
use crate::model::tag::{Tag, TagId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable note identifier.
pub type NoteId = Uuid;

/// Stable note context identifier.
pub type ContextId = Uuid;

/// One body of a note (a highlight, a comment, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBody {
    pub content: Option<String>,
    /// Annotation motivation, e.g. `highlighting` or `commenting`.
    pub motivation: String,
    pub language: Option<String>,
}

impl NoteBody {
    pub fn new(motivation: impl Into<String>, content: Option<&str>) -> Self {
        Self {
            content: content.map(str::to_string),
            motivation: motivation.into(),
            language: None,
        }
    }
}

/// Note read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub reader_id: ReaderId,
    pub publication_id: Option<PublicationId>,
    /// Document url/path inside the owning publication.
    pub document: Option<String>,
    pub context_id: Option<ContextId>,
    /// Source note when this note was copied into a context.
    pub original_id: Option<NoteId>,
    pub previous: Option<NoteId>,
    pub next: Option<NoteId>,
    pub parent_id: Option<NoteId>,
    pub bodies: Vec<NoteBody>,
    pub tags: Vec<Tag>,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub updated_at: i64,
}

/// Write model for note creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub publication_id: Option<PublicationId>,
    pub document: Option<String>,
    pub bodies: Vec<NoteBody>,
    /// Outline-only: sibling this note follows.
    pub previous: Option<NoteId>,
    /// Outline-only: sibling this note precedes.
    pub next: Option<NoteId>,
    /// Outline-only: containing note.
    pub parent_id: Option<NoteId>,
}

impl NewNote {
    /// Creates a note with one body.
    pub fn with_body(motivation: impl Into<String>, content: &str) -> Self {
        Self {
            bodies: vec![NoteBody::new(motivation, Some(content))],
            ..Self::default()
        }
    }
}

/// Replacement content for an existing note.
///
/// `tag_ids: None` keeps the current tags; `Some` replaces the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteUpdate {
    pub bodies: Vec<NoteBody>,
    pub tag_ids: Option<Vec<TagId>>,
}

/// Named grouping of ordered, nested notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteContext {
    pub id: ContextId,
    pub reader_id: ReaderId,
    /// Context kind, `outline` for outlines.
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
