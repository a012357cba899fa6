//! Outline use-case service.
//!
//! # Responsibility
//! - Create outlines and place notes in them.
//! - Rebuild an outline's tree from its stored links on read.
//!
//! # Invariants
//! - A corrupted outline surfaces as `ServiceError::Outline`; no partial
//!   tree is returned.

use crate::model::note::{ContextId, NewNote, Note, NoteContext, NoteId};
use crate::model::reader::Reader;
use crate::outline::{build_outline, OutlineNode};
use crate::repo::note_repo::NoteRepository;
use crate::repo::outline_repo::OutlineRepository;
use crate::repo::reader_repo::ReaderRepository;
use crate::service::notes_service::validate_bodies;
use crate::service::{ensure_owner, resolve_reader, ServiceError, ServiceResult};
use log::{error, info};
use serde::Serialize;

/// Outline metadata with its nested notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outline {
    #[serde(flatten)]
    pub context: NoteContext,
    pub notes: Vec<OutlineNode<Note>>,
}

pub struct OutlineService<R, O, N>
where
    R: ReaderRepository,
    O: OutlineRepository,
    N: NoteRepository,
{
    readers: R,
    outlines: O,
    notes: N,
}

impl<R, O, N> OutlineService<R, O, N>
where
    R: ReaderRepository,
    O: OutlineRepository,
    N: NoteRepository,
{
    pub fn new(readers: R, outlines: O, notes: N) -> Self {
        Self {
            readers,
            outlines,
            notes,
        }
    }

    pub fn create_outline(
        &self,
        auth_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> ServiceResult<NoteContext> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "outline name must not be blank".to_string(),
            ));
        }
        Ok(self.outlines.create_context(reader.id, Some(name), description)?)
    }

    /// Loads an outline and rebuilds its tree.
    pub fn get_outline(&self, auth_id: &str, context_id: ContextId) -> ServiceResult<Outline> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        let context = self.owned_context(&reader, context_id)?;
        let notes = self.outlines.list_context_notes(context_id)?;
        let count = notes.len();

        match build_outline(notes) {
            Ok(forest) => {
                info!(
                    "event=outline_build module=service status=ok context_id={} notes={} roots={}",
                    context_id,
                    count,
                    forest.len()
                );
                Ok(Outline {
                    context,
                    notes: forest,
                })
            }
            Err(err) => {
                error!(
                    "event=outline_build module=service status=error context_id={} notes={} error={}",
                    context_id, count, err
                );
                Err(err.into())
            }
        }
    }

    pub fn delete_outline(&self, auth_id: &str, context_id: ContextId) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_context(&reader, context_id)?;
        Ok(self.outlines.delete_context(context_id)?)
    }

    /// Adds a new note at the position given by its outline links.
    pub fn add_note(
        &self,
        auth_id: &str,
        context_id: ContextId,
        note: &NewNote,
    ) -> ServiceResult<Note> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_context(&reader, context_id)?;
        validate_bodies(&note.bodies)?;
        Ok(self.outlines.add_note(reader.id, context_id, note)?)
    }

    /// Copies an existing note to the end of the outline's root list.
    pub fn copy_note(
        &self,
        auth_id: &str,
        context_id: ContextId,
        source_id: NoteId,
    ) -> ServiceResult<Note> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_context(&reader, context_id)?;
        let source = self.notes.get_note(source_id)?.ok_or(ServiceError::NotFound {
            entity: "note",
            id: source_id,
        })?;
        ensure_owner(&reader, source.reader_id, "note", source_id)?;
        Ok(self.outlines.copy_note(reader.id, context_id, source_id)?)
    }

    pub fn remove_note(
        &self,
        auth_id: &str,
        context_id: ContextId,
        note_id: NoteId,
    ) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_context(&reader, context_id)?;
        Ok(self.outlines.remove_note(context_id, note_id)?)
    }

    fn owned_context(&self, reader: &Reader, context_id: ContextId) -> ServiceResult<NoteContext> {
        let context = self
            .outlines
            .get_context(context_id)?
            .ok_or(ServiceError::NotFound {
                entity: "outline",
                id: context_id,
            })?;
        ensure_owner(reader, context.reader_id, "outline", context_id)?;
        Ok(context)
    }
}
