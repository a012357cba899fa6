//! Notes use-case service for notes outside outlines.
//!
//! # Invariants
//! - A note carries at least one body and every body has a motivation.
//! - Outline links are rejected here; outlines own them.
//! - A `document` filter returns one unpaginated page.

use crate::config::ListingConfig;
use crate::model::note::{NewNote, Note, NoteBody, NoteId, NoteUpdate};
use crate::model::reader::Reader;
use crate::model::tag::TagId;
use crate::query::{ListPage, NoteQuery, QueryParams};
use crate::repo::note_repo::NoteRepository;
use crate::repo::reader_repo::ReaderRepository;
use crate::repo::tag_repo::TagRepository;
use crate::service::tag_service::owned_tag;
use crate::service::{ensure_owner, resolve_reader, ServiceError, ServiceResult};
use log::info;
use std::time::Instant;

pub struct NotesService<R, N, T>
where
    R: ReaderRepository,
    N: NoteRepository,
    T: TagRepository,
{
    readers: R,
    notes: N,
    tags: T,
    listing: ListingConfig,
}

impl<R, N, T> NotesService<R, N, T>
where
    R: ReaderRepository,
    N: NoteRepository,
    T: TagRepository,
{
    pub fn new(readers: R, notes: N, tags: T, listing: ListingConfig) -> Self {
        Self {
            readers,
            notes,
            tags,
            listing,
        }
    }

    pub fn list_notes(&self, auth_id: &str, params: &QueryParams) -> ServiceResult<ListPage<Note>> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        let started_at = Instant::now();
        let query = NoteQuery::from_params(params, &self.listing);
        let total_items = self.notes.count_notes(reader.id, &query.filters)?;
        let items = self.notes.list_notes(reader.id, &query)?;
        info!(
            "event=notes_list module=service status=ok reader_id={} filters={} total={} returned={} duration_ms={}",
            reader.id,
            query.filters.len(),
            total_items,
            items.len(),
            started_at.elapsed().as_millis()
        );

        Ok(ListPage {
            items,
            total_items,
            page: query.pagination.page,
            page_size: query.pagination.limit,
        })
    }

    pub fn create_note(&self, auth_id: &str, note: &NewNote) -> ServiceResult<Note> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        if note.previous.is_some() || note.next.is_some() || note.parent_id.is_some() {
            return Err(ServiceError::InvalidInput(
                "outline links are only accepted inside an outline".to_string(),
            ));
        }
        validate_bodies(&note.bodies)?;
        let created = self.notes.create_note(reader.id, note)?;
        info!(
            "event=note_create module=service status=ok reader_id={} note_id={} bodies={}",
            reader.id,
            created.id,
            created.bodies.len()
        );
        Ok(created)
    }

    pub fn get_note(&self, auth_id: &str, note_id: NoteId) -> ServiceResult<Note> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_note(&reader, note_id)
    }

    /// Replaces a note's bodies and, when `tag_ids` is set, its tag set.
    pub fn update_note(
        &self,
        auth_id: &str,
        note_id: NoteId,
        update: &NoteUpdate,
    ) -> ServiceResult<Note> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_note(&reader, note_id)?;
        validate_bodies(&update.bodies)?;
        for tag_id in update.tag_ids.iter().flatten() {
            owned_tag(&self.tags, &reader, *tag_id)?;
        }
        let updated = self.notes.update_note(note_id, update)?;
        info!(
            "event=note_update module=service status=ok reader_id={} note_id={} bodies={} tags={}",
            reader.id,
            updated.id,
            updated.bodies.len(),
            updated.tags.len()
        );
        Ok(updated)
    }

    pub fn delete_note(&self, auth_id: &str, note_id: NoteId) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_note(&reader, note_id)?;
        Ok(self.notes.delete_note(note_id)?)
    }

    pub fn tag_note(&self, auth_id: &str, tag_id: TagId, note_id: NoteId) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_note(&reader, note_id)?;
        owned_tag(&self.tags, &reader, tag_id)?;
        Ok(self.tags.assign_to_note(tag_id, note_id)?)
    }

    pub fn untag_note(&self, auth_id: &str, tag_id: TagId, note_id: NoteId) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_note(&reader, note_id)?;
        owned_tag(&self.tags, &reader, tag_id)?;
        Ok(self.tags.unassign_from_note(tag_id, note_id)?)
    }

    fn owned_note(&self, reader: &Reader, note_id: NoteId) -> ServiceResult<Note> {
        let note = self.notes.get_note(note_id)?.ok_or(ServiceError::NotFound {
            entity: "note",
            id: note_id,
        })?;
        ensure_owner(reader, note.reader_id, "note", note_id)?;
        Ok(note)
    }
}

/// Rejects empty body lists and bodies without a motivation.
pub(crate) fn validate_bodies(bodies: &[NoteBody]) -> ServiceResult<()> {
    if bodies.is_empty() {
        return Err(ServiceError::InvalidInput(
            "note must have at least one body".to_string(),
        ));
    }
    if bodies.iter().any(|body| body.motivation.trim().is_empty()) {
        return Err(ServiceError::InvalidInput(
            "note body motivation must not be blank".to_string(),
        ));
    }
    Ok(())
}
