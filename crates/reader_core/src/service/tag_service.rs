//! Tag use-case service.
//!
//! # Invariants
//! - Tag names must not be blank; flag names are lowercased.
//! - Tag changes touch the library cache because library listings embed
//!   the reader's tags.

use crate::cache::LibraryCache;
use crate::model::reader::Reader;
use crate::model::tag::{normalize_tag_name, Tag, TagId, TagType};
use crate::repo::reader_repo::ReaderRepository;
use crate::repo::tag_repo::TagRepository;
use crate::service::{ensure_owner, resolve_reader, ServiceError, ServiceResult};
use log::info;

pub struct TagService<R, T, C>
where
    R: ReaderRepository,
    T: TagRepository,
    C: LibraryCache,
{
    readers: R,
    tags: T,
    cache: C,
}

impl<R, T, C> TagService<R, T, C>
where
    R: ReaderRepository,
    T: TagRepository,
    C: LibraryCache,
{
    pub fn new(readers: R, tags: T, cache: C) -> Self {
        Self {
            readers,
            tags,
            cache,
        }
    }

    pub fn create_tag(&self, auth_id: &str, kind: TagType, name: &str) -> ServiceResult<Tag> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        let name = normalize_tag_name(kind, name)
            .ok_or_else(|| ServiceError::InvalidInput("tag name must not be blank".to_string()))?;
        let tag = self.tags.create_tag(reader.id, kind, &name)?;
        self.cache.touch(reader.id);
        info!(
            "event=tag_create module=service status=ok reader_id={} tag_id={} type={}",
            reader.id,
            tag.id,
            kind.as_str()
        );
        Ok(tag)
    }

    pub fn list_tags(&self, auth_id: &str) -> ServiceResult<Vec<Tag>> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        Ok(self.tags.list_tags(reader.id)?)
    }

    /// Deletes a tag and detaches it from every publication and note.
    pub fn delete_tag(&self, auth_id: &str, tag_id: TagId) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        owned_tag(&self.tags, &reader, tag_id)?;
        self.tags.delete_tag(tag_id)?;
        self.cache.touch(reader.id);
        info!(
            "event=tag_delete module=service status=ok reader_id={} tag_id={}",
            reader.id, tag_id
        );
        Ok(())
    }
}

/// Loads an active tag and checks it belongs to `reader`.
pub(crate) fn owned_tag<T: TagRepository>(
    tags: &T,
    reader: &Reader,
    tag_id: TagId,
) -> ServiceResult<Tag> {
    let tag = tags.get_tag(tag_id)?.ok_or(ServiceError::NotFound {
        entity: "tag",
        id: tag_id,
    })?;
    ensure_owner(reader, tag.reader_id, "tag", tag_id)?;
    Ok(tag)
}
