//! Library use-case service.
//!
//! # Responsibility
//! - Serve filtered, sorted, paginated library listings with the reader's
//!   tags.
//! - Own publication lifecycle, publication tagging and read activity.
//!
//! # Invariants
//! - `totalItems` counts the filtered set, independent of page and limit.
//! - Every library mutation touches the library cache.
//! - `NotModified` is only answered from a live cache entry.

use crate::cache::LibraryCache;
use crate::config::ListingConfig;
use crate::model::publication::{NewPublication, Publication, PublicationId, ReadActivity};
use crate::model::reader::Reader;
use crate::model::tag::{Tag, TagId};
use crate::query::{LibraryQuery, ListPage, QueryParams};
use crate::repo::publication_repo::PublicationRepository;
use crate::repo::reader_repo::ReaderRepository;
use crate::repo::tag_repo::TagRepository;
use crate::service::tag_service::owned_tag;
use crate::service::{ensure_owner, resolve_reader, ServiceError, ServiceResult};
use log::info;
use serde::Serialize;
use std::time::Instant;

/// Library page plus the reader's active tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryListing {
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub page: ListPage<Publication>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryResponse {
    /// The library did not change since the caller's timestamp.
    NotModified,
    Listing(LibraryListing),
}

pub struct LibraryService<R, P, T, C>
where
    R: ReaderRepository,
    P: PublicationRepository,
    T: TagRepository,
    C: LibraryCache,
{
    readers: R,
    publications: P,
    tags: T,
    cache: C,
    listing: ListingConfig,
}

impl<R, P, T, C> LibraryService<R, P, T, C>
where
    R: ReaderRepository,
    P: PublicationRepository,
    T: TagRepository,
    C: LibraryCache,
{
    pub fn new(readers: R, publications: P, tags: T, cache: C, listing: ListingConfig) -> Self {
        Self {
            readers,
            publications,
            tags,
            cache,
            listing,
        }
    }

    /// Lists the library for `auth_id`.
    ///
    /// `if_modified_since` (epoch ms) short-circuits to `NotModified` when
    /// it is at or after the cached modification time.
    pub fn library(
        &self,
        auth_id: &str,
        params: &QueryParams,
        if_modified_since: Option<i64>,
    ) -> ServiceResult<LibraryResponse> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        if let (Some(since), Some(modified)) =
            (if_modified_since, self.cache.last_modified(reader.id))
        {
            if since >= modified {
                info!(
                    "event=library_list module=service status=not_modified reader_id={}",
                    reader.id
                );
                return Ok(LibraryResponse::NotModified);
            }
        }

        let started_at = Instant::now();
        let query = LibraryQuery::from_params(params, &self.listing);
        let total_items = self.publications.count_library(reader.id, &query.filters)?;
        let items = self.publications.list_library(reader.id, &query)?;
        let tags = self.tags.list_tags(reader.id)?;
        info!(
            "event=library_list module=service status=ok reader_id={} filters={} total={} returned={} duration_ms={}",
            reader.id,
            query.filters.len(),
            total_items,
            items.len(),
            started_at.elapsed().as_millis()
        );

        Ok(LibraryResponse::Listing(LibraryListing {
            tags,
            page: ListPage {
                items,
                total_items,
                page: query.pagination.page,
                page_size: query.pagination.limit,
            },
        }))
    }

    pub fn create_publication(
        &self,
        auth_id: &str,
        publication: &NewPublication,
    ) -> ServiceResult<Publication> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        if publication.name.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "publication name must not be blank".to_string(),
            ));
        }
        if let Some(blank) = publication
            .attributions
            .iter()
            .find(|attribution| attribution.name.trim().is_empty())
        {
            return Err(ServiceError::InvalidInput(format!(
                "{} name must not be blank",
                blank.role.as_str()
            )));
        }

        let created = self.publications.create_publication(reader.id, publication)?;
        self.cache.touch(reader.id);
        info!(
            "event=publication_create module=service status=ok reader_id={} publication_id={} attributions={}",
            reader.id,
            created.id,
            created.attributions.len()
        );
        Ok(created)
    }

    pub fn get_publication(
        &self,
        auth_id: &str,
        publication_id: PublicationId,
    ) -> ServiceResult<Publication> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_publication(&reader, publication_id)
    }

    pub fn delete_publication(
        &self,
        auth_id: &str,
        publication_id: PublicationId,
    ) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_publication(&reader, publication_id)?;
        self.publications.delete_publication(publication_id)?;
        self.cache.touch(reader.id);
        Ok(())
    }

    pub fn tag_publication(
        &self,
        auth_id: &str,
        tag_id: TagId,
        publication_id: PublicationId,
    ) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_publication(&reader, publication_id)?;
        owned_tag(&self.tags, &reader, tag_id)?;
        self.tags.assign_to_publication(tag_id, publication_id)?;
        self.cache.touch(reader.id);
        Ok(())
    }

    pub fn untag_publication(
        &self,
        auth_id: &str,
        tag_id: TagId,
        publication_id: PublicationId,
    ) -> ServiceResult<()> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_publication(&reader, publication_id)?;
        owned_tag(&self.tags, &reader, tag_id)?;
        self.tags.unassign_from_publication(tag_id, publication_id)?;
        self.cache.touch(reader.id);
        Ok(())
    }

    pub fn record_read_activity(
        &self,
        auth_id: &str,
        publication_id: PublicationId,
        selector: Option<&serde_json::Value>,
    ) -> ServiceResult<ReadActivity> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_publication(&reader, publication_id)?;
        Ok(self
            .publications
            .record_read_activity(reader.id, publication_id, selector)?)
    }

    pub fn latest_read_activity(
        &self,
        auth_id: &str,
        publication_id: PublicationId,
    ) -> ServiceResult<Option<ReadActivity>> {
        let reader = resolve_reader(&self.readers, auth_id)?;
        self.owned_publication(&reader, publication_id)?;
        Ok(self.publications.latest_read_activity(publication_id)?)
    }

    fn owned_publication(
        &self,
        reader: &Reader,
        publication_id: PublicationId,
    ) -> ServiceResult<Publication> {
        let publication = self
            .publications
            .get_publication(publication_id)?
            .ok_or(ServiceError::NotFound {
                entity: "publication",
                id: publication_id,
            })?;
        ensure_owner(reader, publication.reader_id, "publication", publication_id)?;
        Ok(publication)
    }
}
