//! Reader registration and lookup.

use crate::model::reader::Reader;
use crate::repo::reader_repo::ReaderRepository;
use crate::service::{resolve_reader, ServiceError, ServiceResult};
use log::info;

pub struct ReaderService<R: ReaderRepository> {
    readers: R,
}

impl<R: ReaderRepository> ReaderService<R> {
    pub fn new(readers: R) -> Self {
        Self { readers }
    }

    /// Registers a reader for an auth identity, seeding default tags.
    pub fn create_reader(&self, auth_id: &str, name: Option<&str>) -> ServiceResult<Reader> {
        let auth_id = auth_id.trim();
        if auth_id.is_empty() {
            return Err(ServiceError::InvalidInput(
                "auth id must not be blank".to_string(),
            ));
        }
        let name = name.map(str::trim).filter(|name| !name.is_empty());
        let reader = self.readers.create_reader(auth_id, name)?;
        info!(
            "event=reader_create module=service status=ok reader_id={}",
            reader.id
        );
        Ok(reader)
    }

    pub fn reader(&self, auth_id: &str) -> ServiceResult<Reader> {
        resolve_reader(&self.readers, auth_id)
    }
}
