//! Core use-case services.
//!
//! # Responsibility
//! - Resolve the calling reader from an auth identity.
//! - Enforce ownership before delegating to repositories.
//! - Shape serializable envelopes for outer surfaces (HTTP layer, CLI).
//!
//! # Invariants
//! - Every operation fails with `ReaderNotFound` before touching data when
//!   the auth identity is unknown.
//! - Resources of another reader yield `Forbidden`, never their content.

pub mod library_service;
pub mod notes_service;
pub mod outline_service;
pub mod reader_service;
pub mod tag_service;

use crate::model::reader::{Reader, ReaderId};
use crate::outline::OutlineError;
use crate::repo::reader_repo::ReaderRepository;
use crate::repo::RepoError;
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse error category for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Forbidden,
    BadRequest,
    /// Stored data is inconsistent; not correctable by the caller.
    DataCorruption,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no reader found for auth id `{0}`")]
    ReaderNotFound(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("access to {entity} {id} disallowed")]
    Forbidden { entity: &'static str, id: Uuid },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Outline(#[from] OutlineError),
    #[error(transparent)]
    Repo(RepoError),
}

impl ServiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ReaderNotFound(_) | Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Forbidden { .. } => ErrorClass::Forbidden,
            Self::InvalidInput(_) => ErrorClass::BadRequest,
            Self::Outline(_) | Self::Repo(RepoError::InvalidData(_)) => ErrorClass::DataCorruption,
            Self::Repo(_) => ErrorClass::Internal,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict(message) | RepoError::InvalidLink(message) => {
                Self::InvalidInput(message)
            }
            other => Self::Repo(other),
        }
    }
}

/// Resolves the reader behind an auth identity.
pub(crate) fn resolve_reader<R: ReaderRepository>(
    readers: &R,
    auth_id: &str,
) -> ServiceResult<Reader> {
    readers
        .find_by_auth_id(auth_id)?
        .ok_or_else(|| ServiceError::ReaderNotFound(auth_id.to_string()))
}

pub(crate) fn ensure_owner(
    reader: &Reader,
    owner: ReaderId,
    entity: &'static str,
    id: Uuid,
) -> ServiceResult<()> {
    if reader.id == owner {
        Ok(())
    } else {
        Err(ServiceError::Forbidden { entity, id })
    }
}
