//! Core domain logic for the Reader library and annotation store.
//! This crate is the single source of truth for outline and listing rules.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod outline;
pub mod query;
pub mod repo;
pub mod service;

pub use cache::{LibraryCache, MemoryLibraryCache};
pub use config::{ConfigError, ReaderConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use outline::{build_outline, MalformedOutline, OutlineError, OutlineNode};
pub use query::{LibraryFilter, LibraryQuery, ListPage, NoteFilter, NoteQuery, QueryParams};
pub use repo::{RepoError, RepoResult};
pub use service::library_service::{LibraryListing, LibraryResponse, LibraryService};
pub use service::notes_service::NotesService;
pub use service::outline_service::{Outline, OutlineService};
pub use service::reader_service::ReaderService;
pub use service::tag_service::TagService;
pub use service::{ErrorClass, ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
