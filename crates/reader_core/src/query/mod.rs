//! Library and notes listing queries.
//!
//! # Responsibility
//! - Coerce raw `(name, value)` query parameters into typed queries.
//! - Compile typed queries into one SQL predicate shared by the count and
//!   data statements.
//!
//! # Invariants
//! - Invalid parameter values degrade to defaults or empty matches, never
//!   to errors.
//! - Every ordering ends with `id ASC` so equal keys page deterministically.

mod filter;
mod page;
mod params;
mod sql;

pub use filter::{
    LibraryFilter, LibraryOrder, LibraryQuery, LibrarySortKey, NoteFilter, NoteOrder, NoteQuery,
    NoteSortKey, Pagination,
};
pub use page::ListPage;
pub use params::QueryParams;
pub use sql::{library_predicate, note_predicate, Predicate};
