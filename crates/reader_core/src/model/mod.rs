//! Domain model for readers, their library and their annotations.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep identifier and normalization rules next to the types they guard.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Deletion is represented by soft-delete timestamps, not hard delete.

pub mod note;
pub mod publication;
pub mod reader;
pub mod tag;
