//! Application-defined SQL functions registered on every connection.
//!
//! # Invariants
//! - `unicode_lower(x)` is deterministic and returns NULL for NULL input.
//! - Listing queries compare `unicode_lower(column)` against patterns
//!   lowercased with `str::to_lowercase`, so both sides fold identically.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Name of the full Unicode lowercase function.
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Registers the reader SQL functions on `conn`.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|value| value.to_lowercase()))
        },
    )
}
