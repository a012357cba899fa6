//! Reader schema migrations.
//!
//! # Responsibility
//! - Build the library, notes and tags schema step by step.
//! - Check on every open that the tables of each applied step are present.
//!
//! # Invariants
//! - `version` values are strictly increasing and mirrored to
//!   `PRAGMA user_version`.
//! - Pending steps run in one transaction; a failed step leaves the
//!   database at its previous version.
//! - A database recorded at version `v` holds every table created by
//!   steps `1..=v`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
    tables: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "library",
        sql: include_str!("0001_library.sql"),
        tables: &["readers", "publications", "attributions", "read_activities"],
    },
    Migration {
        version: 2,
        name: "notes",
        sql: include_str!("0002_notes.sql"),
        tables: &["note_contexts", "notes", "note_bodies"],
    },
    Migration {
        version: 3,
        name: "tags",
        sql: include_str!("0003_tags.sql"),
        tables: &["tags", "publication_tags", "note_tags"],
    },
];

/// Latest schema version known by this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the schema to [`latest_version`] and checks the expected tables.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version < latest {
        let tx = conn.transaction()?;
        for migration in MIGRATIONS
            .iter()
            .filter(|migration| migration.version > current_version)
        {
            tx.execute_batch(migration.sql)?;
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
            info!(
                "event=db_migrate module=db status=ok version={} name={}",
                migration.version, migration.name
            );
        }
        tx.commit()?;
    }

    verify_tables(conn)
}

fn verify_tables(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;")?;
    for migration in MIGRATIONS {
        for table in migration.tables {
            if !stmt.exists([*table])? {
                return Err(DbError::MissingTable {
                    table: *table,
                    migration: migration.name,
                });
            }
        }
    }
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
