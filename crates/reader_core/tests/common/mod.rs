#![allow(dead_code)]

use reader_core::db::open_db_in_memory;
use reader_core::model::note::{NewNote, Note};
use reader_core::model::publication::{NewPublication, Publication};
use reader_core::model::reader::Reader;
use reader_core::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use reader_core::repo::publication_repo::{PublicationRepository, SqlitePublicationRepository};
use reader_core::repo::reader_repo::{ReaderRepository, SqliteReaderRepository};
use rusqlite::Connection;
use uuid::Uuid;

pub const ALICE: &str = "auth|alice";
pub const BOB: &str = "auth|bob";

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn register(conn: &Connection, auth_id: &str) -> Reader {
    SqliteReaderRepository::try_new(conn)
        .unwrap()
        .create_reader(auth_id, None)
        .unwrap()
}

pub fn add_publication(conn: &Connection, reader: &Reader, publication: NewPublication) -> Publication {
    SqlitePublicationRepository::try_new(conn)
        .unwrap()
        .create_publication(reader.id, &publication)
        .unwrap()
}

pub fn add_named(conn: &Connection, reader: &Reader, name: &str) -> Publication {
    add_publication(conn, reader, NewPublication::new(name))
}

pub fn add_note(conn: &Connection, reader: &Reader, note: NewNote) -> Note {
    SqliteNoteRepository::try_new(conn)
        .unwrap()
        .create_note(reader.id, &note)
        .unwrap()
}

/// Overwrites a column directly, bypassing repository rules.
pub fn set_column(conn: &Connection, table: &str, id: Uuid, column: &str, value: Option<i64>) {
    conn.execute(
        &format!("UPDATE {table} SET {column} = ?1 WHERE id = ?2;"),
        rusqlite::params![value, id.to_string()],
    )
    .unwrap();
}

pub fn names(publications: &[Publication]) -> Vec<&str> {
    publications
        .iter()
        .map(|publication| publication.name.as_str())
        .collect()
}
