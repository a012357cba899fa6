//! Command line entry point for local reader databases.
//!
//! # Responsibility
//! - Open the configured database and run one listing or outline command.
//! - Print results as JSON on stdout and errors on stderr.

use clap::{Parser, Subcommand};
use log::warn;
use reader_core::config::ReaderConfig;
use reader_core::db::{open_db, open_db_in_memory, DbError};
use reader_core::repo::note_repo::SqliteNoteRepository;
use reader_core::repo::outline_repo::SqliteOutlineRepository;
use reader_core::repo::publication_repo::SqlitePublicationRepository;
use reader_core::repo::reader_repo::SqliteReaderRepository;
use reader_core::repo::tag_repo::SqliteTagRepository;
use reader_core::{
    init_from_config, LibraryResponse, LibraryService, MemoryLibraryCache, NotesService,
    OutlineService, QueryParams, ReaderService, RepoError, ServiceError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "reader", about = "Query a reader library database", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overrides `[database] path`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Auth identity of the calling reader
    #[arg(long, global = true, default_value = "")]
    auth: String,
}

#[derive(Subcommand)]
enum Command {
    /// Register a reader for `--auth`
    Register {
        #[arg(long)]
        name: Option<String>,
    },

    /// List the library, e.g. `reader library title=super orderBy=title`
    Library {
        /// Query parameters
        #[arg(value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Epoch milliseconds of the caller's last copy
        #[arg(long)]
        since: Option<i64>,
    },

    /// List notes outside outlines, e.g. `reader notes flag=important`
    Notes {
        #[arg(value_name = "NAME=VALUE")]
        params: Vec<String>,
    },

    /// Print one outline as a tree
    Outline {
        context_id: Uuid,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] reader_core::ConfigError),
    #[error("database: {0}")]
    Db(#[from] DbError),
    #[error("repository: {0}")]
    Repo(#[from] RepoError),
    #[error("{0}")]
    Service(#[from] ServiceError),
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match cli.config.as_deref() {
        Some(path) => ReaderConfig::load(path)?,
        None => ReaderConfig::default(),
    };
    if let Err(err) = init_from_config(&config.logging) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let conn = match cli.db.as_ref().or(config.database.path.as_ref()) {
        Some(path) => open_db(path)?,
        None => {
            warn!("event=cli_open module=cli status=memory reason=no_database_path");
            open_db_in_memory()?
        }
    };

    let output = match cli.command {
        Command::Register { name } => {
            let readers = ReaderService::new(SqliteReaderRepository::try_new(&conn)?);
            serde_json::to_string_pretty(&readers.create_reader(&cli.auth, name.as_deref())?)?
        }
        Command::Library { params, since } => {
            let library = LibraryService::new(
                SqliteReaderRepository::try_new(&conn)?,
                SqlitePublicationRepository::try_new(&conn)?,
                SqliteTagRepository::try_new(&conn)?,
                MemoryLibraryCache::from_secs(config.cache.ttl_secs),
                config.listing,
            );
            match library.library(&cli.auth, &parse_params(&params), since)? {
                LibraryResponse::NotModified => {
                    serde_json::to_string_pretty(&serde_json::json!({ "notModified": true }))?
                }
                LibraryResponse::Listing(listing) => serde_json::to_string_pretty(&listing)?,
            }
        }
        Command::Notes { params } => {
            let notes = NotesService::new(
                SqliteReaderRepository::try_new(&conn)?,
                SqliteNoteRepository::try_new(&conn)?,
                SqliteTagRepository::try_new(&conn)?,
                config.listing,
            );
            serde_json::to_string_pretty(&notes.list_notes(&cli.auth, &parse_params(&params))?)?
        }
        Command::Outline { context_id } => {
            let outlines = OutlineService::new(
                SqliteReaderRepository::try_new(&conn)?,
                SqliteOutlineRepository::try_new(&conn)?,
                SqliteNoteRepository::try_new(&conn)?,
            );
            serde_json::to_string_pretty(&outlines.get_outline(&cli.auth, context_id)?)?
        }
    };

    println!("{output}");
    Ok(())
}

fn parse_params(tokens: &[String]) -> QueryParams {
    let mut params = QueryParams::new();
    for token in tokens {
        params.push_token(token);
    }
    params
}
