use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_DB_PATH: &str = "./data/folio.db";

#[derive(Debug, Parser)]
#[command(name = "folio-cli", version, about = "Folio CMS database CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create collections and unique indexes, then seed settings defaults.
    Init {
        /// SQLite database file.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db_path: PathBuf,
    },
    /// Create any missing collection or unique index.
    EnsureIndexes {
        /// SQLite database file.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db_path: PathBuf,
    },
    /// Print settings as JSON. Missing categories are created from defaults.
    Settings {
        /// SQLite database file.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db_path: PathBuf,
        /// One of `general`, `social`, `preferences`; all when omitted.
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the document count of every collection.
    Stats {
        /// SQLite database file.
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db_path: PathBuf,
    },
}
