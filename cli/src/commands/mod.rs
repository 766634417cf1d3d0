pub mod ensure_indexes;
pub mod init;
pub mod settings;
pub mod stats;

use std::path::Path;

use anyhow::{Context, Result};
use folio_shared::{ContentStore, DocumentDb};

use crate::cli::{Cli, Commands};

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { db_path } => init::run(&db_path).await,
        Commands::EnsureIndexes { db_path } => ensure_indexes::run(&db_path).await,
        Commands::Settings { db_path, category } => {
            settings::run(&db_path, category.as_deref()).await
        },
        Commands::Stats { db_path } => stats::run(&db_path).await,
    }
}

pub async fn open_store(db_path: &Path) -> Result<ContentStore> {
    let db = DocumentDb::open(db_path)
        .await
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    Ok(ContentStore::new(db))
}
