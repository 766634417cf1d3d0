use std::path::Path;

use anyhow::{Context, Result};

use super::open_store;

pub async fn run(db_path: &Path) -> Result<()> {
    let store = open_store(db_path).await?;
    store
        .ensure_schema()
        .await
        .context("failed to create collections or unique indexes")?;
    tracing::info!("Index ensure run finished for {}", db_path.display());
    Ok(())
}
