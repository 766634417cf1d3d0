use std::path::Path;

use anyhow::Result;
use folio_shared::ContentStore;

use super::open_store;

pub async fn run(db_path: &Path) -> Result<()> {
    let store = open_store(db_path).await?;
    store.ensure_schema().await?;
    print!("{}", render(&store).await?);
    Ok(())
}

/// One aligned `<collection>  <count>` line per resource collection.
pub async fn render(store: &ContentStore) -> Result<String> {
    let counts = store.collection_counts().await?;
    let width = counts.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    Ok(counts
        .into_iter()
        .map(|(name, count)| format!("{name:<width$}  {count}\n"))
        .collect())
}
