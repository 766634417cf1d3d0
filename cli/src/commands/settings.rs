use std::path::Path;

use anyhow::{Context, Result};
use folio_shared::{ContentStore, SettingsCategory};

use super::open_store;

pub async fn run(db_path: &Path, category: Option<&str>) -> Result<()> {
    let store = open_store(db_path).await?;
    store.ensure_schema().await?;
    println!("{}", render(&store, category).await?);
    Ok(())
}

/// Pretty JSON of one category, or of all three when `category` is `None`.
pub async fn render(store: &ContentStore, category: Option<&str>) -> Result<String> {
    let value = match category {
        Some(name) => {
            let category: SettingsCategory = name.parse()?;
            serde_json::to_value(store.settings.get(category).await?)
        },
        None => serde_json::to_value(store.settings.get_all().await?),
    }
    .context("failed to serialize settings")?;
    serde_json::to_string_pretty(&value).context("failed to format settings")
}
