use std::path::Path;

use anyhow::Result;

use super::open_store;

pub async fn run(db_path: &Path) -> Result<()> {
    let store = open_store(db_path).await?;
    store.ensure_schema().await?;

    // Reading each category creates its singleton from defaults when absent.
    let settings = store.settings.get_all().await?;
    tracing::debug!(
        general = %settings.general.id,
        social = %settings.social.id,
        preferences = %settings.preferences.id,
        "settings seeded"
    );

    tracing::info!("Database initialized at {}", db_path.display());
    Ok(())
}
