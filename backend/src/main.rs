use anyhow::{Context, Result};
use folio_backend::{create_router, AppState, ServerConfig};
use folio_shared::{ContentStore, DocumentDb};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env()?;
    tracing::info!("Starting folio backend server ({})", config.app_env);
    tracing::info!("Database: {}", config.database_path.display());

    let db = match DocumentDb::open(&config.database_path).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!("Failed to open database: {err:#}");
            std::process::exit(1);
        },
    };
    let content = ContentStore::new(db);
    content
        .ensure_schema()
        .await
        .context("failed to prepare collections")?;

    let app = create_router(AppState::new(content));

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
