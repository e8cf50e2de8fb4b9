use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use files_manager::config::Config;
use files_manager::db::{Database, DocumentStore, SqliteDocumentStore};
use files_manager::session::{SessionStore, SqliteSessionStore};
use files_manager::storage::LocalStorage;
use files_manager::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "files_manager=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting files-manager...");

    let config = Arc::new(Config::load()?);
    tracing::info!("Configuration loaded");

    // Connect explicitly; a store that cannot be reached aborts startup
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized at {}", config.database.path);

    let docs = Arc::new(SqliteDocumentStore::new(db.clone()));
    let sessions = Arc::new(SqliteSessionStore::new(db));
    let blobs = Arc::new(LocalStorage::new(&config.storage.folder_path));
    tracing::info!("Blob directory: {}", config.storage.folder_path);

    let state = AppState {
        config: config.clone(),
        docs: docs.clone(),
        sessions: sessions.clone(),
        blobs,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sessions.close().await;
    docs.close().await;
    tracing::info!("Stores closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}
