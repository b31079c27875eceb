//! # TeamTrack API Server
//!
//! Multi-tenant project and task tracking over HTTP/JSON.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Registration and login with bearer tokens
//! - Projects, members and tasks confined to the caller's company
//! - A PostgreSQL store, or an in-memory store for local runs
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p teamtrack-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use teamtrack_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StoreConfig},
};
use teamtrack_shared::{
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{create_pool, DatabaseConfig},
    },
    store::{memory::MemoryStore, postgres::PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.log_format);

    tracing::info!(
        "TeamTrack API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store = open_store(&config.store).await?;

    let addr = config.bind_address();
    tracing::info!(
        member_add_policy = %config.member_add_policy,
        "Configuration loaded"
    );

    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "teamtrack_api=debug,teamtrack_shared=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Opens the configured store; PostgreSQL is migrated before use
async fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config {
        StoreConfig::Postgres(db) => {
            ensure_database_exists(&db.url)
                .await
                .context("Failed to ensure database exists")?;

            let pool = create_pool(DatabaseConfig {
                url: db.url.clone(),
                max_connections: db.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to database")?;

            run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;

            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory store; data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
