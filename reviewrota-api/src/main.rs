//! # ReviewRota API Server
//!
//! HTTP service that assigns pull request reviewers from the author's team,
//! rotates them on request and rebalances open reviews after roster changes.
//!
//! ## Usage
//!
//! ```bash
//! STORAGE_BACKEND=memory cargo run -p reviewrota-api
//! ```

use anyhow::Context;
use reviewrota_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StorageBackend},
    shutdown::Shutdown,
};
use reviewrota_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    storage::{InMemoryStore, Stores},
};
use sqlx::PgPool;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "reviewrota_api=debug,reviewrota_shared=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.log_format);

    tracing::info!(
        "ReviewRota API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );
    tracing::debug!(?config, "Loaded configuration");

    let (stores, db) = build_stores(&config).await?;

    let cancel = CancellationToken::new();
    let shutdown = Shutdown::new(cancel.clone(), config.graceful_shutdown_timeout());
    let bind_address = config.bind_address();

    let state = AppState::new(config, stores, db.clone(), cancel);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.signalled())
        .into_future();
    let outcome = shutdown.run(server).await.context("Server error")?;
    tracing::debug!(?outcome, "Server stopped");

    if let Some(pool) = db {
        close_pool(pool).await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Builds the repositories for the configured backend
///
/// The PostgreSQL backend connects, health-checks and migrates before the
/// server accepts requests.
async fn build_stores(config: &Config) -> anyhow::Result<(Stores, Option<PgPool>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Ok((Stores::in_memory(Arc::new(InMemoryStore::new())), None))
        }
        StorageBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("DATABASE_URL is required for the postgres backend")?;
            tracing::info!(url = %database.redacted_url(), "Connecting to PostgreSQL");

            let pool = create_pool(DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to create database pool")?;

            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            Ok((Stores::postgres(pool.clone()), Some(pool)))
        }
    }
}

/// Waits for Ctrl-C or SIGTERM and triggers the drain
async fn shutdown_signal(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    shutdown.trigger();
}
