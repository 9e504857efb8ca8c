//! Lobby chat server.
//!
//! Run with: cargo run -p lobby-server
//!
//! Configuration comes from the environment (or a `.env` file); see
//! `config.rs` for the variables.

mod config;

use std::sync::Arc;

use anyhow::Context;
use lobby_core::traits::ChatStore;
use lobby_service::{
    ChatService,
    storage::{MemoryStore, SqliteStore},
};
use lobby_transport::http::create_router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .init();

    match config.database_url.as_deref() {
        Some(url) => {
            let store = SqliteStore::connect(url)
                .await
                .with_context(|| format!("failed to open database {url}"))?;
            tracing::info!("Using SQLite store at {url}");
            serve(store, &config).await
        }
        None => {
            tracing::info!("Using in-memory store");
            serve(MemoryStore::new(), &config).await
        }
    }
}

async fn serve<S>(store: S, config: &ServerConfig) -> anyhow::Result<()>
where
    S: ChatStore + 'static,
{
    let chat = Arc::new(ChatService::new(store, config.chat));
    let sweeper = Arc::clone(&chat).spawn_sweeper();

    let app = create_router(chat);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!(
        stale_after = ?config.chat.stale_after,
        sweep_interval = ?config.chat.sweep_interval,
        "Server listening on http://{}",
        config.addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.stop().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
