//! Server configuration, read from the environment.

use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, bail};
use lobby_core::ChatConfig;

const DEFAULT_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Everything the binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `LOBBY_ADDR`
    pub addr: SocketAddr,
    /// `DATABASE_URL`; `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// `LOBBY_LOG`, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// `LOBBY_STALE_AFTER_MS` and `LOBBY_SWEEP_INTERVAL_MS`.
    pub chat: ChatConfig,
}

impl ServerConfig {
    /// Read the process environment.
    ///
    /// # Errors
    /// Returns error if a variable is set but unparseable.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset and empty values fall back
    /// to defaults.
    ///
    /// # Errors
    /// Returns error if a value is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = ChatConfig::default();

        let addr = get("LOBBY_ADDR")
            .as_deref()
            .unwrap_or(DEFAULT_ADDR)
            .parse::<SocketAddr>()
            .context("LOBBY_ADDR is not a socket address")?;

        Ok(Self {
            addr,
            database_url: get("DATABASE_URL"),
            log_level: get("LOBBY_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
            chat: ChatConfig {
                stale_after: millis(
                    get("LOBBY_STALE_AFTER_MS"),
                    "LOBBY_STALE_AFTER_MS",
                    defaults.stale_after,
                )?,
                sweep_interval: millis(
                    get("LOBBY_SWEEP_INTERVAL_MS"),
                    "LOBBY_SWEEP_INTERVAL_MS",
                    defaults.sweep_interval,
                )?,
            },
        })
    }
}

fn millis(raw: Option<String>, key: &str, default: Duration) -> anyhow::Result<Duration> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let ms: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number of milliseconds, got `{raw}`"))?;
    if ms == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_millis(ms))
}
