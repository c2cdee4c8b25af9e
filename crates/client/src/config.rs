//! Client configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;
use std::{env, fmt::Display, str::FromStr};

use anyhow::anyhow;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://localhost:5002`.
    pub api_url: String,
    /// Push endpoint. Derived from `api_url` when unset.
    pub ws_url: String,
    /// Overrides the OS data directory for the local database.
    pub data_dir: Option<PathBuf>,
    pub probe_interval: Duration,
    pub retry_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let api_url = "http://localhost:5002".to_string();
        Self {
            ws_url: derive_ws_url(&api_url),
            api_url,
            data_dir: None,
            probe_interval: Duration::from_secs(5),
            retry_interval: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url: String = try_load("MOUSEDECK_API_URL", "http://localhost:5002")?;
        let api_url = api_url.trim_end_matches('/').to_string();
        let ws_url = env::var("MOUSEDECK_WS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| derive_ws_url(&api_url));
        Ok(Self {
            ws_url,
            api_url,
            data_dir: env::var("MOUSEDECK_DATA_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            probe_interval: Duration::from_secs(try_load("MOUSEDECK_PROBE_INTERVAL_SECS", "5")?),
            retry_interval: Duration::from_secs(try_load("MOUSEDECK_RETRY_INTERVAL_SECS", "5")?),
        })
    }
}

fn derive_ws_url(api_url: &str) -> String {
    let base = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    };
    format!("{}/ws", base.trim_end_matches('/'))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}
