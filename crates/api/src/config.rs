//! Server configuration from environment variables.

use std::{env, fmt::Display, str::FromStr};

use anyhow::anyhow;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub port: u16,
    /// PostgreSQL connection string. Unset means the in-memory catalog.
    pub database_url: Option<String>,
    /// Load the demo catalog into an empty store on startup.
    pub seed_catalog: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 5002,
            database_url: None,
            seed_catalog: true,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: try_load("PORT", "5002")?,
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            seed_catalog: try_load::<bool>("SEED_CATALOG", "true")?,
        })
    }
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
