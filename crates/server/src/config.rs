use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_LOG_FILTER: &str = "quire_server=info,quire_core=info,tower_http=info";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub database_url: String,
    /// Page fetch timeout in seconds; probes keep their own shorter default.
    pub fetch_timeout: Option<u64>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("QUIRE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind
            .parse()
            .with_context(|| format!("QUIRE_BIND must be a socket address, got {bind:?}"))?;

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
            anyhow::bail!("DATABASE_URL must be a postgres:// URL");
        }

        let fetch_timeout = lookup("QUIRE_FETCH_TIMEOUT")
            .map(|v| v.parse::<u64>().context("QUIRE_FETCH_TIMEOUT must be a number of seconds"))
            .transpose()?;

        Ok(Self { bind, database_url, fetch_timeout })
    }
}
