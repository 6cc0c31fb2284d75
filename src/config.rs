use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdentityConfig {
    Remote { userinfo_url: String, timeout: Duration },
    Static { tokens: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("invalid DATABASE_MAX_CONNECTIONS: {}", raw))?,
            None => 5,
        };

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid PORT: {}", raw))?,
            None => 3296,
        };

        let identity = match (lookup("IDENTITY_USERINFO_URL"), lookup("AUTH_STATIC_TOKENS")) {
            (Some(userinfo_url), _) => {
                let timeout_secs = lookup("IDENTITY_TIMEOUT_SECS")
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .unwrap_or(10);
                IdentityConfig::Remote {
                    userinfo_url,
                    timeout: Duration::from_secs(timeout_secs),
                }
            }
            (None, Some(tokens)) => IdentityConfig::Static { tokens },
            (None, None) => bail!("either IDENTITY_USERINFO_URL or AUTH_STATIC_TOKENS must be set"),
        };

        debug!("Listening address: {}:{}", host, port);
        match &identity {
            IdentityConfig::Remote { userinfo_url, .. } => {
                debug!("Identity provider: remote ({})", userinfo_url)
            }
            IdentityConfig::Static { .. } => debug!("Identity provider: static token table"),
        }

        Ok(Self {
            database_url,
            max_connections,
            host,
            port,
            identity,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
