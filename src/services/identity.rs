use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("token rejected by identity provider")]
    Rejected,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a bearer token to a stable, opaque user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<String, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: Option<String>,
    user_id: Option<String>,
    id: Option<String>,
}

impl UserInfo {
    fn into_user_id(self) -> Option<String> {
        self.sub
            .or(self.user_id)
            .or(self.id)
            .filter(|id| !id.is_empty())
    }
}

/// Validates tokens by calling the provider's user-info endpoint.
#[derive(Clone)]
pub struct RemoteIdentityProvider {
    client: Client,
    userinfo_url: String,
}

impl RemoteIdentityProvider {
    pub fn new(userinfo_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            userinfo_url: userinfo_url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<String, IdentityError> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| {
                error!("Identity provider request failed: {}", err);
                IdentityError::Unavailable(err.to_string())
            })?;

        match response.status() {
            status if status.is_success() => {
                let info: UserInfo = response.json().await.map_err(|err| {
                    error!("Identity provider returned an unreadable body: {}", err);
                    IdentityError::Unavailable(err.to_string())
                })?;

                let user_id = info.into_user_id().ok_or_else(|| {
                    warn!("Identity provider response carried no user id");
                    IdentityError::Unavailable("missing user id".to_string())
                })?;

                debug!("Authenticated user {}", user_id);
                Ok(user_id)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Rejected),
            status => {
                warn!("Identity provider responded with status {}", status);
                Err(IdentityError::Unavailable(format!("status {}", status)))
            }
        }
    }
}

/// Fixed token table, for local development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, String>,
}

impl StaticIdentityProvider {
    pub fn new<I, T, U>(entries: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        Self {
            tokens: entries
                .into_iter()
                .map(|(token, user)| (token.into(), user.into()))
                .collect(),
        }
    }

    /// Parses `token=user,token=user`. Malformed pairs are skipped.
    pub fn parse(spec: &str) -> Self {
        Self::new(spec.split(',').filter_map(|pair| {
            let (token, user) = pair.split_once('=')?;
            let (token, user) = (token.trim(), user.trim());
            if token.is_empty() || user.is_empty() {
                None
            } else {
                Some((token.to_string(), user.to_string()))
            }
        }))
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<String, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Rejected)
    }
}
