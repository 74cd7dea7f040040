//! Remote repository connection
//!
//! Connects once per process to a GitHub-style REST repository using the
//! configured access token and caches the outcome. Nothing in the form flow
//! reads or writes through it; the health endpoint reports its status.

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::RepositoryConfig;

/// Repository connection errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    #[error("Repository connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Access denied to repository: {0}")]
    AccessDenied(String),

    #[error("Repository API error: {0}")]
    ApiError(String),
}

/// Subset of the repository metadata returned on connect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Authenticated client bound to one repository
#[derive(Debug, Clone)]
pub struct RepositoryClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    info: RepositoryInfo,
}

impl RepositoryClient {
    /// Connect and verify access to the repository
    pub async fn connect(config: &RepositoryConfig) -> Result<Self, ConnectionError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dossier-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        let api_url = config.api_url.trim_end_matches('/').to_string();
        let url = format!("{}/repos/{}/{}", api_url, config.owner, config.name);

        let response = client
            .get(&url)
            .bearer_auth(&config.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        let full_name = format!("{}/{}", config.owner, config.name);
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ConnectionError::NotFound(full_name));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ConnectionError::AccessDenied(full_name));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectionError::ApiError(format!("{}: {}", status, body)));
        }

        let info: RepositoryInfo = response
            .json()
            .await
            .map_err(|e| ConnectionError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(Self {
            client,
            api_url,
            token: config.token.clone(),
            info,
        })
    }

    pub fn info(&self) -> &RepositoryInfo {
        &self.info
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Underlying HTTP client with its bearer token
    pub fn http(&self) -> (&reqwest::Client, &str) {
        (&self.client, &self.token)
    }
}

/// Process-wide cache of the first connection attempt
#[derive(Default)]
pub struct RepositoryHandle {
    config: Option<RepositoryConfig>,
    cell: OnceCell<Result<RepositoryClient, ConnectionError>>,
}

/// Status reported to the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryStatus {
    NotConfigured,
    Connected,
    Unavailable,
}

impl RepositoryHandle {
    pub fn new(config: Option<RepositoryConfig>) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Cached client, connecting on first use.
    ///
    /// `None` when no repository is configured. A failed first attempt is
    /// cached as a terminal error and never retried.
    pub async fn get(&self) -> Option<&Result<RepositoryClient, ConnectionError>> {
        let config = self.config.as_ref()?;
        Some(
            self.cell
                .get_or_init(|| async {
                    let result = RepositoryClient::connect(config).await;
                    match &result {
                        Ok(client) => tracing::info!(
                            repository = %client.info().full_name,
                            "Connected to remote repository"
                        ),
                        Err(e) => tracing::error!("{}", e),
                    }
                    result
                })
                .await,
        )
    }

    pub async fn status(&self) -> RepositoryStatus {
        match self.get().await {
            None => RepositoryStatus::NotConfigured,
            Some(Ok(_)) => RepositoryStatus::Connected,
            Some(Err(_)) => RepositoryStatus::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_handle() {
        let handle = RepositoryHandle::new(None);

        assert!(!handle.is_configured());
        assert!(handle.get().await.is_none());
        assert_eq!(handle.status().await, RepositoryStatus::NotConfigured);
    }

    #[tokio::test]
    async fn test_failed_connection_is_cached() {
        let handle = RepositoryHandle::new(Some(RepositoryConfig {
            // Port 9 (discard) on localhost: connection refused
            api_url: "http://127.0.0.1:9".to_string(),
            owner: "owner".to_string(),
            name: "repo".to_string(),
            token: "token".to_string(),
        }));

        let first = handle.get().await.unwrap();
        assert!(matches!(first, Err(ConnectionError::ConnectionFailed(_))));

        let second = handle.get().await.unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(handle.status().await, RepositoryStatus::Unavailable);
    }
}
