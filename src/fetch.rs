use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use tracing::{debug, error, info};

use crate::config::SessionConfig;
use crate::error::{FetchError, MonitorError};

/// Source of page markup. Failures are logged by the implementation and
/// surface only as `None`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Fetcher backed by a cookie-authenticated reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(session: &SessionConfig, jar: Jar) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(session.user_agent.as_str())
            .cookie_provider(Arc::new(jar))
            .build()
            .map_err(MonitorError::Client)?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds the client and checks the cookies actually grant access.
    pub async fn login(session: &SessionConfig, jar: Jar) -> Result<Self, MonitorError> {
        let fetcher = Self::new(session, jar)?;
        fetcher.check_login(session).await?;
        Ok(fetcher)
    }

    pub async fn check_login(&self, session: &SessionConfig) -> Result<(), MonitorError> {
        info!("Connecting to Amazon Vine...");
        let body = self
            .get(&session.login_page)
            .await
            .map_err(|e| MonitorError::LoginFailed(e.to_string()))?;

        if body.contains(&session.login_marker) {
            info!("Successfully logged in with a browser cookie.");
            Ok(())
        } else {
            Err(MonitorError::LoginFailed(
                "could not log in with a cookie, check the browser session".to_string(),
            ))
        }
    }

    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "Downloading page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        match self.get(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                error!(url, "Failed to download page: {e}");
                None
            }
        }
    }
}
