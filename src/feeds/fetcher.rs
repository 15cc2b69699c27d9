//! Feed document retrieval over HTTP.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::FeedConfig;

/// Reasons a feed document could not be retrieved
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to fetch feed")]
    Status(u16),

    #[error("Timed out fetching feed")]
    Timeout,

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    Transport(String),
}

/// Retrieves the raw text of a feed document
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed fetcher sending a fixed User-Agent
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self, FetchError> {
        Self::new(&config.user_agent, config.fetch_timeout)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let response = self.client.get(parsed).send().await.map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response.text().await.map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Transport("Connection failed".to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}
