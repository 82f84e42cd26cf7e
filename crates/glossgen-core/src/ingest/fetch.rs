use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;

/// Where a source document lives: an `http(s)` URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Url(Url),
    Path(PathBuf),
}

impl SourceLocation {
    /// Strings starting with `http://` or `https://` are URLs, anything else
    /// is a filesystem path.
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Ok(Self::Url(Url::parse(trimmed)?))
        } else {
            Ok(Self::Path(PathBuf::from(trimmed)))
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl std::str::FromStr for SourceLocation {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_seconds: u32,
    pub request_timeout_seconds: u32,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 30,
            request_timeout_seconds: 120,
            user_agent: concat!("glossgen/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Reads source documents from the network or disk.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch_text(&self, source: &SourceLocation) -> Result<String> {
        match source {
            SourceLocation::Url(url) => {
                tracing::info!("Fetching {}", url);
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await?
                    .error_for_status()?;
                let body = response.text().await?;
                tracing::debug!("Fetched {} bytes from {}", body.len(), url);
                Ok(body)
            }
            SourceLocation::Path(path) => {
                tracing::info!("Reading {}", path.display());
                Ok(tokio::fs::read_to_string(path).await?)
            }
        }
    }
}
