//! Now-playing API client.
//!
//! Every failure mode (transport error, non-2xx, malformed JSON) is logged
//! and collapses to `None`; callers fall back to a placeholder state and the
//! next poll retries.

use std::time::Duration;

use anyhow::Context;
use tracing::{debug, warn};

use crate::nowplaying::{parse_payload, ApiStationEntry};

const USER_AGENT: &str = concat!("wavecast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct NowPlayingClient {
    client: reqwest::Client,
    url: String,
}

impl NowPlayingClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("failed to build now-playing HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Option<Vec<ApiStationEntry>> {
        match self.try_fetch().await {
            Ok(entries) => {
                debug!("[api] fetched {} station entries", entries.len());
                Some(entries)
            }
            Err(e) => {
                warn!("[api] now-playing fetch from {} failed: {:#}", self.url, e);
                None
            }
        }
    }

    async fn try_fetch(&self) -> anyhow::Result<Vec<ApiStationEntry>> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("API returned status: {}", response.status());
        }

        let value: serde_json::Value = response
            .json()
            .await
            .context("failed to parse now-playing response")?;
        parse_payload(value)
    }
}
