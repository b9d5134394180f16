// src/explorer.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::GraphError;
use crate::models::{BlockListing, RawAddress, RawBlock};

/// Network-facing lookups consumed by the crawler, the stats command and the
/// snapshot job. A trait so tests can substitute a canned source.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch_address(&self, address: &str) -> Result<RawAddress, GraphError>;
    async fn fetch_block(&self, hash: &str) -> Result<RawBlock, GraphError>;
    async fn latest_hash(&self) -> Result<String, GraphError>;
    /// Hashes of the blocks mined in the 24h window ending at `day_ms`
    /// (milliseconds since epoch).
    async fn blocks_for_day(&self, day_ms: i64) -> Result<Vec<String>, GraphError>;
}

pub struct Explorer {
    client: Client,
    base_url: String,
}

impl Explorer {
    pub fn new(cfg: &Config) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.explorer_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET with retries, returning the response body. Non-2xx is terminal;
    /// transport errors are retried with a short pause.
    async fn get_text(&self, url: &str) -> Result<String, GraphError> {
        for attempt in 1..=3 {
            info!("📡 GET {}", url);
            match self.client.get(url).send().await {
                Ok(resp) => {
                    if !resp.status().is_success() {
                        return Err(GraphError::Network(format!(
                            "HTTP {} for {}",
                            resp.status(),
                            url
                        )));
                    }
                    return Ok(resp.text().await?);
                }
                Err(e) if attempt < 3 => {
                    debug!("request failed (attempt {}): {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(GraphError::Network("retries exhausted".to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GraphError> {
        let text = self.get_text(url).await?;
        let parsed = serde_json::from_str(&text)?;
        Ok(parsed)
    }
}

#[async_trait]
impl ChainSource for Explorer {
    async fn fetch_address(&self, address: &str) -> Result<RawAddress, GraphError> {
        let url = format!("{}/rawaddr/{}", self.base_url, address);
        self.get_json(&url).await
    }

    async fn fetch_block(&self, hash: &str) -> Result<RawBlock, GraphError> {
        // "latest" resolves through the plaintext latest-hash endpoint first.
        let hash = if hash == "latest" {
            self.latest_hash().await?
        } else {
            hash.to_string()
        };
        let url = format!("{}/rawblock/{}", self.base_url, hash);
        self.get_json(&url).await
    }

    async fn latest_hash(&self) -> Result<String, GraphError> {
        let url = format!("{}/q/latesthash", self.base_url);
        let text = self.get_text(&url).await?;
        let hash = text.trim().to_string();
        if hash.is_empty() {
            return Err(GraphError::Schema("empty latesthash response".to_string()));
        }
        Ok(hash)
    }

    async fn blocks_for_day(&self, day_ms: i64) -> Result<Vec<String>, GraphError> {
        let url = format!("{}/blocks/{}?format=json", self.base_url, day_ms);
        let listing: BlockListing = self.get_json(&url).await?;
        Ok(listing.blocks.into_iter().map(|b| b.hash).collect())
    }
}
