//! HTTP fact provider backed by `reqwest`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{CatFacts, FactProvider};
use crate::config::CatFactsConfig;
use crate::error::UpstreamError;

/// GETs the configured URL and decodes a [`CatFacts`] body.
pub struct CatFactsClient {
    client: reqwest::Client,
    url: String,
}

impl CatFactsClient {
    pub fn new(config: &CatFactsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl FactProvider for CatFactsClient {
    async fn fetch_facts(&self) -> Result<CatFacts, UpstreamError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::fatal(format!("malformed cat facts payload: {e}")))
    }
}
