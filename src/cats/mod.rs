//! Cat facts: the upstream fact provider and the guarded service in front of it.
//!
//! Provides the [`FactProvider`] trait, an HTTP client for catfacts.net
//! ([`http::CatFactsClient`]), a fixed in-process provider ([`StaticFacts`]),
//! and the deliberately flaky wrapper ([`flaky::FlakyFacts`]). Providers are
//! created via [`create_provider`] from configuration; [`CatFactsService`]
//! routes every fetch through the [`Gate`].

pub mod flaky;
pub mod http;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::CatFactsConfig;
use crate::error::{GateError, UpstreamError};
use crate::gate::Gate;
use flaky::{AttemptCounter, FlakyFacts};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatFact {
    pub fact: String,
}

/// Payload returned by the upstream: `{"facts": [{"fact": "..."}, ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatFacts {
    pub facts: Vec<CatFact>,
}

impl CatFacts {
    pub fn from_strings<I, S>(facts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            facts: facts
                .into_iter()
                .map(|f| CatFact { fact: f.into() })
                .collect(),
        }
    }
}

/// A source of cat facts. Failures are classified as retryable or fatal.
#[async_trait]
pub trait FactProvider: Send + Sync {
    async fn fetch_facts(&self) -> Result<CatFacts, UpstreamError>;
}

/// Always answers with the same facts. Used offline and in tests.
#[derive(Debug, Clone)]
pub struct StaticFacts(CatFacts);

impl StaticFacts {
    pub fn new(facts: CatFacts) -> Self {
        Self(facts)
    }
}

impl Default for StaticFacts {
    fn default() -> Self {
        Self(CatFacts::from_strings([
            "Cats sleep for around 13 to 16 hours a day.",
            "A group of cats is called a clowder.",
            "Cats have five toes on their front paws but only four on the back.",
        ]))
    }
}

#[async_trait]
impl FactProvider for StaticFacts {
    async fn fetch_facts(&self) -> Result<CatFacts, UpstreamError> {
        Ok(self.0.clone())
    }
}

/// Create the configured provider (without the flaky wrapper).
///
/// Supported: `"http"` (catfacts.net or the configured URL) and `"static"`.
pub fn create_provider(config: &CatFactsConfig) -> Result<Box<dyn FactProvider>> {
    match config.provider.as_str() {
        "http" => Ok(Box::new(http::CatFactsClient::new(config)?)),
        "static" => Ok(Box::new(StaticFacts::default())),
        other => anyhow::bail!("unknown cat facts provider: {other}. Supported: http, static"),
    }
}

/// Cat facts behind the gate. One instance per process; the flaky counter is
/// shared by every request it serves.
pub struct CatFactsService {
    gate: Arc<Gate>,
    provider: Arc<dyn FactProvider>,
}

impl CatFactsService {
    pub fn new(gate: Arc<Gate>, provider: Arc<dyn FactProvider>) -> Self {
        Self { gate, provider }
    }

    /// Wire the configured provider behind a [`FlakyFacts`] using `counter`.
    pub fn from_config(
        config: &CatFactsConfig,
        gate: Arc<Gate>,
        counter: AttemptCounter,
    ) -> Result<Self> {
        let inner: Arc<dyn FactProvider> = Arc::from(create_provider(config)?);
        let flaky = FlakyFacts::new(inner, counter, config.failures_before_success);
        Ok(Self::new(gate, Arc::new(flaky)))
    }

    pub async fn facts(&self) -> Result<CatFacts, GateError> {
        let provider = &self.provider;
        self.gate
            .call(move |attempt| async move {
                tracing::debug!(attempt, "fetching cat facts");
                provider.fetch_facts().await
            })
            .await
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}
