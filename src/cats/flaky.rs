//! Simulated unreliable upstream.
//!
//! [`FlakyFacts`] fails the first `failures_before_success` calls it sees with a
//! retryable `"oops"` error and delegates to the wrapped provider from then on.
//! The count lives in an [`AttemptCounter`] that is shared by every request
//! served by the process, so failures are spent across requests, not per
//! request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{CatFacts, FactProvider};
use crate::error::UpstreamError;

/// Process-lifetime attempt count. Cloning shares the underlying count.
#[derive(Debug, Clone, Default)]
pub struct AttemptCounter(Arc<AtomicU64>);

impl AttemptCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `value`.
    pub fn seeded(value: u64) -> Self {
        Self(Arc::new(AtomicU64::new(value)))
    }

    /// Return the current count and advance it.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn seed(&self, value: u64) {
        self.0.store(value, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.seed(0);
    }
}

pub struct FlakyFacts {
    inner: Arc<dyn FactProvider>,
    counter: AttemptCounter,
    failures_before_success: u64,
}

impl FlakyFacts {
    pub fn new(
        inner: Arc<dyn FactProvider>,
        counter: AttemptCounter,
        failures_before_success: u64,
    ) -> Self {
        Self {
            inner,
            counter,
            failures_before_success,
        }
    }

    pub fn counter(&self) -> &AttemptCounter {
        &self.counter
    }
}

#[async_trait]
impl FactProvider for FlakyFacts {
    async fn fetch_facts(&self) -> Result<CatFacts, UpstreamError> {
        let seen = self.counter.next();
        if seen < self.failures_before_success {
            tracing::warn!(attempt = seen + 1, "oops!");
            return Err(UpstreamError::retryable("oops"));
        }
        tracing::info!(attempt = seen + 1, "facts");
        self.inner.fetch_facts().await
    }
}
