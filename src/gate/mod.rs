//! Admission/retry gate around a guarded upstream operation.
//!
//! A [`Gate`] admits at most `max_concurrency` logical calls at once. Callers
//! beyond that wait in a bounded backlog; once the backlog is full new callers
//! are rejected with [`GateError::CapacityExceeded`]. An admitted call holds
//! its slot for every attempt it makes: [`UpstreamError::Retryable`] failures
//! are retried sequentially up to [`RetryPolicy::max_retries`] more times, any
//! other failure is returned at once.
//!
//! Dropping the future returned by [`Gate::call`] gives back the queue
//! position or slot and stops further attempts.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};

use crate::config::GateConfig;
use crate::error::{GateError, UpstreamError};

#[derive(Debug, Clone, Copy)]
pub enum BackoffKind {
    None,
    Fixed,
    Exponential,
}

/// Delay inserted between a failed attempt and the next one.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub kind: BackoffKind,
    pub initial: Duration,
    pub factor: f32,
    pub max: Duration,
}

impl Backoff {
    /// Retry immediately.
    pub fn none() -> Self {
        Self {
            kind: BackoffKind::None,
            initial: Duration::ZERO,
            factor: 1.0,
            max: Duration::ZERO,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            kind: BackoffKind::Fixed,
            initial: delay,
            factor: 1.0,
            max: delay,
        }
    }

    /// `factor` below 1 (or not finite) is treated as 1.
    pub fn exponential(initial: Duration, factor: f32, max: Duration) -> Self {
        let factor = if factor.is_finite() && factor >= 1.0 {
            factor
        } else {
            1.0
        };
        Self {
            kind: BackoffKind::Exponential,
            initial,
            factor,
            max,
        }
    }

    /// Delay after the `retry`-th retry (0-based).
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        match self.kind {
            BackoffKind::None => Duration::ZERO,
            BackoffKind::Fixed => self.initial,
            BackoffKind::Exponential => {
                // Grown in float nanos and capped before converting back.
                let exp = i32::try_from(retry).unwrap_or(i32::MAX);
                let nanos = self.initial.as_nanos() as f64 * f64::from(self.factor).powi(exp);
                if nanos.is_finite() && nanos < u64::MAX as f64 {
                    Duration::from_nanos(nanos.round() as u64).min(self.max)
                } else {
                    self.max
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional invocations after the first failure.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Backoff::none(),
        }
    }
}

/// Bounded-concurrency, bounded-retry wrapper for a guarded operation.
#[derive(Debug)]
pub struct Gate {
    permits: Semaphore,
    limit: usize,
    max_backlog: usize,
    queued: AtomicUsize,
    policy: RetryPolicy,
    call_timeout: Option<Duration>,
}

/// Decrements the backlog counter when a queued caller leaves the queue,
/// whether it was admitted, rejected or dropped.
struct QueuePosition<'a>(&'a AtomicUsize);

impl Drop for QueuePosition<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Gate {
    pub fn new(max_concurrency: usize, max_backlog: usize, policy: RetryPolicy) -> Self {
        let limit = max_concurrency.max(1);
        Self {
            permits: Semaphore::new(limit),
            limit,
            max_backlog,
            queued: AtomicUsize::new(0),
            policy,
            call_timeout: None,
        }
    }

    /// Bound the whole call (queueing plus every attempt) by `limit`.
    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = Some(limit);
        self
    }

    pub fn from_config(config: &GateConfig) -> anyhow::Result<Self> {
        let gate = Self::new(
            config.max_concurrency,
            config.max_backlog,
            config.retry_policy()?,
        );
        Ok(match config.call_timeout() {
            Some(limit) => gate.with_call_timeout(limit),
            None => gate,
        })
    }

    /// Run `op` through the gate. `op` receives the 1-based attempt number of
    /// this logical call.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, GateError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.admit_and_run(op))
                .await
                .unwrap_or_else(|_| {
                    tracing::warn!(timeout = ?limit, "guarded call timed out");
                    Err(GateError::TimedOut(limit))
                }),
            None => self.admit_and_run(op).await,
        }
    }

    async fn admit_and_run<T, F, Fut>(&self, op: F) -> Result<T, GateError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let _permit = self.admit().await?;
        self.run_with_retries(op).await
    }

    async fn admit(&self) -> Result<SemaphorePermit<'_>, GateError> {
        match self.permits.try_acquire() {
            Ok(permit) => return Ok(permit),
            Err(TryAcquireError::Closed) => return Err(GateError::Closed),
            Err(TryAcquireError::NoPermits) => {}
        }

        let waiting = self.queued.fetch_add(1, Ordering::SeqCst) + 1;
        let _position = QueuePosition(&self.queued);
        if waiting > self.max_backlog {
            tracing::warn!(
                limit = self.limit,
                backlog = self.max_backlog,
                "gate saturated, rejecting call"
            );
            return Err(GateError::CapacityExceeded {
                limit: self.limit,
                backlog: self.max_backlog,
            });
        }

        tracing::debug!(queued = waiting, "waiting for a gate slot");
        self.permits.acquire().await.map_err(|_| GateError::Closed)
    }

    async fn run_with_retries<T, F, Fut>(&self, mut op: F) -> Result<T, GateError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempts = attempt, "guarded call recovered");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt <= self.policy.max_retries => {
                    tracing::warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        error = %err,
                        "guarded call failed, retrying"
                    );
                    let delay = self.policy.backoff.delay_for_attempt(attempt - 1);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    return Err(GateError::Upstream {
                        attempts: attempt,
                        source: err,
                    })
                }
            }
        }
    }

    /// Stop admitting calls. Queued callers fail with [`GateError::Closed`];
    /// calls already admitted run to completion.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    /// Calls waiting for a slot.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}
