//! Error taxonomy for guarded upstream calls.
//!
//! [`UpstreamError`] classifies a single failed attempt as retryable or fatal.
//! [`GateError`] is what a caller of the [`Gate`](crate::gate::Gate) sees once
//! admission and the retry budget have been applied.

use std::time::Duration;

/// Failure of one invocation of a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Transient failure. The gate re-invokes the operation while budget remains.
    #[error("transient upstream failure: {0}")]
    Retryable(String),
    /// Anything not marked retryable. Propagated without retry.
    #[error("upstream failure: {0}")]
    Fatal(String),
}

impl UpstreamError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Retryable(m) | Self::Fatal(m) => m,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        let server_side = err.status().is_some_and(|s| s.is_server_error());
        if err.is_timeout() || err.is_connect() || server_side {
            Self::Retryable(err.to_string())
        } else {
            Self::Fatal(err.to_string())
        }
    }
}

/// Outcome of a call through the gate that did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Every slot is busy and the backlog is full.
    #[error("capacity exceeded: {limit} calls in flight and {backlog} queued")]
    CapacityExceeded { limit: usize, backlog: usize },
    /// The guarded operation failed with a fatal error, or kept failing until
    /// the retry budget ran out. `source` is the last error observed.
    #[error("{source} (after {attempts} attempt(s))")]
    Upstream {
        attempts: u32,
        #[source]
        source: UpstreamError,
    },
    #[error("call timed out after {0:?}")]
    TimedOut(Duration),
    #[error("gate is closed")]
    Closed,
}

impl GateError {
    /// The last upstream error, if the call got far enough to make one.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            Self::Upstream { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(UpstreamError::retryable("oops").is_retryable());
        assert!(!UpstreamError::fatal("bad payload").is_retryable());
        assert_eq!(UpstreamError::retryable("oops").message(), "oops");
    }

    #[test]
    fn gate_error_display_carries_attempts() {
        let err = GateError::Upstream {
            attempts: 6,
            source: UpstreamError::retryable("oops"),
        };
        assert_eq!(err.to_string(), "transient upstream failure: oops (after 6 attempt(s))");
        assert_eq!(err.upstream(), Some(&UpstreamError::retryable("oops")));
        assert!(GateError::Closed.upstream().is_none());
    }
}
