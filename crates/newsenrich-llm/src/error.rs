//! Enrichment call errors

use std::time::Duration;

use thiserror::Error;

/// Failure of a single enrichment attempt.
///
/// Both variants are treated as transient by the scheduler's retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    /// The remote call failed, returned a non-success status, or replied with
    /// content that does not parse as a payload.
    #[error("service error: {0}")]
    Service(String),

    /// No reply within the per-call deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl EnrichmentError {
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Convert a reqwest error, keeping the HTTP status but not the URL.
    pub fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            return Self::Timeout(timeout);
        }
        let e = e.without_url();
        match e.status() {
            Some(status) => Self::Service(format!("HTTP {}: {e}", status.as_u16())),
            None => Self::Service(e.to_string()),
        }
    }
}
