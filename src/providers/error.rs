//! Provider error taxonomy.
//!
//! Errors fall into three classes with different handling:
//! - configuration errors (missing credentials) are fatal at construction
//!   time and never reach the retry loop;
//! - transient errors (rate limits, 5xx, timeouts) are retried and may
//!   trigger cross-provider fallback once retries are exhausted;
//! - everything else (bad request, auth failure, malformed response) is
//!   fatal and surfaces immediately without retry or fallback.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing or invalid provider credentials/endpoint. Startup-time
    /// concern; never retried.
    #[error("Provider configuration error: {0}")]
    Configuration(String),

    /// The provider returned a non-success HTTP status.
    #[error("Provider returned {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (connect, timeout, body).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned 2xx but the body was not in the expected shape.
    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Status codes that indicate a transient provider-side condition.
const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Message fragments that mark an error as transient even when no usable
/// status code is available.
const TRANSIENT_VOCABULARY: [&str; 6] = [
    "rate limit",
    "too many requests",
    "timeout",
    "timed out",
    "overloaded",
    "service unavailable",
];

/// Whether an error message matches the known transient-failure vocabulary.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_VOCABULARY.iter().any(|v| lower.contains(v))
}

impl ProviderError {
    /// HTTP status associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the retry executor may try again after this error.
    ///
    /// Retryable: 429/5xx statuses, connection errors, timeouts, and
    /// messages matching the transient vocabulary. Everything else aborts
    /// immediately without consuming further attempts.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration(_) => false,
            Self::Http { status, message } => {
                RETRYABLE_STATUS_CODES.contains(status) || is_transient_message(message)
            }
            Self::Request(e) => {
                e.is_connect()
                    || e.is_timeout()
                    || e.is_request()
                    || e.status()
                        .map(|s| RETRYABLE_STATUS_CODES.contains(&s.as_u16()))
                        .unwrap_or(false)
            }
            Self::InvalidResponse(_) => false,
        }
    }
}
