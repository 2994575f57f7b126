//! Error types for the chat gateway.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling the chat endpoint.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Rate limited by the provider (HTTP 429).
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        retry_after: Duration,
        request_id: Option<String>,
    },

    /// Invalid request - permanent error, don't retry.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Model refused to answer (content policy, etc.) - permanent error.
    #[error("refused: {0}")]
    Refused(String),

    /// Provider-side failure - may be retryable.
    #[error("provider error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Provider {
        message: String,
        retryable: bool,
        status: Option<u16>,
        request_id: Option<String>,
    },

    /// Request timed out - retryable.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// HTTP/network error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error (missing API key, etc.).
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        Self::Provider {
            message: message.into(),
            retryable,
            status: None,
            request_id: None,
        }
    }

    pub fn http_status(status: u16, message: impl Into<String>, request_id: Option<String>) -> Self {
        Self::Provider {
            message: message.into(),
            retryable: status >= 500,
            status: Some(status),
            request_id,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Timeout(_) => true,
            Self::Provider { retryable, .. } => *retryable,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::InvalidRequest(_) | Self::Refused(_) | Self::Config(_) => false,
        }
    }

    /// Short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Refused(_) => "refused",
            Self::Provider { .. } => "provider_error",
            Self::Timeout(_) => "timeout",
            Self::Http(_) => "http_error",
            Self::Config(_) => "config_error",
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::RateLimited { request_id, .. } | Self::Provider { request_id, .. } => {
                request_id.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        assert!(ProviderError::http_status(503, "unavailable", None).is_retryable());
        assert!(!ProviderError::http_status(400, "bad", None).is_retryable());
        assert!(!ProviderError::config("no key").is_retryable());
    }

    #[test]
    fn display_includes_status() {
        let err = ProviderError::http_status(502, "bad gateway", Some("req-1".into()));
        assert_eq!(err.to_string(), "provider error (HTTP 502): bad gateway");
        assert_eq!(err.request_id(), Some("req-1"));
        assert_eq!(err.code(), "provider_error");
    }
}
