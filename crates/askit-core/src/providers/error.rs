//! Provider error types

use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request could not be started
    #[error("{provider} request failed: {message}")]
    Request { provider: String, message: String },

    /// The response stream broke after it started
    #[error("{provider} stream error: {message}")]
    Stream { provider: String, message: String },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// The transcript could not be expressed for this provider
    #[error("Invalid request for {provider}: {message}")]
    InvalidRequest { provider: String, message: String },

    /// Invalid response from provider
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn stream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn invalid_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_failures_surface_as_request_errors() {
        let err = ProviderError::request("openai", "HTTP 503 Service Unavailable");
        assert_eq!(err.to_string(), "openai request failed: HTTP 503 Service Unavailable");
        assert!(!err.is_cancelled());

        let err = ProviderError::stream("anthropic", "connection reset");
        assert_eq!(err.to_string(), "anthropic stream error: connection reset");
    }

    #[test]
    fn test_json_errors_convert() {
        fn parse(raw: &str) -> ProviderResult<serde_json::Value> {
            Ok(serde_json::from_str(raw)?)
        }
        let err = parse("{").unwrap_err();
        assert!(matches!(err, ProviderError::Json(_)));
        assert!(ProviderError::Cancelled.is_cancelled());
    }
}
