use thiserror::Error;

use crate::resilience::retry::RetryableError;

/// Failure talking to a provider's HTTP API
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Provider rejected credentials: {0}")]
    Authentication(String),

    #[error("Provider rejected request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),

    #[error("Provider did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Circuit open for {0}")]
    CircuitOpen(String),

    #[error("Provider client misconfigured: {0}")]
    Configuration(String),
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) => true,
            ProviderError::Api { status, .. } => *status >= 500 || *status == 429,
            ProviderError::Timeout(_) => true,
            ProviderError::Authentication(_)
            | ProviderError::InvalidRequest(_)
            | ProviderError::UnexpectedResponse(_)
            | ProviderError::CircuitOpen(_)
            | ProviderError::Configuration(_) => false,
        }
    }
}

impl ProviderError {
    pub fn from_status_code(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(message),
            400 | 404 | 422 => ProviderError::InvalidRequest(message),
            _ => ProviderError::Api { status, message },
        }
    }
}
