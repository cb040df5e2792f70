use poem::http::StatusCode;
use poem::Error as PoemError;
use thiserror::Error;

use crate::quotes::{QuoteError, ValidationError};
use crate::webhooks::WebhookError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Quote(QuoteError::Validation(err))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Webhook(e) => e.status_code(),
            AppError::Quote(QuoteError::Validation(_)) => StatusCode::BAD_REQUEST,
            AppError::Quote(QuoteError::NoProvidersAvailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to clients. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "internal error".to_string(),
            AppError::Webhook(e) => e.public_message(),
            other => other.to_string(),
        }
    }
}

impl From<AppError> for PoemError {
    fn from(err: AppError) -> Self {
        PoemError::from_string(err.public_message(), err.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Provider, UnknownProvider};
    use crate::orders::RepositoryError;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("REF-1".to_string()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(ValidationError::EmptyBookId).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(QuoteError::NoProvidersAvailable { failures: Vec::new() }).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(WebhookError::Authentication(Provider::Lulu)).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(WebhookError::UnknownProvider(UnknownProvider("x".to_string()))).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused to db-primary:5432"));
        assert_eq!(err.public_message(), "internal error");

        let err = AppError::from(WebhookError::Repository(RepositoryError::Unavailable("lock".to_string())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn test_into_poem_error() {
        let err: PoemError = AppError::NotFound("order REF-9".to_string()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
