use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use super::form::FormError;
use crate::core::ConversionError;

/// Request-time failures, rendered as plain text bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("Invalid number format: {0}")]
    InvalidNumberFormat(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Form(_) | ApiError::InvalidNumberFormat(_) | ApiError::InvalidCurrency(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ConversionError> for ApiError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::InvalidCurrency(code) => ApiError::InvalidCurrency(code),
            ConversionError::InvalidAmount(text) => ApiError::InvalidNumberFormat(text),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!(error = ?e, "Request failed");
        }
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            ApiError::from(FormError::MissingField("amount".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ConversionError::InvalidCurrency("XYZ".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_do_not_leak_internal_details() {
        let err = ApiError::Internal(anyhow::anyhow!("lock poisoned at 0xdeadbeef"));
        assert_eq!(err.to_string(), "Internal server error");

        let err = ApiError::from(ConversionError::InvalidAmount("abc".to_string()));
        assert_eq!(err.to_string(), "Invalid number format: abc");
    }
}
