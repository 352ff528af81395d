//! Error types for the API server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use bulkedit_ledger::LedgerError;

/// JSON error body returned by every failing handler.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Ledger(e) => match e {
                LedgerError::InvalidInput(_) | LedgerError::SignatureInvalid => {
                    StatusCode::BAD_REQUEST
                }
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::EmailConflict { .. } => StatusCode::CONFLICT,
                LedgerError::Config(_)
                | LedgerError::Gateway(_)
                | LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Ledger(e) => match e {
                LedgerError::InvalidInput(_) => "INVALID_INPUT",
                LedgerError::NotFound(_) => "NOT_FOUND",
                LedgerError::EmailConflict { .. } => "EMAIL_CONFLICT",
                LedgerError::SignatureInvalid => "SIGNATURE_INVALID",
                LedgerError::Config(_) => "INTERNAL_ERROR",
                LedgerError::Gateway(_) | LedgerError::Database(_) => "UPSTREAM_UNAVAILABLE",
            },
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Upstream and internal failures carry detail we do not expose.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "Internal API error");
        }

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "upstream service unavailable, retry later".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn invalid_input_maps_to_400() {
        assert_eq!(
            status_of(ApiError::Ledger(LedgerError::InvalidInput("bad".into()))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            status_of(ApiError::Ledger(LedgerError::NotFound("cus_1".into()))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn email_conflict_maps_to_409() {
        let err = ApiError::Ledger(LedgerError::EmailConflict {
            email: "a@x.com".into(),
            owner: "cus_2".into(),
        });
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn signature_failure_maps_to_400() {
        assert_eq!(
            status_of(ApiError::Ledger(LedgerError::SignatureInvalid)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn config_error_maps_to_500_without_detail() {
        let err = ApiError::Ledger(LedgerError::Config("missing STRIPE_SECRET_KEY".into()));
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_code_names_the_email() {
        let err = ApiError::Ledger(LedgerError::EmailConflict {
            email: "a@x.com".into(),
            owner: "cus_2".into(),
        });
        assert_eq!(err.error_code(), "EMAIL_CONFLICT");
        assert!(err.to_string().contains("a@x.com"));
    }
}
