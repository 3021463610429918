//! Gateway response types
//!
//! Errors are returned as `{"error": "<message>"}` with an HTTP status.
//! Write paths collapse business errors and `NotFound` into 400; read paths
//! report `NotFound` as 404. Store failures are 500 everywhere and never
//! leak their detail to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::LedgerError;

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "insufficient balance")]
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    /// Mapping for POST /transfer and POST /topup
    pub fn from_write(err: LedgerError) -> Self {
        match err {
            LedgerError::StoreFailure(_) => Self::internal(),
            other => Self::bad_request(other.to_string()),
        }
    }

    /// Mapping for GET lookups; `not_found_message` replaces the detail.
    pub fn from_read(err: LedgerError, not_found_message: &str) -> Self {
        match err {
            LedgerError::NotFound { .. } => Self::not_found(not_found_message),
            LedgerError::StoreFailure(_) => Self::internal(),
            other => Self::new(
                StatusCode::from_u16(other.http_status()).unwrap_or(StatusCode::BAD_REQUEST),
                other.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Wrap a success value
#[inline]
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(data))
}
