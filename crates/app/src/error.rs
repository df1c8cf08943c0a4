use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crm_core::ValidationError;
use crm_storage::{AddressError, CustomerError};

pub const CUSTOMER_NOT_FOUND: &str = "Customer Details Not Found";
pub const ADDRESS_NOT_FOUND: &str = "Customer Address Not Found";
pub const DUPLICATE_PHONE_NUMBER: &str = "Phone number already exists";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_message: String,
}

/// Failure returned by any API handler, rendered as `{"error_message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
    #[error("request timed out")]
    Timeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
            Self::Timeout => "timeout",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        counter!("api_errors_total", "kind" => kind).increment(1);
        match &self {
            Self::Internal(detail) => error!(stage = "api", kind, %detail, "request failed"),
            other => warn!(stage = "api", kind, detail = %other, "request rejected"),
        }

        let status = self.status();
        let body = ErrorBody {
            error_message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<CustomerError> for ApiError {
    fn from(err: CustomerError) -> Self {
        match err {
            CustomerError::NotFound => Self::NotFound(CUSTOMER_NOT_FOUND.to_string()),
            CustomerError::DuplicatePhoneNumber => {
                Self::Conflict(DUPLICATE_PHONE_NUMBER.to_string())
            }
            CustomerError::Database(err) => Self::Internal(format!("database error: {err}")),
        }
    }
}

impl From<AddressError> for ApiError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::NotFound => Self::NotFound(ADDRESS_NOT_FOUND.to_string()),
            AddressError::CustomerNotFound => Self::NotFound(CUSTOMER_NOT_FOUND.to_string()),
            AddressError::Database(err) => Self::Internal(format!("database error: {err}")),
        }
    }
}

/// Parses a numeric record id taken from the request path.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::Validation(format!("id must be an integer (got {raw})")))
}
