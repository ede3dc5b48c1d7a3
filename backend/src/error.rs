use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Stable, machine-readable error codes returned in every error body.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const STORAGE_FAILURE: &str = "STORAGE_FAILURE";
}

/// Error type shared by the stores, the services and the HTTP handlers.
///
/// Rendered as `{"success": false, "code": "NOT_FOUND", "error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing product id or hero/subpage index. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Wrong MIME type, missing or malformed field. HTTP 400.
    #[error("{0}")]
    InvalidInput(String),

    /// Bad, missing or expired session token, or bad credentials. HTTP 401.
    #[error("{0}")]
    Unauthorized(String),

    /// I/O or (de)serialization failure on a document. HTTP 500.
    #[error("{0}")]
    StorageFailure(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => error_code::NOT_FOUND,
            ApiError::InvalidInput(_) => error_code::INVALID_INPUT,
            ApiError::Unauthorized(_) => error_code::UNAUTHORIZED,
            ApiError::StorageFailure(_) => error_code::STORAGE_FAILURE,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::StorageFailure(msg) = self {
            tracing::error!(error = %msg, "storage failure");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "code": self.error_code(),
            "error": self.to_string(),
        }))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::StorageFailure(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::StorageFailure(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for ApiError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        ApiError::InvalidInput(format!("malformed multipart body: {}", err))
    }
}
