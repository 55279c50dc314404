use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bms_common::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// # Application Error
///
/// Everything a handler can fail with, mapped to a status code and a JSON body
/// of the form `{"error_type": ..., "message": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// The addressed document does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The request body is malformed or fails validation.
    #[error("{0}")]
    BadRequest(String),
    /// The request body exceeds the configured size cap.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// The acting user may not perform this operation.
    #[error("{0}")]
    Forbidden(&'static str),
    /// A stored document could not be converted.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            AppError::Store(e) => {
                log::error!("Store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "StorageError")
            }
        };
        (
            status,
            Json(json!({
                "error_type": error_type,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AppError::NotFound("Article").into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::PayloadTooLarge("too big".into()).into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(AppError::Forbidden("Admin only").into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Store(StoreError::NotAnObject).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
