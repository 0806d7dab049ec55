use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Every failure a handler can return. Rendered as `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Capacity(String),

    #[error("File too large. Max limit is {0}MB.")]
    PayloadTooLarge(usize),

    #[error("{0}")]
    ExternalService(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Capacity(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Authorization(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Internal(e) = &self {
            tracing::error!(error = ?e, "internal error");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Converts a JSON body rejection. A body cut off by the size limit gets the
/// same 413 payload as an oversized upload.
pub fn json_error(rejection: JsonRejection, max_upload_mb: usize) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(max_upload_mb)
    } else {
        AppError::Validation(rejection.body_text())
    }
}

/// Converts a multipart read failure, keeping the body-limit case distinct.
pub fn multipart_error(err: MultipartError, max_upload_mb: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(max_upload_mb)
    } else {
        AppError::Validation(err.body_text())
    }
}

/// Parses a path id; anything that is not a UUID cannot name a record, so
/// it is reported the same way as a missing one.
pub fn parse_id(raw: &str, not_found: &str) -> Result<uuid::Uuid, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::not_found(not_found))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn every_variant_renders_an_error_field() {
        let cases = vec![
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::Authentication("nope".into()), StatusCode::UNAUTHORIZED),
            (AppError::forbidden("vendors only"), StatusCode::FORBIDDEN),
            (AppError::not_found("Event not found"), StatusCode::NOT_FOUND),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AppError::Capacity("full".into()), StatusCode::BAD_REQUEST),
            (AppError::PayloadTooLarge(100), StatusCode::PAYLOAD_TOO_LARGE),
            (AppError::ExternalService("s3".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, expected) in cases {
            let (status, body) = body_json(err).await;
            assert_eq!(status, expected);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let err = AppError::from(anyhow::anyhow!("connection refused to 10.0.0.3"));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn malformed_ids_read_as_not_found() {
        assert!(matches!(parse_id("abc", "Event not found"), Err(AppError::NotFound(ref m)) if m == "Event not found"));
        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "x").unwrap(), id);
    }

    #[tokio::test]
    async fn payload_too_large_message() {
        let (_, body) = body_json(AppError::PayloadTooLarge(100)).await;
        assert_eq!(body["error"], "File too large. Max limit is 100MB.");
    }
}
