//! HTTP error responses for malformed requests
//!
//! Pipeline failures are not errors at this layer: they travel as a
//! `success: false` result body. Only requests that never reach the
//! pipeline end up here.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid JSON body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidBody(rejection) if rejection.status().is_client_error() => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidBody(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), error = %self, "Rejected request");
        (
            status,
            Json(json!({
                "success": false,
                "error": "invalid_request",
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
