// SPDX-License-Identifier: Apache-2.0

//! HTTP-facing error type for the gateway.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use ufxray_core::XrayError;

/// An error that renders as a JSON `{ "message": ... }` body with the
/// matching HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// A 400 response for malformed or missing client input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// A 500 response for failures on our side.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<XrayError> for ApiError {
    fn from(err: XrayError) -> Self {
        let status = match &err {
            XrayError::ScanTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            XrayError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "request failed: {}", self.message);
        }
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}
