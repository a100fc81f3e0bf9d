//! HTTP error responses.
//!
//! Every failing route answers with a flat JSON body:
//!
//! ```json
//! { "message": "Repository URL is required", "code": "bad_request" }
//! ```
//!
//! Codes: `bad_request` (400), `unauthorized` (401), `not_found` (404),
//! `internal` (500).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: &'static str,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

pub fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized",
        message: message.into(),
    }
}

pub fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

pub fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

/// Logs the underlying failure and hides it behind the route's generic
/// message.
pub fn internal_from(err: anyhow::Error, message: &str) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "{}", message);
    internal(message)
}

/// Parses a JSON request body, mapping any failure to `on_error`.
///
/// Routes differ in how they report an unreadable body (login answers 401,
/// most others 500), so extraction is not left to `axum::Json`.
pub fn parse_body<T: serde::de::DeserializeOwned>(
    body: &[u8],
    on_error: impl FnOnce() -> AppError,
) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "unparsable request body");
        on_error()
    })
}

/// Treats `None`, empty, and whitespace-only strings alike.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Only `None` and the empty string are missing; whitespace is kept as sent.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Presence test for loosely typed JSON fields such as ids.
///
/// `null`, `false`, `0` and `""` count as missing. Strings come back
/// unchanged, any other value as its JSON text.
pub fn truthy(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => (!s.is_empty()).then_some(s),
        Value::Number(n) => (n.as_f64() != Some(0.0)).then(|| n.to_string()),
        other => Some(other.to_string()),
    }
}
