//! Mock authentication.
//!
//! Credentials are never checked: login and register hand out the
//! configured mock token. Protected routes only require that *some* bearer
//! token is present.

use axum::{extract::Request, http::header, middleware::Next, response::Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{non_empty, unauthorized, AppError};
use crate::models::User;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub user: User,
}

pub fn login(req: LoginRequest, token: &str) -> AuthResponse {
    AuthResponse {
        success: true,
        token: token.to_string(),
        user_id: None,
        user: User {
            username: req.username.unwrap_or_default(),
            email: None,
        },
    }
}

/// Returns `None` when any of username, email, or password is missing or
/// empty.
pub fn register(req: RegisterRequest, token: &str) -> Option<AuthResponse> {
    let username = non_empty(&req.username)?.to_string();
    let email = non_empty(&req.email)?.to_string();
    non_empty(&req.password)?;

    Some(AuthResponse {
        success: true,
        token: token.to_string(),
        user_id: Some(Uuid::new_v4().to_string()),
        user: User {
            username,
            email: Some(email),
        },
    })
}

/// Extracts the bearer token from an `Authorization` header value.
///
/// A missing `Bearer ` prefix is tolerated; the raw value is then taken as
/// the token.
pub fn bearer_token(header_value: Option<&str>) -> Option<&str> {
    let value = header_value?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Middleware for protected routes: 401 unless a bearer token is present.
pub async fn require_bearer(request: Request, next: Next) -> Result<Response, AppError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if bearer_token(header_value).is_none() {
        tracing::debug!(path = %request.uri().path(), "rejecting request without bearer token");
        return Err(unauthorized("Authentication required"));
    }

    Ok(next.run(request).await)
}
