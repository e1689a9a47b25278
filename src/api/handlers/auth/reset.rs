//! Password reset by email.
//!
//! The forgot-password answer is always 204 so callers cannot probe which
//! emails have accounts. The raw token only travels in the mail; the
//! database stores its hash with a short expiry.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error};

use super::hasher::hash_password;
use super::state::AuthConfig;
use super::storage::{consume_reset_token, create_reset_token, ResetRequestOutcome};
use super::types::{ForgotPasswordRequest, ResetPasswordRequest};
use super::utils::{hash_reset_token, normalize_email, valid_email, valid_password};

#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 204, description = "Reset mail queued if the account exists")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    config: Extension<Arc<AuthConfig>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let request: ForgotPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return StatusCode::NO_CONTENT.into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return StatusCode::NO_CONTENT.into_response();
    }

    match create_reset_token(&pool, &email, &config).await {
        Ok(ResetRequestOutcome::Queued) => debug!("password reset mail queued"),
        Ok(ResetRequestOutcome::Noop) => debug!("password reset for unknown email"),
        // Still 204; delivery problems must not reveal anything either.
        Err(err) => error!("Failed to enqueue password reset: {err}"),
    }

    StatusCode::NO_CONTENT.into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Invalid or expired token", body = String)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let token = request.token.trim();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing token".to_string()).into_response();
    }

    if !valid_password(&request.new_password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters with a letter and a digit".to_string(),
        )
            .into_response();
    }

    let password_hash = match hash_password(&request.new_password) {
        Ok(digest) => digest,
        Err(err) => {
            error!("Failed to hash new password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Reset failed".to_string(),
            )
                .into_response();
        }
    };

    let token_hash = hash_reset_token(token);
    match consume_reset_token(&pool, &token_hash, &password_hash).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::BAD_REQUEST, "Invalid token".to_string()).into_response(),
        Err(err) => {
            error!("Failed to consume reset token: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Reset failed".to_string(),
            )
                .into_response()
        }
    }
}
