//! Login endpoint: the one place that mutates lockout state.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::error::AuthError;
use super::hasher::verify_password;
use super::lockout::{LockStatus, SecurityCounters};
use super::storage::{
    clear_elapsed_lock, clear_failed_attempts, find_for_login, record_failed_attempt,
};
use super::token::TokenSigner;
use super::types::{AuthErrorBody, LoginRequest, LoginResponse, Profile};
use super::utils::{normalize_email, valid_email};
use crate::api::handlers::now_unix_seconds;

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid credentials or account locked", body = AuthErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    signer: Extension<Arc<TokenSigner>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }
    if request.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing password".to_string()).into_response();
    }

    let row = match find_for_login(&pool, &email).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            // Same answer as a wrong password; account existence must not leak.
            debug!("login for unknown email");
            return AuthError::InvalidCredentials.into_response();
        }
        Err(err) => {
            error!("Login lookup failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response();
        }
    };

    // Elapsed locks are cleared before both the lock check and the
    // password check; an elapsed lock only resets counters, it never
    // grants access by itself.
    let mut counters = row.counters;
    match counters.status(row.now_unix) {
        LockStatus::Elapsed => {
            if let Err(err) = clear_elapsed_lock(&pool, row.id).await {
                error!("Failed to clear elapsed lock: {err}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Login failed".to_string(),
                )
                    .into_response();
            }
            counters = SecurityCounters::clean();
        }
        LockStatus::Locked {
            retry_after_seconds,
        } => {
            debug!(account_id = %row.id, "login rejected while locked");
            return AuthError::AccountLocked {
                retry_after_seconds,
            }
            .into_response();
        }
        LockStatus::Open => {}
    }

    if !verify_password(&request.password, &row.password_hash) {
        match record_failed_attempt(&pool, row.id).await {
            Ok(updated) => {
                if matches!(updated.status(row.now_unix), LockStatus::Locked { .. }) {
                    warn!(
                        account_id = %row.id,
                        failed_attempts = updated.failed_attempts,
                        "account locked after repeated login failures"
                    );
                }
            }
            // The attempt still fails even if the counter write did not land.
            Err(err) => error!("Failed to record login failure: {err}"),
        }
        return AuthError::InvalidCredentials.into_response();
    }

    if !counters.is_clean() {
        if let Err(err) = clear_failed_attempts(&pool, row.id).await {
            error!("Failed to reset login failure counters: {err}");
        }
    }

    let token = match signer.issue(&row.id.to_string(), now_unix_seconds()) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue session token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response();
        }
    };

    debug!(account_id = %row.id, "login successful");
    (
        StatusCode::OK,
        Json(LoginResponse {
            token,
            profile: Profile {
                id: row.id,
                email: row.email,
                name: row.name,
            },
        }),
    )
        .into_response()
}
