//! Registration endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use tracing::{debug, error};

use super::hasher::hash_password;
use super::storage::{insert_account, RegisterOutcome};
use super::types::{Profile, RegisterRequest};
use super::utils::{normalize_email, valid_email, valid_name, valid_password};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = Profile),
        (status = 400, description = "Validation error", body = String),
        (status = 409, description = "Email already registered", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let name = request.name.trim().to_string();
    if !valid_name(&name) {
        return (StatusCode::BAD_REQUEST, "Invalid name".to_string()).into_response();
    }

    if !valid_password(&request.password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters with a letter and a digit".to_string(),
        )
            .into_response();
    }

    // Hash before persistence; the plaintext never leaves this handler.
    let password_hash = match hash_password(&request.password) {
        Ok(digest) => digest,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response();
        }
    };

    match insert_account(&pool, &email, &name, &password_hash).await {
        Ok(RegisterOutcome::Created { id }) => {
            debug!(account_id = %id, "account created");
            (StatusCode::CREATED, Json(Profile { id, email, name })).into_response()
        }
        Ok(RegisterOutcome::Conflict) => (
            StatusCode::CONFLICT,
            "Email already registered".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Registration failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response()
        }
    }
}
