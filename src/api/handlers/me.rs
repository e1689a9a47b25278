//! Account endpoints for the authenticated caller.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::auth::{
    error::AuthError,
    hasher::verify_password,
    require_auth,
    storage::{delete_account, find_password_hash},
    types::{AuthErrorBody, DeleteAccountRequest, Profile},
    TokenSigner,
};

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Profile of the authenticated caller", body = Profile),
        (status = 401, description = "Authentication failure", body = AuthErrorBody)
    ),
    tag = "account"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    signer: Extension<Arc<TokenSigner>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &signer).await {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    (
        StatusCode::OK,
        Json(Profile {
            id: principal.account_id,
            email: principal.email,
            name: principal.name,
        }),
    )
        .into_response()
}

#[utoipa::path(
    delete,
    path = "/v1/me",
    request_body = DeleteAccountRequest,
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Authentication failure or wrong password", body = AuthErrorBody)
    ),
    tag = "account"
)]
pub async fn remove(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    signer: Extension<Arc<TokenSigner>>,
    payload: Option<Json<DeleteAccountRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &signer).await {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let request: DeleteAccountRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    // Deletion re-proves the current password; a stolen token alone is
    // not enough to destroy the account.
    let stored = match find_password_hash(&pool, principal.account_id).await {
        Ok(Some(digest)) => digest,
        Ok(None) => return AuthError::AccountNotFound.into_response(),
        Err(err) => {
            error!("Failed to load password hash: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Account deletion failed".to_string(),
            )
                .into_response();
        }
    };

    if !verify_password(&request.password, &stored) {
        return AuthError::InvalidCredentials.into_response();
    }

    match delete_account(&pool, principal.account_id).await {
        Ok(true) => {
            info!(account_id = %principal.account_id, "account deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => AuthError::AccountNotFound.into_response(),
        Err(err) => {
            error!("Failed to delete account: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Account deletion failed".to_string(),
            )
                .into_response()
        }
    }
}
