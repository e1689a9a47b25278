//! Bearer-token gate for protected routes.
//!
//! Every protected handler funnels through [`require_auth`]: extract the
//! bearer token, verify signature and expiry, then resolve the subject to
//! a live account. The gate is read-only; it never touches lock state.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::error::AuthError;
use super::storage::find_account_by_id;
use super::token::{self, TokenSigner};
use super::utils::extract_bearer_token;
use crate::api::handlers::now_unix_seconds;

/// Authenticated caller context handed to downstream handlers.
#[derive(Clone, Debug)]
pub struct Principal {
    pub account_id: Uuid,
    pub email: String,
    pub name: String,
}

/// Resolve the request's bearer token into a [`Principal`].
///
/// # Errors
///
/// Returns a ready-to-send response: 401 with a typed body for every
/// authentication failure, 500 when the account lookup itself fails.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    signer: &TokenSigner,
) -> Result<Principal, Response> {
    let Some(bearer) = extract_bearer_token(headers) else {
        return Err(AuthError::Unauthorized.into_response());
    };

    let claims = match signer.verify(&bearer, now_unix_seconds()) {
        Ok(claims) => claims,
        Err(token::Error::Expired) => return Err(AuthError::TokenExpired.into_response()),
        Err(_) => return Err(AuthError::InvalidToken.into_response()),
    };

    let Ok(account_id) = Uuid::parse_str(&claims.sub) else {
        return Err(AuthError::InvalidToken.into_response());
    };

    match find_account_by_id(pool, account_id).await {
        Ok(Some(account)) => Ok(Principal {
            account_id: account.id,
            email: account.email,
            name: account.name,
        }),
        // The token outlived its account; deleted subjects are rejected.
        Ok(None) => Err(AuthError::AccountNotFound.into_response()),
        Err(err) => {
            error!("Failed to resolve authenticated account: {err}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed").into_response())
        }
    }
}
