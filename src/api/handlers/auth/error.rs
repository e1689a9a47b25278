//! Authentication failure taxonomy.
//!
//! Every variant is a terminal, user-visible failure answered as HTTP 401
//! with a machine-readable `error` code. Unknown identifier and wrong
//! password are deliberately the same variant so callers cannot probe
//! which accounts exist. Store failures are infrastructure errors (500)
//! and never appear here.

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use super::types::AuthErrorBody;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password, indistinguishable by design.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Too many recent failures; the lock window is still running.
    #[error("account locked")]
    AccountLocked { retry_after_seconds: i64 },
    /// Bearer token with a bad structure or signature.
    #[error("invalid token")]
    InvalidToken,
    /// Correctly signed token past its expiry; the client should log in
    /// again rather than treat this as tampering.
    #[error("token expired")]
    TokenExpired,
    /// Valid token whose subject no longer exists.
    #[error("account not found")]
    AccountNotFound,
    /// No credential presented at all.
    #[error("unauthorized")]
    Unauthorized,
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountLocked { .. } => "account_locked",
            Self::InvalidToken => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::AccountNotFound => "account_not_found",
            Self::Unauthorized => "unauthorized",
        }
    }

    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid email or password",
            Self::AccountLocked { .. } => "Account temporarily locked after repeated failures",
            Self::InvalidToken => "Invalid bearer token",
            Self::TokenExpired => "Session expired, sign in again",
            Self::AccountNotFound => "Account no longer exists",
            Self::Unauthorized => "Missing bearer token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let retry_after_seconds = match self {
            Self::AccountLocked {
                retry_after_seconds,
            } => Some(retry_after_seconds),
            _ => None,
        };
        let body = AuthErrorBody {
            error: self.code().to_string(),
            message: self.message().to_string(),
            retry_after_seconds,
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            AuthError::InvalidCredentials,
            AuthError::AccountLocked {
                retry_after_seconds: 60,
            },
            AuthError::InvalidToken,
            AuthError::TokenExpired,
            AuthError::AccountNotFound,
            AuthError::Unauthorized,
        ];
        let mut codes: Vec<&str> = errors.iter().map(AuthError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn locked_response_is_unauthorized() {
        let response = AuthError::AccountLocked {
            retry_after_seconds: 120,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expired_and_invalid_are_distinguishable() {
        assert_ne!(
            AuthError::TokenExpired.code(),
            AuthError::InvalidToken.code()
        );
    }
}
