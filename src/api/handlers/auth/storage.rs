//! Database helpers for accounts, lockout counters, and reset tokens.
//!
//! Lockout counters are mutated through single conditional UPDATE
//! statements so concurrent login attempts on the same account cannot
//! under-count or double-lock; all lock arithmetic runs on the database
//! clock.

use anyhow::{Context, Result};
use serde_json::json;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::lockout::{SecurityCounters, LOCK_DURATION_SECONDS, MAX_FAILED_ATTEMPTS};
use super::state::AuthConfig;
use super::utils::{build_reset_url, generate_reset_token, hash_reset_token, is_unique_violation};
use crate::api::mail::PASSWORD_RESET_TEMPLATE;

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub(super) enum RegisterOutcome {
    Created { id: Uuid },
    Conflict,
}

/// Outcome for a forgot-password request (always 204 to the caller).
#[derive(Debug)]
pub(super) enum ResetRequestOutcome {
    Queued,
    Noop,
}

/// Everything the login flow needs from one account row.
pub(super) struct LoginRow {
    pub(super) id: Uuid,
    pub(super) email: String,
    pub(super) name: String,
    pub(super) password_hash: String,
    pub(super) counters: SecurityCounters,
    /// Database clock at read time; lock decisions use this, not the
    /// application clock.
    pub(super) now_unix: i64,
}

/// Minimal account data resolved for an authenticated caller.
/// The password hash is deliberately not selected.
pub(crate) struct AccountRow {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) name: String,
}

pub(super) async fn find_for_login(pool: &PgPool, email: &str) -> Result<Option<LoginRow>> {
    let query = r"
        SELECT id, email, name, password_hash, failed_attempts,
               EXTRACT(EPOCH FROM locked_until)::BIGINT AS locked_until_unix,
               EXTRACT(EPOCH FROM NOW())::BIGINT AS now_unix
        FROM accounts
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account for login")?;

    Ok(row.map(|row| LoginRow {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        counters: SecurityCounters {
            failed_attempts: row.get("failed_attempts"),
            locked_until_unix: row.get("locked_until_unix"),
        },
        now_unix: row.get("now_unix"),
    }))
}

/// Clear the counters of a lock whose window has already passed.
///
/// The WHERE clause keeps this a no-op when another request cleared the
/// lock first or when a fresh lock was set in between.
pub(super) async fn clear_elapsed_lock(pool: &PgPool, account_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET failed_attempts = 0,
            locked_until = NULL,
            updated_at = NOW()
        WHERE id = $1
          AND locked_until IS NOT NULL
          AND locked_until <= NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear elapsed lock")?;
    Ok(())
}

/// Record one failed password check and lock on reaching the threshold.
///
/// Increment and conditional lock happen in one statement, so two
/// concurrent failures produce two increments and exactly one lock.
pub(super) async fn record_failed_attempt(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<SecurityCounters> {
    let query = r"
        UPDATE accounts
        SET failed_attempts = failed_attempts + 1,
            locked_until = CASE
                WHEN failed_attempts + 1 >= $2
                THEN NOW() + ($3 * INTERVAL '1 second')
                ELSE locked_until
            END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING failed_attempts,
                  EXTRACT(EPOCH FROM locked_until)::BIGINT AS locked_until_unix
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .bind(MAX_FAILED_ATTEMPTS)
        .bind(LOCK_DURATION_SECONDS)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to record failed login attempt")?;

    Ok(SecurityCounters {
        failed_attempts: row.get("failed_attempts"),
        locked_until_unix: row.get("locked_until_unix"),
    })
}

/// Reset both counters after a successful password check.
pub(super) async fn clear_failed_attempts(pool: &PgPool, account_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET failed_attempts = 0,
            locked_until = NULL,
            updated_at = NOW()
        WHERE id = $1
          AND (failed_attempts <> 0 OR locked_until IS NOT NULL)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear login failure counters")?;
    Ok(())
}

pub(super) async fn insert_account(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<RegisterOutcome> {
    let query = r"
        INSERT INTO accounts (email, name, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(RegisterOutcome::Created { id: row.get("id") }),
        Err(err) if is_unique_violation(&err) => Ok(RegisterOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

pub(crate) async fn find_account_by_id(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Option<AccountRow>> {
    let query = "SELECT id, email, name FROM accounts WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;

    Ok(row.map(|row| AccountRow {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
    }))
}

/// Fetch only the stored digest, for operations that re-prove the
/// current password.
pub(crate) async fn find_password_hash(pool: &PgPool, account_id: Uuid) -> Result<Option<String>> {
    let query = "SELECT password_hash FROM accounts WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup password hash")?;
    Ok(row.map(|row| row.get("password_hash")))
}

/// Delete an account; reviews, favorites, and reset tokens go with it
/// via foreign-key cascade.
pub(crate) async fn delete_account(pool: &PgPool, account_id: Uuid) -> Result<bool> {
    let query = "DELETE FROM accounts WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete account")?;
    Ok(result.rows_affected() > 0)
}

/// Store a reset token hash and enqueue the reset mail in one
/// transaction, so a mail is never sent for a token that was not stored.
pub(super) async fn create_reset_token(
    pool: &PgPool,
    email: &str,
    config: &AuthConfig,
) -> Result<ResetRequestOutcome> {
    let mut tx = pool.begin().await.context("begin reset transaction")?;

    let query = "SELECT id, name FROM accounts WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lookup account for reset")?;

    let Some(row) = row else {
        tx.commit().await.context("commit reset noop")?;
        return Ok(ResetRequestOutcome::Noop);
    };

    let account_id: Uuid = row.get("id");
    let name: String = row.get("name");

    let token = generate_reset_token()?;
    let token_hash = hash_reset_token(&token);

    let query = r"
        INSERT INTO password_reset_tokens (account_id, token_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(token_hash)
        .bind(config.reset_token_ttl_seconds())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert reset token")?;

    let reset_url = build_reset_url(config.frontend_base_url(), &token);
    let payload_json = json!({
        "name": name,
        "reset_url": reset_url,
    });
    let payload_text =
        serde_json::to_string(&payload_json).context("failed to serialize mail payload")?;

    let query = r"
        INSERT INTO mail_outbox (to_email, template, payload_json)
        VALUES ($1, $2, $3::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(PASSWORD_RESET_TEMPLATE)
        .bind(payload_text)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert mail outbox row")?;

    tx.commit().await.context("commit reset enqueue")?;
    Ok(ResetRequestOutcome::Queued)
}

/// Consume a reset token and write the new digest in one transaction.
///
/// The lockout counters are cleared alongside the password change; a
/// reset is a stronger proof than a login.
pub(super) async fn consume_reset_token(
    pool: &PgPool,
    token_hash: &[u8],
    new_password_hash: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin reset-consume transaction")?;

    let query = r"
        UPDATE password_reset_tokens
        SET consumed_at = NOW()
        WHERE token_hash = $1
          AND consumed_at IS NULL
          AND expires_at > NOW()
        RETURNING account_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume reset token")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(false);
    };

    let account_id: Uuid = row.get("account_id");
    let query = r"
        UPDATE accounts
        SET password_hash = $2,
            failed_attempts = 0,
            locked_until = NULL,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(new_password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    tx.commit().await.context("commit reset consume")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{RegisterOutcome, ResetRequestOutcome};

    #[test]
    fn register_outcome_debug_names() {
        let created = RegisterOutcome::Created {
            id: uuid::Uuid::nil(),
        };
        assert!(format!("{created:?}").starts_with("Created"));
        assert_eq!(format!("{:?}", RegisterOutcome::Conflict), "Conflict");
    }

    #[test]
    fn reset_outcome_debug_names() {
        assert_eq!(format!("{:?}", ResetRequestOutcome::Queued), "Queued");
        assert_eq!(format!("{:?}", ResetRequestOutcome::Noop), "Noop");
    }
}
