//! Mail outbox worker and delivery abstraction.
//!
//! The reset flow enqueues rows in `mail_outbox` inside the same
//! transaction that stores the reset-token hash, so a mail never exists
//! for a token that was not persisted. A background task polls the table,
//! locks a batch with `FOR UPDATE SKIP LOCKED`, and hands each row to a
//! [`Mailer`]. Failures are retried with exponential backoff and jitter
//! until a max-attempt threshold, then parked as `failed`.
//!
//! Delivery is fire-and-forget from the HTTP path: the forgot-password
//! response never waits on, or reveals, the outcome. The default
//! [`LogMailer`] logs instead of sending, which is what local development
//! wants.

use anyhow::{Context, Result};
use rand::Rng;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Template name used by the password reset flow.
pub(crate) const PASSWORD_RESET_TEMPLATE: &str = "password_reset";

#[derive(Clone, Debug)]
pub struct OutboxMail {
    pub to_email: String,
    pub template: String,
    pub payload_json: String,
}

/// Mail delivery abstraction used by the outbox worker.
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error to schedule a retry.
    fn send(&self, mail: &OutboxMail) -> Result<()>;
}

/// Local dev mailer that logs the payload instead of sending.
#[derive(Clone, Debug)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutboxMail) -> Result<()> {
        info!(
            to_email = %mail.to_email,
            template = %mail.template,
            payload = %mail.payload_json,
            "mail outbox send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MailWorkerConfig {
    poll_interval: Duration,
    batch_size: usize,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl MailWorkerConfig {
    /// Defaults: poll every 5s, 10 mails per batch, 5 attempts, and a
    /// 5s to 5m backoff window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.poll_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base_seconds(mut self, seconds: u64) -> Self {
        self.backoff_base = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_backoff_max_seconds(mut self, seconds: u64) -> Self {
        self.backoff_max = Duration::from_secs(seconds);
        self
    }

    /// Clamp zero or inverted settings to something workable.
    #[must_use]
    pub fn normalize(self) -> Self {
        let poll_interval = if self.poll_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.poll_interval
        };
        let batch_size = self.batch_size.max(1);
        let max_attempts = self.max_attempts.max(1);
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_secs(1)
        } else {
            self.backoff_base
        };
        let backoff_max = self.backoff_max.max(backoff_base);
        Self {
            poll_interval,
            batch_size,
            max_attempts,
            backoff_base,
            backoff_max,
        }
    }
}

impl Default for MailWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the background task that drains the mail outbox.
pub fn spawn_outbox_worker(
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    config: MailWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();

        loop {
            if let Err(err) = process_batch(&pool, mailer.as_ref(), &config).await {
                error!("mail outbox batch failed: {err}");
            }

            sleep(config.poll_interval).await;
        }
    })
}

async fn process_batch(
    pool: &PgPool,
    mailer: &dyn Mailer,
    config: &MailWorkerConfig,
) -> Result<usize> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to start mail outbox transaction")?;

    // Locked batch so several workers never double-send a row.
    let query = r"
        SELECT id, to_email, template, payload_json::text AS payload_json, attempts
        FROM mail_outbox
        WHERE status = 'pending'
          AND next_attempt_at <= NOW()
        ORDER BY next_attempt_at ASC, created_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(i64::try_from(config.batch_size).unwrap_or(1))
        .fetch_all(&mut *tx)
        .instrument(span)
        .await
        .context("failed to load mail outbox batch")?;

    if rows.is_empty() {
        tx.commit()
            .await
            .context("failed to commit empty outbox batch")?;
        return Ok(0);
    }

    let row_count = rows.len();
    for row in rows {
        let id: Uuid = row.get("id");
        let attempts: i32 = row.get("attempts");
        let attempt = u32::try_from(attempts).unwrap_or(0).saturating_add(1);
        let mail = OutboxMail {
            to_email: row.get("to_email"),
            template: row.get("template"),
            payload_json: row.get("payload_json"),
        };

        match mailer.send(&mail) {
            Ok(()) => mark_sent(&mut tx, id, attempt).await?,
            Err(err) if attempt >= config.max_attempts => {
                mark_failed(&mut tx, id, attempt, &err.to_string()).await?;
            }
            Err(err) => {
                let delay = backoff_delay(attempt, config.backoff_base, config.backoff_max);
                reschedule(&mut tx, id, attempt, &err.to_string(), delay).await?;
            }
        }
    }

    tx.commit()
        .await
        .context("failed to commit mail outbox batch")?;

    Ok(row_count)
}

async fn mark_sent(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempt: u32,
) -> Result<()> {
    let query = r"
        UPDATE mail_outbox
        SET status = 'sent',
            attempts = $2,
            last_error = NULL,
            sent_at = NOW(),
            next_attempt_at = NOW()
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(i32::try_from(attempt).unwrap_or(i32::MAX))
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to mark outbox mail sent")?;
    Ok(())
}

async fn mark_failed(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempt: u32,
    last_error: &str,
) -> Result<()> {
    let query = r"
        UPDATE mail_outbox
        SET status = 'failed',
            attempts = $2,
            last_error = $3,
            next_attempt_at = NOW()
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(i32::try_from(attempt).unwrap_or(i32::MAX))
        .bind(last_error)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to mark outbox mail failed")?;
    Ok(())
}

async fn reschedule(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempt: u32,
    last_error: &str,
    delay: Duration,
) -> Result<()> {
    let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
    let query = r"
        UPDATE mail_outbox
        SET status = 'pending',
            attempts = $2,
            last_error = $3,
            next_attempt_at = NOW() + ($4 * INTERVAL '1 millisecond')
        WHERE id = $1
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(i32::try_from(attempt).unwrap_or(i32::MAX))
        .bind(last_error)
        .bind(delay_ms)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to reschedule outbox mail")?;
    Ok(())
}

/// Exponential backoff capped at `max`, with half-window jitter.
fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max);
    let capped = delay.min(max);
    jitter(capped)
}

fn jitter(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_mailer_accepts_messages() {
        let mailer = LogMailer;
        let mail = OutboxMail {
            to_email: "viewer@example.com".to_string(),
            template: PASSWORD_RESET_TEMPLATE.to_string(),
            payload_json: "{}".to_string(),
        };
        assert!(mailer.send(&mail).is_ok());
    }

    #[test]
    fn normalize_fixes_degenerate_settings() {
        let config = MailWorkerConfig::new()
            .with_poll_interval_seconds(0)
            .with_batch_size(0)
            .with_max_attempts(0)
            .with_backoff_base_seconds(0)
            .with_backoff_max_seconds(0)
            .normalize();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert!(config.backoff_max >= config.backoff_base);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(300);

        // Jitter keeps each delay within (half, full] of the raw value.
        let first = backoff_delay(1, base, max);
        assert!(first >= Duration::from_millis(2500));
        assert!(first <= base);

        let fourth = backoff_delay(4, base, max);
        assert!(fourth >= Duration::from_secs(20));
        assert!(fourth <= Duration::from_secs(40));

        let huge = backoff_delay(30, base, max);
        assert!(huge <= max);
    }

    #[test]
    fn jitter_passes_tiny_delays_through() {
        assert_eq!(jitter(Duration::from_millis(1)), Duration::from_millis(1));
    }
}
