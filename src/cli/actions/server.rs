use crate::api::{
    self,
    handlers::auth::{AuthConfig, TokenSigner},
    mail::MailWorkerConfig,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: SecretString,
    pub frontend_base_url: String,
    pub reset_token_ttl_seconds: i64,
    pub outbox_poll_seconds: u64,
    pub outbox_batch_size: usize,
    pub outbox_max_attempts: u32,
    pub outbox_backoff_base_seconds: u64,
    pub outbox_backoff_max_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the signing secret is unusable or the server
/// fails to start. A bad secret aborts here, before any socket is bound.
pub async fn execute(args: Args) -> Result<()> {
    let signer =
        TokenSigner::new(&args.token_secret).context("invalid MARQUEE_TOKEN_SECRET")?;

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_reset_token_ttl_seconds(args.reset_token_ttl_seconds);

    let mail_config = MailWorkerConfig::new()
        .with_poll_interval_seconds(args.outbox_poll_seconds)
        .with_batch_size(args.outbox_batch_size)
        .with_max_attempts(args.outbox_max_attempts)
        .with_backoff_base_seconds(args.outbox_backoff_base_seconds)
        .with_backoff_max_seconds(args.outbox_backoff_max_seconds);

    api::new(args.port, args.dsn, Arc::new(signer), auth_config, mail_config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_redact_token_secret_in_debug() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost:5432/marquee".to_string(),
            token_secret: SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
            frontend_base_url: "http://localhost:5173".to_string(),
            reset_token_ttl_seconds: 1800,
            outbox_poll_seconds: 5,
            outbox_batch_size: 10,
            outbox_max_attempts: 5,
            outbox_backoff_base_seconds: 5,
            outbox_backoff_max_seconds: 300,
        };
        let debug = format!("{args:?}");
        assert!(!debug.contains("0123456789abcdef"));
    }
}
