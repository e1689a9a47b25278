//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the server action with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, mail};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    crate::cli::commands::validate(matches).map_err(|e| anyhow::anyhow!(e))?;

    let auth_opts = auth::Options::parse(matches)?;
    let mail_opts = mail::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        token_secret: auth_opts.token_secret,
        frontend_base_url: auth_opts.frontend_base_url,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        outbox_poll_seconds: mail_opts.poll_seconds,
        outbox_batch_size: mail_opts.batch_size,
        outbox_max_attempts: mail_opts.max_attempts,
        outbox_backoff_base_seconds: mail_opts.backoff_base_seconds,
        outbox_backoff_max_seconds: mail_opts.backoff_max_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_matches() {
        temp_env::with_vars(
            [
                ("MARQUEE_PORT", Some("9090")),
                ("MARQUEE_DSN", Some("postgres://localhost:5432/marquee")),
                (
                    "MARQUEE_TOKEN_SECRET",
                    Some("0123456789abcdef0123456789abcdef"),
                ),
                ("MARQUEE_RESET_TOKEN_TTL_SECONDS", Some("600")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["marquee"]);
                let action = handler(&matches).expect("server action");
                let Action::Server(args) = action;
                assert_eq!(args.port, 9090);
                assert_eq!(args.dsn, "postgres://localhost:5432/marquee");
                assert_eq!(
                    args.token_secret.expose_secret(),
                    "0123456789abcdef0123456789abcdef"
                );
                assert_eq!(args.reset_token_ttl_seconds, 600);
                assert_eq!(args.outbox_poll_seconds, 5);
                assert_eq!(args.outbox_batch_size, 10);
            },
        );
    }

    #[test]
    fn short_secret_is_rejected() {
        temp_env::with_vars(
            [
                ("MARQUEE_DSN", Some("postgres://localhost:5432/marquee")),
                ("MARQUEE_TOKEN_SECRET", Some("too-short")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["marquee"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("--token-secret"));
                }
            },
        );
    }
}
