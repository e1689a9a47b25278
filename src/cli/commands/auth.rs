use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_RESET_TOKEN_TTL: &str = "reset-token-ttl-seconds";

/// Secrets shorter than this are refused at startup.
pub const TOKEN_SECRET_MIN_CHARS: usize = 32;

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("HS256 signing secret for session tokens (at least 32 characters)")
                .env("MARQUEE_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin used for CORS and password reset links")
                .env("MARQUEE_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL)
                .long(ARG_RESET_TOKEN_TTL)
                .help("Password reset token lifetime in seconds")
                .env("MARQUEE_RESET_TOKEN_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(i64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub token_secret: SecretString,
    pub frontend_base_url: String,
    pub reset_token_ttl_seconds: i64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --token-secret")?;
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .context("missing required argument: --frontend-base-url")?;
        let reset_token_ttl_seconds = matches
            .get_one::<i64>(ARG_RESET_TOKEN_TTL)
            .copied()
            .context("missing required argument: --reset-token-ttl-seconds")?;

        Ok(Self {
            token_secret: SecretString::from(token_secret),
            frontend_base_url,
            reset_token_ttl_seconds,
        })
    }
}
