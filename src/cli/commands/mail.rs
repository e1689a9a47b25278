use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_OUTBOX_POLL: &str = "outbox-poll-seconds";
pub const ARG_OUTBOX_BATCH: &str = "outbox-batch-size";
pub const ARG_OUTBOX_MAX_ATTEMPTS: &str = "outbox-max-attempts";
pub const ARG_OUTBOX_BACKOFF_BASE: &str = "outbox-backoff-base-seconds";
pub const ARG_OUTBOX_BACKOFF_MAX: &str = "outbox-backoff-max-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OUTBOX_POLL)
                .long(ARG_OUTBOX_POLL)
                .help("Mail outbox poll interval in seconds")
                .env("MARQUEE_OUTBOX_POLL_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_OUTBOX_BATCH)
                .long(ARG_OUTBOX_BATCH)
                .help("Mails processed per outbox batch")
                .env("MARQUEE_OUTBOX_BATCH_SIZE")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_OUTBOX_MAX_ATTEMPTS)
                .long(ARG_OUTBOX_MAX_ATTEMPTS)
                .help("Delivery attempts before a mail is parked as failed")
                .env("MARQUEE_OUTBOX_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_OUTBOX_BACKOFF_BASE)
                .long(ARG_OUTBOX_BACKOFF_BASE)
                .help("Base retry backoff in seconds")
                .env("MARQUEE_OUTBOX_BACKOFF_BASE_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_OUTBOX_BACKOFF_MAX)
                .long(ARG_OUTBOX_BACKOFF_MAX)
                .help("Maximum retry backoff in seconds")
                .env("MARQUEE_OUTBOX_BACKOFF_MAX_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub poll_seconds: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is somehow missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            poll_seconds: matches
                .get_one::<u64>(ARG_OUTBOX_POLL)
                .copied()
                .context("missing outbox poll interval")?,
            batch_size: matches
                .get_one::<usize>(ARG_OUTBOX_BATCH)
                .copied()
                .context("missing outbox batch size")?,
            max_attempts: matches
                .get_one::<u32>(ARG_OUTBOX_MAX_ATTEMPTS)
                .copied()
                .context("missing outbox max attempts")?,
            backoff_base_seconds: matches
                .get_one::<u64>(ARG_OUTBOX_BACKOFF_BASE)
                .copied()
                .context("missing outbox backoff base")?,
            backoff_max_seconds: matches
                .get_one::<u64>(ARG_OUTBOX_BACKOFF_MAX)
                .copied()
                .context("missing outbox backoff max")?,
        })
    }
}
