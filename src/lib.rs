//! # Marquee (movie catalog & viewer accounts)
//!
//! `marquee` is a REST backend for a movie catalog: viewer registration
//! and login, short-lived bearer-token sessions, password reset by
//! email, and per-viewer reviews and favorites over PostgreSQL.
//!
//! ## Account security
//!
//! Login is guarded by a brute-force lockout: five consecutive failures
//! lock an account for fifteen minutes. The counters live on the account
//! row itself and are mutated only through atomic conditional updates,
//! so the lock state survives restarts and concurrent attempts cannot
//! under-count. Unknown emails and wrong passwords are answered
//! identically to keep account existence private.
//!
//! ## Sessions
//!
//! Sessions are HS256 bearer tokens with a fixed two-hour lifetime and
//! no server-side record; expiry is checked lazily at verification and
//! rotating the signing secret invalidates every outstanding token.
//! Passwords are stored as salted Argon2id digests.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
