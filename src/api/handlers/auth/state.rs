//! Runtime configuration for the auth flows.

const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 30 * 60;

/// Configuration shared by the auth handlers.
///
/// The token lifetime and the lockout policy are fixed constants and
/// deliberately absent here; only the knobs that vary per deployment
/// live in this struct.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    reset_token_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_builders() {
        let config = AuthConfig::new("https://marquee.dev".to_string());
        assert_eq!(config.frontend_base_url(), "https://marquee.dev");
        assert_eq!(config.reset_token_ttl_seconds(), 1800);

        let config = config.with_reset_token_ttl_seconds(600);
        assert_eq!(config.reset_token_ttl_seconds(), 600);
    }
}
