//! API handlers and shared utilities for marquee.
//!
//! The `auth` module is the security core; the rest are resource handlers
//! over the catalog tables, all gated through `auth::require_auth` where a
//! caller identity is needed.

pub mod auth;
pub mod favorites;
pub mod health;
pub mod me;
pub mod movies;
pub mod reviews;
pub mod root;

use std::time::SystemTime;

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

/// Unix seconds for token issuance and verification.
pub(crate) fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// First page is 1; anything below is clamped up.
pub(crate) fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Page size bounded to 1..=100, default 20.
pub(crate) fn clamp_per_page(per_page: Option<i64>) -> i64 {
    per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_unix_seconds_is_positive() {
        assert!(now_unix_seconds() > 0);
    }

    #[test]
    fn page_clamping() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(clamp_page(Some(7)), 7);
    }

    #[test]
    fn per_page_clamping() {
        assert_eq!(clamp_per_page(None), 20);
        assert_eq!(clamp_per_page(Some(0)), 1);
        assert_eq!(clamp_per_page(Some(1000)), 100);
        assert_eq!(clamp_per_page(Some(50)), 50);
    }
}
