//! Account lockout state machine.
//!
//! The lock state of an account is derived from two persisted counters,
//! `failed_attempts` and `locked_until`; there is no explicit state column.
//! Five consecutive failures lock the account for fifteen minutes. Both
//! values are fixed policy, not per-account configuration.
//!
//! This module only decides; persistence applies the transitions through
//! atomic conditional updates in `storage` so concurrent attempts cannot
//! under-count or double-lock.

/// Consecutive failures that trigger a lock.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

/// How long a lock lasts once triggered.
pub const LOCK_DURATION_SECONDS: i64 = 15 * 60;

/// The two persisted security counters of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecurityCounters {
    pub failed_attempts: i32,
    pub locked_until_unix: Option<i64>,
}

/// Lock state derived from the counters at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockStatus {
    /// No active lock; the password check may proceed.
    Open,
    /// Lock window still running; reject before touching the password.
    Locked { retry_after_seconds: i64 },
    /// A past lock has run out. Counters must be cleared before the
    /// password is evaluated; the elapsed lock itself grants nothing.
    Elapsed,
}

impl SecurityCounters {
    /// Counters of an account with no recorded failures.
    #[must_use]
    pub const fn clean() -> Self {
        Self {
            failed_attempts: 0,
            locked_until_unix: None,
        }
    }

    /// Evaluate the lock state at `now_unix`.
    #[must_use]
    pub fn status(&self, now_unix: i64) -> LockStatus {
        match self.locked_until_unix {
            Some(until) if until > now_unix => LockStatus::Locked {
                retry_after_seconds: until - now_unix,
            },
            Some(_) => LockStatus::Elapsed,
            None => LockStatus::Open,
        }
    }

    /// Counters after one more failed password check.
    ///
    /// Increments the failure count and, when the count reaches
    /// [`MAX_FAILED_ATTEMPTS`], starts the lock window at `now_unix`.
    #[must_use]
    pub fn after_failure(&self, now_unix: i64) -> Self {
        let failed_attempts = self.failed_attempts.saturating_add(1);
        let locked_until_unix = if failed_attempts >= MAX_FAILED_ATTEMPTS {
            Some(now_unix + LOCK_DURATION_SECONDS)
        } else {
            self.locked_until_unix
        };
        Self {
            failed_attempts,
            locked_until_unix,
        }
    }

    /// True when neither counter holds anything to reset.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed_attempts == 0 && self.locked_until_unix.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn clean_counters_are_open() {
        let counters = SecurityCounters::clean();
        assert!(counters.is_clean());
        assert_eq!(counters.status(NOW), LockStatus::Open);
    }

    #[test]
    fn failures_below_threshold_stay_open() {
        let mut counters = SecurityCounters::clean();
        for expected in 1..MAX_FAILED_ATTEMPTS {
            counters = counters.after_failure(NOW);
            assert_eq!(counters.failed_attempts, expected);
            assert_eq!(counters.locked_until_unix, None);
            assert_eq!(counters.status(NOW), LockStatus::Open);
        }
    }

    #[test]
    fn fifth_failure_locks_for_fifteen_minutes() {
        let counters = SecurityCounters {
            failed_attempts: 4,
            locked_until_unix: None,
        };
        let locked = counters.after_failure(NOW);
        assert_eq!(locked.failed_attempts, 5);
        assert_eq!(locked.locked_until_unix, Some(NOW + LOCK_DURATION_SECONDS));
        assert_eq!(
            locked.status(NOW),
            LockStatus::Locked {
                retry_after_seconds: LOCK_DURATION_SECONDS
            }
        );
    }

    #[test]
    fn locked_status_reports_remaining_time() {
        let counters = SecurityCounters {
            failed_attempts: 5,
            locked_until_unix: Some(NOW + 60),
        };
        assert_eq!(
            counters.status(NOW),
            LockStatus::Locked {
                retry_after_seconds: 60
            }
        );
    }

    #[test]
    fn lock_elapses_once_window_passes() {
        let counters = SecurityCounters {
            failed_attempts: 5,
            locked_until_unix: Some(NOW + LOCK_DURATION_SECONDS),
        };
        assert_eq!(
            counters.status(NOW + LOCK_DURATION_SECONDS),
            LockStatus::Elapsed
        );
        assert_eq!(
            counters.status(NOW + LOCK_DURATION_SECONDS + 1),
            LockStatus::Elapsed
        );
    }

    #[test]
    fn failure_keeps_stale_lock_timestamp_below_threshold() {
        // A stale locked_until below the threshold is left alone; the
        // precondition reset in the login flow is what clears it.
        let counters = SecurityCounters {
            failed_attempts: 1,
            locked_until_unix: Some(NOW - 10),
        };
        let updated = counters.after_failure(NOW);
        assert_eq!(updated.failed_attempts, 2);
        assert_eq!(updated.locked_until_unix, Some(NOW - 10));
    }

    #[test]
    fn reset_returns_to_clean() {
        let counters = SecurityCounters {
            failed_attempts: 3,
            locked_until_unix: None,
        };
        assert!(!counters.is_clean());
        assert!(SecurityCounters::clean().is_clean());
    }
}
