//! # Backoff policy for reconnect attempts.
//!
//! [`BackoffPolicy`] controls how the gap between reconnect attempts grows while
//! a link stays down. It is parameterized by:
//! - [`BackoffPolicy::initial`] the wait before the first attempt;
//! - [`BackoffPolicy::step`] the linear increment per attempt already made;
//! - [`BackoffPolicy::max`] the cap, itself clamped to [`BackoffPolicy::CEILING`].
//!
//! The wait for attempt count `n` is `min(initial + n × step, max)`. The function is
//! pure, monotonically non-decreasing in `n`, and saturates instead of overflowing.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use linkvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::default();
//!
//! assert_eq!(backoff.wait_for(0), Duration::from_secs(10));
//! assert_eq!(backoff.wait_for(1), Duration::from_secs(20));
//! // 10s + 50 × 10s = 510s → capped at max=120s
//! assert_eq!(backoff.wait_for(50), Duration::from_secs(120));
//! ```

use std::time::Duration;

/// Linear, capped backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Wait before the first attempt (`attempts == 0`).
    pub initial: Duration,
    /// Added once per attempt already made.
    pub step: Duration,
    /// Upper bound of any single wait.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `initial = 10s`;
    /// - `step = 10s`;
    /// - `max = 120s`.
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(10),
            step: Duration::from_secs(10),
            max: Duration::from_secs(120),
        }
    }
}

impl BackoffPolicy {
    /// Absolute ceiling for any wait, whatever `max` says.
    pub const CEILING: Duration = Duration::from_secs(300);

    /// Returns the effective cap: `max` clamped to [`CEILING`](Self::CEILING).
    #[inline]
    pub fn cap(&self) -> Duration {
        self.max.min(Self::CEILING)
    }

    /// Computes the wait for the given number of attempts already made.
    ///
    /// `initial + attempts × step`, clamped to [`cap`](Self::cap). Saturating
    /// arithmetic keeps huge attempt counts pinned at the cap.
    pub fn wait_for(&self, attempts: u32) -> Duration {
        let grown = self
            .step
            .checked_mul(attempts)
            .and_then(|extra| self.initial.checked_add(extra))
            .unwrap_or(Duration::MAX);
        grown.min(self.cap())
    }
}
