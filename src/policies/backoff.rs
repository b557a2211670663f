//! # Backoff after transport errors.
//!
//! Consumer workers never give up on a transport error; they log it and pull
//! again. [`BackoffPolicy`] decides how long to pause first so a dead
//! connection does not turn into a hot loop. The pause for the `n`-th
//! consecutive error (0-indexed) is `first × factor^n`, clamped to `max`, then
//! jittered. A successful receive resets the count.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use eventlane::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(50),
//!     max: Duration::from_secs(5),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(50));
//! assert_eq!(backoff.next(3), Duration::from_millis(400));
//! assert_eq!(backoff.next(20), Duration::from_secs(5));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay schedule for consecutive transport errors.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Pause after the first error.
    pub first: Duration,
    /// Upper bound for any pause.
    pub max: Duration,
    /// Multiplicative growth per consecutive error (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 100ms`, `factor = 2.0`, `max = 10s`, equal jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Pause before retrying after `attempt` previous consecutive errors.
    ///
    /// The base is derived from the attempt number alone, so jitter never feeds
    /// back into later delays.
    pub fn next(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.unjittered(attempt))
    }

    /// `first × factor^attempt`, or `max` when that overflows, is negative or
    /// exceeds `max`.
    fn unjittered(&self, attempt: u32) -> Duration {
        let growth = self.factor.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        Duration::try_from_secs_f64(self.first.as_secs_f64() * growth)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}
