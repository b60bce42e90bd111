//! Effect duration bookkeeping.

use serde::{Deserialize, Serialize};

/// Elapsed-versus-total time of an effect, or no limit at all.
///
/// Times are seconds. An infinite duration never expires and always
/// reports full remaining percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    is_infinite: bool,
    total_time: f64,
    elapsed_time: f64,
}

impl Duration {
    /// A duration that expires after `total_time` seconds.
    ///
    /// Negative or non-finite totals are treated as zero.
    #[must_use]
    pub fn finite(total_time: f64) -> Self {
        let total_time = if total_time.is_finite() {
            total_time.max(0.0)
        } else {
            0.0
        };
        Self {
            is_infinite: false,
            total_time,
            elapsed_time: 0.0,
        }
    }

    /// A duration that never expires.
    #[must_use]
    pub const fn infinite() -> Self {
        Self {
            is_infinite: true,
            total_time: 0.0,
            elapsed_time: 0.0,
        }
    }

    /// True for a duration without a limit.
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        self.is_infinite
    }

    /// Total length in seconds (0 when infinite).
    #[must_use]
    pub const fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Seconds elapsed so far.
    #[must_use]
    pub const fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Advances elapsed time, saturating at the total.
    ///
    /// No-op for infinite durations and for negative deltas.
    pub fn update(&mut self, delta: f64) {
        if self.is_infinite || !(delta > 0.0) {
            return;
        }
        self.elapsed_time = (self.elapsed_time + delta).min(self.total_time);
    }

    /// Restarts the clock.
    pub fn reset(&mut self) {
        self.elapsed_time = 0.0;
    }

    /// True once elapsed reaches total. Never true when infinite.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        !self.is_infinite && self.elapsed_time >= self.total_time
    }

    /// Seconds left, or `None` when infinite.
    #[must_use]
    pub fn remaining_time(&self) -> Option<f64> {
        (!self.is_infinite).then(|| (self.total_time - self.elapsed_time).max(0.0))
    }

    /// Fraction of the duration still to run, in `[0, 1]`.
    #[must_use]
    pub fn remaining_percentage(&self) -> f64 {
        if self.is_infinite {
            return 1.0;
        }
        if self.total_time <= 0.0 {
            return 0.0;
        }
        (1.0 - self.elapsed_time / self.total_time).clamp(0.0, 1.0)
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::infinite()
    }
}
