//! Simulated time.
//!
//! The engine never reads the wall clock. The host advances a [`SimClock`]
//! by the elapsed time of each frame or fixed step, and every expiry and
//! periodic schedule is expressed in that clock's seconds.

use serde::{Deserialize, Serialize};

/// Monotonic simulation clock in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimClock {
    now: f64,
    ticks: u64,
}

impl SimClock {
    /// A clock at t = 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { now: 0.0, ticks: 0 }
    }

    /// Current time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Number of `advance` calls.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Moves time forward by `delta` seconds and returns the new time.
    ///
    /// Negative and non-finite deltas are ignored (time never runs
    /// backwards) but still count as a tick.
    pub fn advance(&mut self, delta: f64) -> f64 {
        if delta.is_finite() && delta >= 0.0 {
            self.now += delta;
        } else {
            tracing::warn!(delta, "ignoring invalid tick delta");
        }
        self.ticks += 1;
        self.now
    }
}
