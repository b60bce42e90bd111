//! Engine configuration.
//!
//! [`EngineConfig`] follows the usual pattern: `Default` for the common
//! case, `with_*` setters for tweaks, and JSON loading for hosts that keep
//! tuning in data files. Missing JSON fields fall back to the defaults.
//!
//! # Example
//!
//! ```
//! use vigor_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "catch_up_periodic": true }"#).unwrap();
//! assert!(config.catch_up_periodic);
//! assert_eq!(config.parallel_threshold, EngineConfig::default().parallel_threshold);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning knobs for the lifecycle engine and the manager's tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval used for periodic effects whose own interval is not a
    /// positive finite number.
    pub default_interval_seconds: f64,
    /// When true, a periodic record that fell several intervals behind
    /// runs once per missed interval in a single sweep, up to
    /// `max_catch_up_executions`. When false it runs
    /// at most once per sweep.
    pub catch_up_periodic: bool,
    /// Number of registered sets at which the tick sweep is spread across
    /// threads.
    pub parallel_threshold: usize,
    /// Maximum distinct stack counters kept per target.
    pub max_stack_keys_per_target: usize,
    /// Shortest periodic interval honoured; shorter requests are raised to
    /// it.
    pub min_interval_seconds: f64,
    /// Cap on catch-up executions of one periodic record in one sweep.
    /// Intervals missed beyond it are skipped.
    pub max_catch_up_executions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_interval_seconds: 1.0,
            catch_up_periodic: false,
            parallel_threshold: 64,
            max_stack_keys_per_target: 256,
            min_interval_seconds: 0.001,
            max_catch_up_executions: 64,
        }
    }
}

impl EngineConfig {
    /// Sets the fallback periodic interval.
    #[must_use]
    pub fn with_default_interval(mut self, seconds: f64) -> Self {
        self.default_interval_seconds = seconds;
        self
    }

    /// Enables or disables periodic catch-up.
    #[must_use]
    pub fn with_catch_up(mut self, enabled: bool) -> Self {
        self.catch_up_periodic = enabled;
        self
    }

    /// Sets the set count at which the tick runs in parallel.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Sets the per-target stack counter limit.
    #[must_use]
    pub fn with_max_stack_keys(mut self, limit: usize) -> Self {
        self.max_stack_keys_per_target = limit;
        self
    }

    /// Sets the shortest periodic interval.
    #[must_use]
    pub fn with_min_interval(mut self, seconds: f64) -> Self {
        self.min_interval_seconds = seconds;
        self
    }

    /// Sets the per-sweep catch-up cap.
    #[must_use]
    pub fn with_max_catch_up(mut self, executions: usize) -> Self {
        self.max_catch_up_executions = executions;
        self
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, [`ConfigError::Invalid`]
    /// for values rejected by [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_interval_seconds.is_finite() && self.default_interval_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                field: "default_interval_seconds",
                reason: format!(
                    "must be a positive number of seconds, got {}",
                    self.default_interval_seconds
                ),
            });
        }
        if self.parallel_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "parallel_threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_stack_keys_per_target == 0 {
            return Err(ConfigError::Invalid {
                field: "max_stack_keys_per_target",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.min_interval_seconds.is_finite() && self.min_interval_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                field: "min_interval_seconds",
                reason: format!(
                    "must be a positive number of seconds, got {}",
                    self.min_interval_seconds
                ),
            });
        }
        if self.max_catch_up_executions == 0 {
            return Err(ConfigError::Invalid {
                field: "max_catch_up_executions",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Interval to use for an effect that asked for `requested` seconds.
    ///
    /// Non-positive and non-finite requests get the default interval; the
    /// result is never below `min_interval_seconds`.
    #[must_use]
    pub fn effective_interval(&self, requested: f64) -> f64 {
        let interval = if requested.is_finite() && requested > 0.0 {
            requested
        } else {
            self.default_interval_seconds
        };
        interval.max(self.min_interval_seconds)
    }
}
