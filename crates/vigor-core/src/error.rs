//! Error types for the runtime layer.

use thiserror::Error;

use vigor_attributes::AttributeSetId;

/// Errors returned by [`AttributeManager`](crate::manager::AttributeManager).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// A set with this id is already registered.
    #[error("attribute set {id} is already registered")]
    AlreadyRegistered {
        /// The id that collided
        id: AttributeSetId,
    },
}

/// Failure reported by an [`EventSink`](crate::event::EventSink).
///
/// The manager logs these and carries on; they never reach its callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The receiving end is gone.
    #[error("event receiver disconnected")]
    Disconnected,
    /// The sink refused the event.
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Errors raised while loading or validating an
/// [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field holds a value the engine cannot run with.
    #[error("invalid engine config field `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
