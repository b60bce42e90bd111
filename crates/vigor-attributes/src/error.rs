//! Error types for attribute and effect construction.
//!
//! Only configuration-time contract violations are errors. Lookup misses
//! (an attribute absent from a set, a dependency that was never added) are
//! reported through `Option` or skipped, and state-transition refusals on
//! effects are reported through `bool` returns.

use thiserror::Error;

use crate::modifier::ModifierOperation;

/// Errors raised while building registries, values, sets and modifiers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    /// A definition with the same key is already registered.
    #[error("attribute key `{key}` is already registered")]
    DuplicateKey {
        /// The offending key
        key: String,
    },

    /// A definition with the same numeric id is already registered.
    #[error("attribute id {id} is already registered")]
    DuplicateId {
        /// The offending id
        id: u32,
    },

    /// A min/max pair where min exceeds max.
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange {
        /// Requested lower bound
        min: f32,
        /// Requested upper bound
        max: f32,
    },

    /// A modifier magnitude the operation does not accept.
    #[error("invalid value {value} for {operation} modifier")]
    InvalidModifierValue {
        /// Operation being validated
        operation: ModifierOperation,
        /// Rejected magnitude
        value: f32,
    },

    /// Two values for the same definition were added to one set.
    #[error("attribute `{key}` appears more than once in the set")]
    DuplicateAttribute {
        /// Key of the repeated definition
        key: String,
    },

    /// The dependency graph of a set contains a cycle.
    #[error("dependency cycle between attributes: {}", keys.join(" -> "))]
    DependencyCycle {
        /// Keys of the attributes caught in the cycle, in registration order
        keys: Vec<String>,
    },
}

/// Convenience alias for results carrying an [`AttributeError`].
pub type AttributeResult<T> = Result<T, AttributeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = AttributeError::DuplicateKey {
            key: "Character.Health".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "attribute key `Character.Health` is already registered"
        );

        let err = AttributeError::InvalidModifierValue {
            operation: ModifierOperation::Percentage,
            value: 1500.0,
        };
        assert_eq!(err.to_string(), "invalid value 1500 for Percentage modifier");
    }

    #[test]
    fn cycle_message_joins_keys() {
        let err = AttributeError::DependencyCycle {
            keys: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(err.to_string(), "dependency cycle between attributes: A -> B");
    }
}
