//! Test module for determinism and integration tests.
//!
//! Covers the manager, engine and providers working together:
//! - **Determinism tests**: same inputs give identical values and event
//!   streams, whether targets are swept in parallel or not
//! - **Integration tests**: effect lifecycles end to end through the
//!   manager and its sinks
//! - **Helper functions**: fixtures for sets and effects
//!
//! # Test Structure
//!
//! - `determinism.rs`: Tests that verify deterministic execution
//! - `integration.rs`: End-to-end tests through [`crate::AttributeManager`]
//! - `helpers.rs`: Test setup utilities and factory functions

mod helpers;

// Re-export for convenience
pub use helpers::*;
