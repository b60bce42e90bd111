//! Test helper functions for building sets, effects and managers.
//!
//! Factory functions here keep the integration tests short and make sure
//! every test builds its fixtures the same way.

use std::sync::Arc;

use vigor_attributes::{
    catalog, AttributeDefinition, AttributeEffect, AttributeModifier, AttributeRegistry,
    AttributeSet, AttributeSetId, EffectId, ModifierId, ModifierOperation,
};

use crate::config::EngineConfig;
use crate::event::EventLog;
use crate::manager::AttributeManager;

// =============================================================================
// Logging
// =============================================================================

/// Routes `tracing` output through the test harness.
///
/// Safe to call from every test; only the first call installs a
/// subscriber.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Definitions
// =============================================================================

/// Looks up a built-in definition by key.
///
/// # Panics
///
/// Panics if `key` is not a built-in key.
pub fn def(key: &str) -> AttributeDefinition {
    AttributeRegistry::with_builtin()
        .get_by_key(key)
        .unwrap_or_else(|| panic!("unknown built-in key {key}"))
        .clone()
}

/// Current value of `key` on a registered set.
///
/// # Panics
///
/// Panics if the set is not registered or lacks the attribute.
pub fn value_of(manager: &AttributeManager, set_id: AttributeSetId, key: &str) -> f32 {
    manager
        .attribute_value(set_id, &def(key))
        .unwrap_or_else(|| panic!("{set_id} has no {key}"))
}

// =============================================================================
// Attribute Sets
// =============================================================================

/// A character with Constitution 2, so MaxHealth computes to 300.
///
/// Health starts at 300 and Speed at 10.
pub fn character_set(raw_id: u64) -> AttributeSet {
    AttributeSet::from_entries(
        AttributeSetId::new(raw_id),
        [
            (def(catalog::CONSTITUTION), 2.0, 0.0, 100.0),
            (def(catalog::MAX_HEALTH), 100.0, 0.0, 10_000.0),
            (def(catalog::HEALTH), 300.0, 0.0, 10_000.0),
            (def(catalog::SPEED), 10.0, 0.0, 1_000.0),
        ],
    )
    .expect("character fixture is valid")
}

/// A ship with 1000 hull and an empty flux pool capped at 500.
pub fn ship_set(raw_id: u64) -> AttributeSet {
    AttributeSet::from_entries(
        AttributeSetId::new(raw_id),
        [
            (def(catalog::MAX_HULL), 1_000.0, 0.0, 10_000.0),
            (def(catalog::HULL), 1_000.0, 0.0, 10_000.0),
            (def(catalog::MAX_FLUX), 500.0, 0.0, 10_000.0),
            (def(catalog::FLUX), 0.0, 0.0, 10_000.0),
        ],
    )
    .expect("ship fixture is valid")
}

// =============================================================================
// Managers
// =============================================================================

/// A manager recording into a fresh [`EventLog`], with `count` characters
/// registered under ids `1..=count`.
pub fn manager_with_characters(count: u64, config: EngineConfig) -> (AttributeManager, Arc<EventLog>) {
    let log = Arc::new(EventLog::new());
    let manager = AttributeManager::new(log.clone(), config);
    for raw in 1..=count {
        manager
            .register_attribute_set(character_set(raw))
            .expect("fresh ids register");
    }
    log.clear();
    (manager, log)
}

// =============================================================================
// Effects
// =============================================================================

/// A modifier on `key`.
///
/// # Panics
///
/// Panics if `operation` rejects `value`.
pub fn modifier(raw_id: u64, key: &str, operation: ModifierOperation, value: f32) -> AttributeModifier {
    AttributeModifier::new(ModifierId::new(raw_id), def(key), operation, value)
        .expect("fixture modifier is valid")
}

/// Instant hit removing `amount` health.
pub fn hit(raw_id: u64, amount: f32) -> AttributeEffect {
    AttributeEffect::instant(EffectId::new(raw_id), "Hit").with_modifier(modifier(
        raw_id,
        catalog::HEALTH,
        ModifierOperation::Add,
        -amount,
    ))
}

/// Timed speed buff adding `amount` for `seconds`.
pub fn haste(raw_id: u64, seconds: f64, amount: f32) -> AttributeEffect {
    AttributeEffect::timed(EffectId::new(raw_id), "Haste", seconds).with_modifier(modifier(
        raw_id,
        catalog::SPEED,
        ModifierOperation::Add,
        amount,
    ))
}

/// Poison dealing `amount` health damage every `interval` for `seconds`.
pub fn poison(raw_id: u64, seconds: f64, interval: f64, amount: f32) -> AttributeEffect {
    AttributeEffect::timed(EffectId::new(raw_id), "Poison", seconds)
        .periodic(interval)
        .with_modifier(modifier(raw_id, catalog::HEALTH, ModifierOperation::Add, -amount))
}
