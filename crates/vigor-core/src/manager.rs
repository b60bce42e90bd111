//! The attribute manager: registered sets, the engine and outward events.
//!
//! [`AttributeManager`] is the thread-safe front door. It keeps every
//! registered [`AttributeSet`] together with the [`EffectEngine`] behind a
//! single mutex, so each public call is one critical section. Events
//! produced inside the section are published to the [`EventSink`] after
//! the lock is released; a failing sink is logged and otherwise ignored.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vigor_attributes::{
//!     catalog, AttributeEffect, AttributeModifier, AttributeRegistry, AttributeSet,
//!     AttributeSetId, EffectId, ModifierId, ModifierOperation,
//! };
//! use vigor_core::config::EngineConfig;
//! use vigor_core::event::EventLog;
//! use vigor_core::manager::AttributeManager;
//!
//! let registry = AttributeRegistry::with_builtin();
//! let speed = registry.get_by_key(catalog::SPEED).unwrap().clone();
//!
//! let log = Arc::new(EventLog::new());
//! let manager = AttributeManager::new(log.clone(), EngineConfig::default());
//!
//! let id = AttributeSetId::new(1);
//! manager
//!     .register_attribute_set(AttributeSet::from_entries(id, [(speed.clone(), 5.0, 0.0, 10.0)]).unwrap())
//!     .unwrap();
//!
//! let haste = AttributeEffect::timed(EffectId::new(1), "Haste", 3.0).with_modifier(
//!     AttributeModifier::new(ModifierId::new(1), speed.clone(), ModifierOperation::Add, 2.0).unwrap(),
//! );
//! assert!(manager.apply_effect(id, haste));
//! assert_eq!(manager.attribute_value(id, &speed), Some(7.0));
//!
//! manager.update_effect_durations(3.0);
//! assert_eq!(manager.attribute_value(id, &speed), Some(5.0));
//! assert!(!log.is_empty());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use vigor_attributes::{
    AttributeDefinition, AttributeEffect, AttributeSet, AttributeSetId, EffectId, EffectTags,
};

use crate::config::EngineConfig;
use crate::engine::EffectEngine;
use crate::error::ManagerError;
use crate::event::{EventSink, GameplayEvent, NullSink};
use crate::provider::DefinitionProvider;

/// Point-in-time counters across the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerStatus {
    /// Registered attribute sets
    pub registered_sets: usize,
    /// Effects stored across all targets
    pub active_effects: usize,
    /// Periodic schedules across all targets
    pub periodic_effects: usize,
    /// Modifiers held by stored effects
    pub total_modifiers: usize,
    /// Simulation time in seconds
    pub now: f64,
}

struct ManagerState {
    sets: BTreeMap<AttributeSetId, AttributeSet>,
    engine: EffectEngine,
}

/// Owner of registered sets and the effect engine.
///
/// # Thread Safety
///
/// All state sits behind one `Mutex`. Concurrent callers serialize on it;
/// no call blocks on anything but the lock itself. The sink is never
/// called while the lock is held.
pub struct AttributeManager {
    state: Mutex<ManagerState>,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for AttributeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("AttributeManager")
            .field("sets", &format!("[{} sets]", state.sets.len()))
            .field("engine", &state.engine)
            .field("sink", &"dyn EventSink")
            .finish()
    }
}

impl Default for AttributeManager {
    fn default() -> Self {
        Self::new(Arc::new(NullSink), EngineConfig::default())
    }
}

impl AttributeManager {
    /// Creates a manager publishing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>, config: EngineConfig) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                sets: BTreeMap::new(),
                engine: EffectEngine::new(config),
            }),
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, events: &[GameplayEvent]) {
        for event in events {
            if let Err(err) = self.sink.publish(event) {
                tracing::warn!(kind = %event.kind(), set = %event.set_id(), %err, "event sink failed");
            }
        }
    }

    /// Runs `f` on a registered set and the engine, then publishes what it
    /// produced. `None` if the set is not registered.
    fn with_target<R>(
        &self,
        set_id: AttributeSetId,
        f: impl FnOnce(&mut AttributeSet, &mut EffectEngine, &mut Vec<GameplayEvent>) -> R,
    ) -> Option<R> {
        let mut events = Vec::new();
        let result = {
            let mut state = self.lock();
            let ManagerState { sets, engine } = &mut *state;
            sets.get_mut(&set_id).map(|set| f(set, engine, &mut events))
        };
        self.publish(&events);
        result
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Registers a set and starts publishing its changes.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::AlreadyRegistered`] if the id is taken.
    pub fn register_attribute_set(&self, mut set: AttributeSet) -> Result<(), ManagerError> {
        let id = set.id();
        let mut state = self.lock();
        if state.sets.contains_key(&id) {
            return Err(ManagerError::AlreadyRegistered { id });
        }
        set.set_change_recording(true);
        set.take_changes();
        state.sets.insert(id, set);
        tracing::debug!(set = %id, "attribute set registered");
        Ok(())
    }

    /// Clears every effect on a set, then removes it.
    ///
    /// Returns `false` if the set was not registered.
    pub fn unregister_attribute_set(&self, set_id: AttributeSetId) -> bool {
        let mut events = Vec::new();
        let removed = {
            let mut state = self.lock();
            let ManagerState { sets, engine } = &mut *state;
            match sets.remove(&set_id) {
                Some(mut set) => {
                    engine.clear_all_effects(&mut set, &mut events);
                    true
                }
                None => false,
            }
        };
        self.publish(&events);
        if removed {
            tracing::debug!(set = %set_id, "attribute set unregistered");
        }
        removed
    }

    /// True if the set is registered.
    #[must_use]
    pub fn is_registered(&self, set_id: AttributeSetId) -> bool {
        self.lock().sets.contains_key(&set_id)
    }

    /// Registered ids, ascending.
    #[must_use]
    pub fn registered_ids(&self) -> Vec<AttributeSetId> {
        self.lock().sets.keys().copied().collect()
    }

    // -------------------------------------------------------------------------
    // Effects
    // -------------------------------------------------------------------------

    /// Applies an effect to a registered set.
    ///
    /// Returns `false` if the set is unknown or the engine refused the
    /// effect.
    pub fn apply_effect(&self, set_id: AttributeSetId, effect: AttributeEffect) -> bool {
        let applied = self
            .with_target(set_id, |set, engine, events| engine.apply_effect(set, effect, events))
            .unwrap_or(false);
        if !applied {
            tracing::debug!(set = %set_id, "effect not applied");
        }
        applied
    }

    /// Looks up an effect through `provider` and applies it.
    pub fn apply_effect_from(
        &self,
        provider: &dyn DefinitionProvider,
        set_id: AttributeSetId,
        effect_id: &str,
    ) -> bool {
        match provider.get_effect_by_id(effect_id) {
            Some(effect) => self.apply_effect(set_id, effect),
            None => {
                tracing::warn!(effect = effect_id, "provider has no such effect");
                false
            }
        }
    }

    /// Removes an effect and reverts its modifiers.
    pub fn remove_effect(&self, set_id: AttributeSetId, effect_id: EffectId) -> bool {
        self.with_target(set_id, |set, engine, events| engine.remove_effect(set, effect_id, events))
            .unwrap_or(false)
    }

    /// Restarts an effect's expiry, optionally with a new duration.
    pub fn refresh_effect(
        &self,
        set_id: AttributeSetId,
        effect_id: EffectId,
        new_duration: Option<f64>,
    ) -> bool {
        self.with_target(set_id, |_, engine, events| {
            engine.refresh_effect(set_id, effect_id, new_duration, events)
        })
        .unwrap_or(false)
    }

    /// Stops an effect's periodic re-application.
    pub fn remove_periodic_effect(&self, set_id: AttributeSetId, effect_id: EffectId) -> bool {
        self.with_target(set_id, |_, engine, events| {
            engine.remove_periodic_effect(set_id, effect_id, events)
        })
        .unwrap_or(false)
    }

    /// Stops every periodic schedule on a set.
    pub fn remove_all_periodic_effects(&self, set_id: AttributeSetId) -> usize {
        self.with_target(set_id, |_, engine, events| {
            engine.remove_all_periodic_effects(set_id, events)
        })
        .unwrap_or(0)
    }

    /// Pauses an effect.
    pub fn pause_effect(&self, set_id: AttributeSetId, effect_id: EffectId) -> bool {
        self.lock().engine.pause_effect(set_id, effect_id)
    }

    /// Resumes a paused effect.
    pub fn resume_effect(&self, set_id: AttributeSetId, effect_id: EffectId) -> bool {
        self.lock().engine.resume_effect(set_id, effect_id)
    }

    /// Clears every effect on a set and restores all values to their bases.
    pub fn reset_attribute_set(&self, set_id: AttributeSetId) -> bool {
        self.with_target(set_id, |set, engine, events| {
            engine.clear_all_effects(set, events);
            set.reset();
            events.extend(
                set.take_changes()
                    .into_iter()
                    .map(|change| GameplayEvent::from_set_change(set_id, change)),
            );
        })
        .is_some()
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Advances simulation time by `delta` seconds and sweeps every set.
    ///
    /// The single per-tick entry point; call it once per frame or fixed
    /// step.
    pub fn update_effect_durations(&self, delta: f64) {
        let events = {
            let mut state = self.lock();
            let ManagerState { sets, engine } = &mut *state;
            engine.update_effect_durations(sets, delta)
        };
        self.publish(&events);
    }

    /// Alias of [`update_effect_durations`](Self::update_effect_durations).
    pub fn advance(&self, delta: f64) {
        self.update_effect_durations(delta);
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.lock().engine.now()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Current value of an attribute on a registered set.
    #[must_use]
    pub fn attribute_value(&self, set_id: AttributeSetId, definition: &AttributeDefinition) -> Option<f32> {
        self.lock()
            .sets
            .get(&set_id)
            .and_then(|set| set.current_value(definition))
    }

    /// Detached copy of a registered set.
    #[must_use]
    pub fn snapshot(&self, set_id: AttributeSetId) -> Option<AttributeSet> {
        self.lock()
            .sets
            .get(&set_id)
            .map(|set| set.clone_with_id(set_id))
    }

    /// Runs `f` with read access to a registered set.
    pub fn with_attribute_set<R>(&self, set_id: AttributeSetId, f: impl FnOnce(&AttributeSet) -> R) -> Option<R> {
        self.lock().sets.get(&set_id).map(f)
    }

    /// Runs `f` with write access to a registered set and publishes the
    /// changes it made.
    pub fn with_attribute_set_mut<R>(
        &self,
        set_id: AttributeSetId,
        f: impl FnOnce(&mut AttributeSet) -> R,
    ) -> Option<R> {
        self.with_target(set_id, |set, _, events| {
            let result = f(set);
            events.extend(
                set.take_changes()
                    .into_iter()
                    .map(|change| GameplayEvent::from_set_change(set_id, change)),
            );
            set.set_change_recording(true);
            result
        })
    }

    /// Snapshots of the effects stored on a set.
    #[must_use]
    pub fn active_effects(&self, set_id: AttributeSetId) -> Vec<AttributeEffect> {
        self.lock().engine.active_effects(set_id)
    }

    /// True if the effect is stored on the set.
    #[must_use]
    pub fn has_effect(&self, set_id: AttributeSetId, effect_id: EffectId) -> bool {
        self.lock().engine.has_effect(set_id, effect_id)
    }

    /// `(set, effect)` pairs for stored effects carrying any of `tags`.
    #[must_use]
    pub fn find_effects_with_tag(&self, tags: EffectTags) -> Vec<(AttributeSetId, AttributeEffect)> {
        self.lock().engine.find_effects_with_tag(tags)
    }

    /// Counters across all sets.
    #[must_use]
    pub fn status(&self) -> ManagerStatus {
        let state = self.lock();
        ManagerStatus {
            registered_sets: state.sets.len(),
            active_effects: state.engine.active_effect_count(),
            periodic_effects: state.engine.periodic_effect_count(),
            total_modifiers: state.engine.modifier_count(),
            now: state.engine.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, EventLog};
    use vigor_attributes::{
        catalog, AttributeModifier, AttributeRegistry, ModifierId, ModifierOperation,
    };

    fn def(key: &str) -> AttributeDefinition {
        AttributeRegistry::with_builtin()
            .get_by_key(key)
            .unwrap()
            .clone()
    }

    fn set(raw: u64) -> AttributeSet {
        AttributeSet::from_entries(
            AttributeSetId::new(raw),
            [(def(catalog::SPEED), 5.0, 0.0, 50.0)],
        )
        .unwrap()
    }

    fn manager() -> (AttributeManager, Arc<EventLog>) {
        let log = Arc::new(EventLog::new());
        (AttributeManager::new(log.clone(), EngineConfig::default()), log)
    }

    fn haste(raw: u64) -> AttributeEffect {
        AttributeEffect::infinite(EffectId::new(raw), "Haste").with_modifier(
            AttributeModifier::new(ModifierId::new(raw), def(catalog::SPEED), ModifierOperation::Add, 3.0)
                .unwrap(),
        )
    }

    mod registration_tests {
        use super::*;

        #[test]
        fn duplicate_registration_fails() {
            let (manager, _) = manager();
            manager.register_attribute_set(set(1)).unwrap();
            assert_eq!(
                manager.register_attribute_set(set(1)),
                Err(ManagerError::AlreadyRegistered {
                    id: AttributeSetId::new(1)
                })
            );
        }

        #[test]
        fn unregister_clears_effects() {
            let (manager, log) = manager();
            manager.register_attribute_set(set(1)).unwrap();
            manager.apply_effect(AttributeSetId::new(1), haste(1));
            log.clear();

            assert!(manager.unregister_attribute_set(AttributeSetId::new(1)));
            assert!(!manager.unregister_attribute_set(AttributeSetId::new(1)));
            assert_eq!(manager.status().active_effects, 0);
            assert!(log
                .take_events()
                .iter()
                .any(|event| event.kind() == EventKind::EffectRemoved));
        }

        #[test]
        fn registered_ids_sorted() {
            let (manager, _) = manager();
            for raw in [3, 1, 2] {
                manager.register_attribute_set(set(raw)).unwrap();
            }
            assert_eq!(
                manager.registered_ids(),
                vec![AttributeSetId::new(1), AttributeSetId::new(2), AttributeSetId::new(3)]
            );
            assert!(manager.is_registered(AttributeSetId::new(2)));
        }
    }

    mod effect_tests {
        use super::*;

        #[test]
        fn unknown_set_is_a_miss() {
            let (manager, log) = manager();
            assert!(!manager.apply_effect(AttributeSetId::new(9), haste(1)));
            assert!(!manager.remove_effect(AttributeSetId::new(9), EffectId::new(1)));
            assert!(!manager.reset_attribute_set(AttributeSetId::new(9)));
            assert!(log.is_empty());
        }

        #[test]
        fn apply_publishes_change_then_applied() {
            let (manager, log) = manager();
            manager.register_attribute_set(set(1)).unwrap();
            assert!(manager.apply_effect(AttributeSetId::new(1), haste(1)));

            let kinds: Vec<EventKind> = log.take_events().iter().map(GameplayEvent::kind).collect();
            assert_eq!(kinds, vec![EventKind::AttributeChanged, EventKind::EffectApplied]);
        }

        #[test]
        fn reset_restores_bases() {
            let (manager, _) = manager();
            let id = AttributeSetId::new(1);
            manager.register_attribute_set(set(1)).unwrap();
            manager.apply_effect(id, haste(1));
            assert_eq!(manager.attribute_value(id, &def(catalog::SPEED)), Some(8.0));

            assert!(manager.reset_attribute_set(id));
            assert_eq!(manager.attribute_value(id, &def(catalog::SPEED)), Some(5.0));
            assert!(manager.active_effects(id).is_empty());
        }

        #[test]
        fn status_counts() {
            let (manager, _) = manager();
            manager.register_attribute_set(set(1)).unwrap();
            manager.register_attribute_set(set(2)).unwrap();
            manager.apply_effect(AttributeSetId::new(1), haste(1));
            manager.apply_effect(AttributeSetId::new(2), haste(2).periodic(1.0));
            manager.update_effect_durations(0.25);

            let status = manager.status();
            assert_eq!(status.registered_sets, 2);
            assert_eq!(status.active_effects, 2);
            assert_eq!(status.periodic_effects, 1);
            assert_eq!(status.total_modifiers, 2);
            assert!((status.now - 0.25).abs() < 1e-9);
        }
    }

    mod access_tests {
        use super::*;

        #[test]
        fn mutable_access_publishes_changes() {
            let (manager, log) = manager();
            let id = AttributeSetId::new(1);
            manager.register_attribute_set(set(1)).unwrap();

            let changed = manager.with_attribute_set_mut(id, |set| {
                set.set_attribute_base_value(&def(catalog::SPEED), 9.0)
            });
            assert_eq!(changed, Some(true));
            assert_eq!(log.event_count(), 1);
            assert_eq!(manager.with_attribute_set(id, AttributeSet::len), Some(1));
        }

        #[test]
        fn recording_survives_closure() {
            let (manager, log) = manager();
            let id = AttributeSetId::new(1);
            manager.register_attribute_set(set(1)).unwrap();
            manager.with_attribute_set_mut(id, |set| set.set_change_recording(false));
            log.clear();

            manager.apply_effect(id, haste(1));
            assert_eq!(log.event_count(), 2);
        }

        #[test]
        fn snapshot_is_detached() {
            let (manager, _) = manager();
            let id = AttributeSetId::new(1);
            manager.register_attribute_set(set(1)).unwrap();
            let snapshot = manager.snapshot(id).unwrap();
            manager.apply_effect(id, haste(1));

            assert_eq!(snapshot.current_value(&def(catalog::SPEED)), Some(5.0));
            assert!(!snapshot.is_recording());
        }
    }
}
