//! Effect lifecycle engine.
//!
//! The [`EffectEngine`] owns the simulation clock and the effect state of
//! every target. It applies effects to attribute sets, reverts them on
//! removal or expiry and re-applies periodic effects on schedule.
//!
//! # Tick
//!
//! [`EffectEngine::update_effect_durations`] advances the clock once and
//! sweeps every target that has something due:
//!
//! 1. **Expiry**: active effects whose expiry time has passed are reverted,
//!    their stack counter decremented and an `EffectExpired` event emitted.
//! 2. **Periodic**: expired schedules are dropped, then every due schedule
//!    re-applies its effect and emits `EffectApplied`.
//!
//! Targets are visited in ascending set id order. Above
//! [`EngineConfig::parallel_threshold`] due targets, the sweeps run on the
//! rayon pool; per-target event lists are concatenated in the same id
//! order, so the output is identical to the sequential path.
//!
//! # Events
//!
//! Every operation appends to a caller-provided `Vec<GameplayEvent>`. Value
//! changes show up only if the set records changes (see
//! [`AttributeSet::set_change_recording`]).
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use vigor_attributes::{catalog, AttributeEffect, AttributeRegistry, AttributeSet, AttributeSetId, EffectId};
//! use vigor_core::config::EngineConfig;
//! use vigor_core::engine::EffectEngine;
//!
//! let registry = AttributeRegistry::with_builtin();
//! let speed = registry.get_by_key(catalog::SPEED).unwrap().clone();
//! let id = AttributeSetId::new(1);
//!
//! let mut sets = BTreeMap::new();
//! sets.insert(id, AttributeSet::from_entries(id, [(speed, 5.0, 0.0, 10.0)]).unwrap());
//!
//! let mut engine = EffectEngine::new(EngineConfig::default());
//! let mut events = Vec::new();
//! let slow = AttributeEffect::timed(EffectId::new(1), "Slow", 2.0);
//! assert!(engine.apply_effect(sets.get_mut(&id).unwrap(), slow, &mut events));
//!
//! engine.update_effect_durations(&mut sets, 2.0);
//! assert!(!engine.has_effect(id, EffectId::new(1)));
//! ```

mod target;

use std::collections::BTreeMap;

use rayon::prelude::*;

use vigor_attributes::{AttributeEffect, AttributeSet, AttributeSetId, EffectId, EffectTags};

use crate::clock::SimClock;
use crate::config::EngineConfig;
use crate::event::GameplayEvent;

pub use target::{ActiveEffect, PeriodicEffect, StackCounter, TargetEffects};

/// Applies, tracks and retires effects for every target.
#[derive(Debug, Clone, Default)]
pub struct EffectEngine {
    clock: SimClock,
    config: EngineConfig,
    targets: BTreeMap<AttributeSetId, TargetEffects>,
}

impl EffectEngine {
    /// Creates an engine at t = 0.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            clock: SimClock::new(),
            config,
            targets: BTreeMap::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the clock.
    #[must_use]
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Current simulation time.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Advances the clock without sweeping.
    pub fn advance(&mut self, delta: f64) -> f64 {
        self.clock.advance(delta)
    }

    /// Effect state of a target, if any.
    #[must_use]
    pub fn target(&self, target_id: AttributeSetId) -> Option<&TargetEffects> {
        self.targets.get(&target_id)
    }

    /// Ids of targets with stored state, ascending.
    pub fn target_ids(&self) -> impl Iterator<Item = AttributeSetId> + '_ {
        self.targets.keys().copied()
    }

    // -------------------------------------------------------------------------
    // Application and removal
    // -------------------------------------------------------------------------

    /// Applies `effect` to `set`.
    ///
    /// Returns `false` if the effect is not active or its id is already
    /// stored on the target.
    pub fn apply_effect(
        &mut self,
        set: &mut AttributeSet,
        effect: AttributeEffect,
        events: &mut Vec<GameplayEvent>,
    ) -> bool {
        let now = self.clock.now();
        let target = self.targets.entry(set.id()).or_default();
        let applied = target.apply(set, effect, now, &self.config, events);
        self.prune(set.id());
        applied
    }

    /// Removes one effect and reverts its modifiers.
    ///
    /// Returns `false` for unknown targets and ids.
    pub fn remove_effect(
        &mut self,
        set: &mut AttributeSet,
        effect_id: EffectId,
        events: &mut Vec<GameplayEvent>,
    ) -> bool {
        let now = self.clock.now();
        let Some(target) = self.targets.get_mut(&set.id()) else {
            return false;
        };
        let removed = target.remove(set, effect_id, now, events);
        self.prune(set.id());
        removed
    }

    /// Removes every effect on `set`. Returns the number removed.
    pub fn clear_all_effects(&mut self, set: &mut AttributeSet, events: &mut Vec<GameplayEvent>) -> usize {
        let now = self.clock.now();
        self.targets
            .remove(&set.id())
            .map_or(0, |mut target| target.clear(set, now, events))
    }

    /// Restarts an effect's expiry from now.
    ///
    /// `new_duration` replaces the effect's total duration; `None` keeps it.
    pub fn refresh_effect(
        &mut self,
        target_id: AttributeSetId,
        effect_id: EffectId,
        new_duration: Option<f64>,
        events: &mut Vec<GameplayEvent>,
    ) -> bool {
        let now = self.clock.now();
        self.targets
            .get_mut(&target_id)
            .is_some_and(|target| target.refresh(target_id, effect_id, new_duration, now, events))
    }

    /// Stops an effect's periodic re-application; the effect stays active.
    pub fn remove_periodic_effect(
        &mut self,
        target_id: AttributeSetId,
        effect_id: EffectId,
        events: &mut Vec<GameplayEvent>,
    ) -> bool {
        let now = self.clock.now();
        self.targets
            .get_mut(&target_id)
            .is_some_and(|target| target.remove_periodic(target_id, effect_id, now, events))
    }

    /// Stops every periodic schedule on a target. Returns the count removed.
    pub fn remove_all_periodic_effects(
        &mut self,
        target_id: AttributeSetId,
        events: &mut Vec<GameplayEvent>,
    ) -> usize {
        let now = self.clock.now();
        self.targets
            .get_mut(&target_id)
            .map_or(0, |target| target.remove_all_periodic(target_id, now, events))
    }

    /// Pauses an active effect.
    pub fn pause_effect(&mut self, target_id: AttributeSetId, effect_id: EffectId) -> bool {
        self.targets
            .get_mut(&target_id)
            .is_some_and(|target| target.pause(effect_id))
    }

    /// Resumes a paused effect.
    pub fn resume_effect(&mut self, target_id: AttributeSetId, effect_id: EffectId) -> bool {
        self.targets
            .get_mut(&target_id)
            .is_some_and(|target| target.resume(effect_id))
    }

    /// Forgets every stored effect without reverting anything.
    pub fn clear_all(&mut self) {
        self.targets.clear();
    }

    fn prune(&mut self, target_id: AttributeSetId) {
        if self.targets.get(&target_id).is_some_and(TargetEffects::is_idle) {
            self.targets.remove(&target_id);
        }
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Runs the sweeps for one target at the current time.
    pub fn update(&mut self, set: &mut AttributeSet, events: &mut Vec<GameplayEvent>) {
        let now = self.clock.now();
        if let Some(target) = self.targets.get_mut(&set.id()) {
            if target.is_due(now) {
                target.sweep(set, now, &self.config, events);
            }
        }
        self.prune(set.id());
    }

    /// Advances the clock by `delta` and sweeps every target.
    pub fn update_effect_durations(
        &mut self,
        sets: &mut BTreeMap<AttributeSetId, AttributeSet>,
        delta: f64,
    ) -> Vec<GameplayEvent> {
        self.clock.advance(delta);
        self.sweep_all(sets)
    }

    /// Sweeps every target with something due at the current time.
    ///
    /// Targets without a matching set are left untouched.
    pub fn sweep_all(&mut self, sets: &mut BTreeMap<AttributeSetId, AttributeSet>) -> Vec<GameplayEvent> {
        let now = self.clock.now();
        let config = &self.config;
        let pairs = due_pairs(&mut self.targets, sets, now);

        let batches: Vec<Vec<GameplayEvent>> = if pairs.len() >= config.parallel_threshold {
            tracing::trace!(targets = pairs.len(), "parallel sweep");
            pairs
                .into_par_iter()
                .map(|(target, set)| {
                    let mut events = Vec::new();
                    target.sweep(set, now, config, &mut events);
                    events
                })
                .collect()
        } else {
            pairs
                .into_iter()
                .map(|(target, set)| {
                    let mut events = Vec::new();
                    target.sweep(set, now, config, &mut events);
                    events
                })
                .collect()
        };

        self.targets.retain(|_, target| !target.is_idle());
        batches.into_iter().flatten().collect()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// True if the effect is stored on the target.
    #[must_use]
    pub fn has_effect(&self, target_id: AttributeSetId, effect_id: EffectId) -> bool {
        self.targets
            .get(&target_id)
            .is_some_and(|target| target.has_effect(effect_id))
    }

    /// Snapshots of the effects stored on a target, in application order.
    #[must_use]
    pub fn active_effects(&self, target_id: AttributeSetId) -> Vec<AttributeEffect> {
        self.targets
            .get(&target_id)
            .map(|target| target.active_effects(self.now()))
            .unwrap_or_default()
    }

    /// Sweep executions of a periodic effect, `None` if not scheduled.
    #[must_use]
    pub fn periodic_executions(&self, target_id: AttributeSetId, effect_id: EffectId) -> Option<u32> {
        self.targets
            .get(&target_id)
            .and_then(|target| target.periodic_executions(effect_id))
    }

    /// Stack counter for `stack_key` on a target, 0 if none.
    #[must_use]
    pub fn stack_count(&self, target_id: AttributeSetId, stack_key: &str) -> u32 {
        self.targets
            .get(&target_id)
            .map_or(0, |target| target.stack_count(stack_key))
    }

    /// Seconds until an effect expires; infinity if it never does.
    #[must_use]
    pub fn remaining_time(&self, target_id: AttributeSetId, effect_id: EffectId) -> Option<f64> {
        self.targets
            .get(&target_id)
            .and_then(|target| target.remaining_time(effect_id, self.now()))
    }

    /// `(target, effect)` pairs for stored effects carrying any of `tags`.
    #[must_use]
    pub fn find_effects_with_tag(&self, tags: EffectTags) -> Vec<(AttributeSetId, AttributeEffect)> {
        let now = self.now();
        self.targets
            .iter()
            .flat_map(|(&id, target)| {
                target
                    .effects_with_tag(tags, now)
                    .into_iter()
                    .map(move |effect| (id, effect))
            })
            .collect()
    }

    /// Number of stored effects across all targets.
    #[must_use]
    pub fn active_effect_count(&self) -> usize {
        self.targets.values().map(|target| target.active().len()).sum()
    }

    /// Number of periodic schedules across all targets.
    #[must_use]
    pub fn periodic_effect_count(&self) -> usize {
        self.targets.values().map(|target| target.periodic().len()).sum()
    }

    /// Number of modifiers held by stored effects across all targets.
    #[must_use]
    pub fn modifier_count(&self) -> usize {
        self.targets.values().map(TargetEffects::modifier_count).sum()
    }
}

/// Pairs every due target with its set by walking both maps in id order.
fn due_pairs<'a>(
    targets: &'a mut BTreeMap<AttributeSetId, TargetEffects>,
    sets: &'a mut BTreeMap<AttributeSetId, AttributeSet>,
    now: f64,
) -> Vec<(&'a mut TargetEffects, &'a mut AttributeSet)> {
    let mut sets = sets.iter_mut().peekable();
    let mut pairs = Vec::new();
    for (id, target) in targets.iter_mut() {
        if !target.is_due(now) {
            continue;
        }
        while sets.next_if(|(set_id, _)| *set_id < id).is_some() {}
        if let Some((_, set)) = sets.next_if(|(set_id, _)| *set_id == id) {
            pairs.push((target, set));
        }
    }
    pairs
}
