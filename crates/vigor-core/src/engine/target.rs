//! Per-target effect bookkeeping.
//!
//! [`TargetEffects`] holds everything the engine knows about one attribute
//! set: the active effect records, the stack counters and the periodic
//! schedules. It also caches the earliest pending expiry and periodic
//! execution so a tick can skip targets with nothing due.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use vigor_attributes::{
    AttributeEffect, AttributeModifier, AttributeSet, AttributeSetId, Duration, EffectId,
    EffectStatus, EffectTags, EffectType, ModifierOperation, StackingType,
};

use crate::config::EngineConfig;
use crate::event::GameplayEvent;

// =============================================================================
// Records
// =============================================================================

/// An effect stored on a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    effect: AttributeEffect,
    applied_time: f64,
    expiry_time: Option<f64>,
}

impl ActiveEffect {
    /// The stored effect instance.
    #[must_use]
    pub const fn effect(&self) -> &AttributeEffect {
        &self.effect
    }

    /// Simulation time of the initial application.
    #[must_use]
    pub const fn applied_time(&self) -> f64 {
        self.applied_time
    }

    /// Simulation time at which the effect expires, `None` if never.
    #[must_use]
    pub const fn expiry_time(&self) -> Option<f64> {
        self.expiry_time
    }

    fn is_expired_at(&self, now: f64) -> bool {
        self.expiry_time.is_some_and(|expiry| expiry <= now)
    }

    /// Copy of the effect with its duration brought up to `now`.
    fn snapshot(&self, now: f64) -> AttributeEffect {
        let mut effect = self.effect.clone();
        if let Some(expiry) = self.expiry_time {
            let total = effect.duration().total_time();
            let mut duration = Duration::finite(total);
            duration.update(total - (expiry - now));
            effect.set_duration(duration);
        }
        effect
    }
}

/// Re-application schedule of a periodic effect.
///
/// The record refers to its [`ActiveEffect`] by id; removing the active
/// record always removes the schedule too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicEffect {
    effect_id: EffectId,
    expiry_time: Option<f64>,
    next_execution_time: f64,
    interval: f64,
    execution_count: u32,
}

impl PeriodicEffect {
    /// Id of the scheduled effect.
    #[must_use]
    pub const fn effect_id(&self) -> EffectId {
        self.effect_id
    }

    /// Time after which the schedule stops, `None` if never.
    #[must_use]
    pub const fn expiry_time(&self) -> Option<f64> {
        self.expiry_time
    }

    /// Time of the next re-application.
    #[must_use]
    pub const fn next_execution_time(&self) -> f64 {
        self.next_execution_time
    }

    /// Seconds between re-applications.
    #[must_use]
    pub const fn interval(&self) -> f64 {
        self.interval
    }

    /// Re-applications performed by sweeps (the initial application is not
    /// counted).
    #[must_use]
    pub const fn execution_count(&self) -> u32 {
        self.execution_count
    }

    fn is_expired_at(&self, now: f64) -> bool {
        self.expiry_time.is_some_and(|expiry| expiry <= now)
    }

    fn is_due_at(&self, now: f64) -> bool {
        self.next_execution_time <= now
            && !self
                .expiry_time
                .is_some_and(|expiry| self.next_execution_time >= expiry)
    }

    /// Moves the next execution past `now` without executing.
    fn skip_past(&mut self, now: f64) {
        let missed = ((now - self.next_execution_time) / self.interval).floor() + 1.0;
        let next = self.next_execution_time + missed * self.interval;
        self.next_execution_time = if next > now { next } else { step_up(now) };
    }

    fn next_due(&self) -> f64 {
        self.expiry_time
            .map_or(self.next_execution_time, |expiry| expiry.min(self.next_execution_time))
    }
}

/// Stack bookkeeping for one `name + effect type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackCounter {
    max_stacks: u32,
    current_stacks: u32,
}

impl StackCounter {
    /// Cap taken from the first stored application.
    #[must_use]
    pub const fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    /// Current count, never above the cap.
    #[must_use]
    pub const fn current_stacks(&self) -> u32 {
        self.current_stacks
    }
}

// =============================================================================
// TargetEffects
// =============================================================================

/// Effect state of one target attribute set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetEffects {
    active: Vec<ActiveEffect>,
    stacks: BTreeMap<String, StackCounter>,
    periodic: Vec<PeriodicEffect>,
    next_expiry: Option<f64>,
    next_periodic: Option<f64>,
}

impl TargetEffects {
    /// Active records in application order.
    #[must_use]
    pub fn active(&self) -> &[ActiveEffect] {
        &self.active
    }

    /// Periodic schedules in application order.
    #[must_use]
    pub fn periodic(&self) -> &[PeriodicEffect] {
        &self.periodic
    }

    /// Stack counters by key.
    #[must_use]
    pub const fn stacks(&self) -> &BTreeMap<String, StackCounter> {
        &self.stacks
    }

    /// Earliest expiry among active records.
    #[must_use]
    pub const fn next_expiry(&self) -> Option<f64> {
        self.next_expiry
    }

    /// Earliest periodic execution or periodic expiry.
    #[must_use]
    pub const fn next_periodic(&self) -> Option<f64> {
        self.next_periodic
    }

    /// True if a sweep at `now` has anything to do.
    #[must_use]
    pub fn is_due(&self, now: f64) -> bool {
        self.next_expiry.is_some_and(|t| t <= now) || self.next_periodic.is_some_and(|t| t <= now)
    }

    /// True if no state is left for this target.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.periodic.is_empty() && self.stacks.is_empty()
    }

    fn find(&self, effect_id: EffectId) -> Option<&ActiveEffect> {
        self.active.iter().find(|record| record.effect.id() == effect_id)
    }

    fn find_mut(&mut self, effect_id: EffectId) -> Option<&mut ActiveEffect> {
        self.active
            .iter_mut()
            .find(|record| record.effect.id() == effect_id)
    }

    // -------------------------------------------------------------------------
    // Application
    // -------------------------------------------------------------------------

    /// Applies an effect and stores it according to its type.
    ///
    /// | type | periodic | stored |
    /// |---|---|---|
    /// | Instant | any | nothing |
    /// | Duration | no | active, with expiry |
    /// | Duration | yes | active and periodic, both with expiry |
    /// | Infinite | no | active, no expiry |
    /// | Infinite | yes | active and periodic, no expiry |
    ///
    /// Refuses effects that are not active and effects whose id is already
    /// stored on this target.
    pub(crate) fn apply(
        &mut self,
        set: &mut AttributeSet,
        mut effect: AttributeEffect,
        now: f64,
        config: &EngineConfig,
        events: &mut Vec<GameplayEvent>,
    ) -> bool {
        if effect.status() != EffectStatus::Active {
            tracing::debug!(
                set = %set.id(),
                effect = %effect.id(),
                status = ?effect.status(),
                "refusing to apply inactive effect"
            );
            return false;
        }
        if self.find(effect.id()).is_some() {
            tracing::debug!(
                set = %set.id(),
                effect = %effect.id(),
                "effect id already active on target"
            );
            return false;
        }

        apply_modifiers(set, &mut effect, events);
        events.push(GameplayEvent::effect_applied(set.id(), &effect));
        tracing::debug!(
            set = %set.id(),
            effect = %effect.id(),
            name = effect.name(),
            effect_type = ?effect.effect_type(),
            periodic = effect.is_periodic(),
            "effect applied"
        );

        let expiry_time = match effect.effect_type() {
            EffectType::Instant => return true,
            EffectType::Duration => effect.duration().remaining_time().map(|left| now + left),
            EffectType::Infinite => None,
        };

        if effect.stacking_type() != StackingType::NoStack {
            self.push_stack(&effect, config);
        }
        if effect.is_periodic() {
            let interval = config.effective_interval(effect.interval_seconds());
            self.periodic.push(PeriodicEffect {
                effect_id: effect.id(),
                expiry_time,
                next_execution_time: now + interval,
                interval,
                execution_count: 0,
            });
        }
        self.active.push(ActiveEffect {
            effect,
            applied_time: now,
            expiry_time,
        });
        self.refresh_schedule();
        true
    }

    fn push_stack(&mut self, effect: &AttributeEffect, config: &EngineConfig) {
        let key = effect.stack_key();
        if let Some(counter) = self.stacks.get_mut(&key) {
            counter.current_stacks = counter
                .current_stacks
                .saturating_add(1)
                .min(counter.max_stacks);
            return;
        }
        if self.stacks.len() >= config.max_stack_keys_per_target {
            tracing::warn!(
                key = %key,
                limit = config.max_stack_keys_per_target,
                "stack counter table full, not tracking stacks for this effect"
            );
            return;
        }
        self.stacks.insert(
            key,
            StackCounter {
                max_stacks: effect.max_stacks(),
                current_stacks: 1,
            },
        );
    }

    fn pop_stack(&mut self, effect: &AttributeEffect) {
        if effect.stacking_type() == StackingType::NoStack {
            return;
        }
        if let Entry::Occupied(mut entry) = self.stacks.entry(effect.stack_key()) {
            let counter = entry.get_mut();
            counter.current_stacks = counter.current_stacks.saturating_sub(1);
            if counter.current_stacks == 0 {
                entry.remove();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Removes one effect, reverting its modifiers.
    pub(crate) fn remove(
        &mut self,
        set: &mut AttributeSet,
        effect_id: EffectId,
        now: f64,
        events: &mut Vec<GameplayEvent>,
    ) -> bool {
        let Some(index) = self
            .active
            .iter()
            .position(|record| record.effect.id() == effect_id)
        else {
            return false;
        };
        let record = self.active.remove(index);
        self.periodic.retain(|periodic| periodic.effect_id != effect_id);
        self.retire(set, &record, now, events);
        events.push(GameplayEvent::effect_removed(set.id(), &record.snapshot(now)));
        tracing::debug!(set = %set.id(), effect = %effect_id, "effect removed");
        self.refresh_schedule();
        true
    }

    /// Removes every effect, most recent first. Returns the count removed.
    pub(crate) fn clear(
        &mut self,
        set: &mut AttributeSet,
        now: f64,
        events: &mut Vec<GameplayEvent>,
    ) -> usize {
        let records = std::mem::take(&mut self.active);
        self.periodic.clear();
        let count = records.len();
        for record in records.into_iter().rev() {
            self.retire(set, &record, now, events);
            events.push(GameplayEvent::effect_removed(set.id(), &record.snapshot(now)));
        }
        self.stacks.clear();
        self.refresh_schedule();
        if count > 0 {
            tracing::debug!(set = %set.id(), count, "cleared effects");
        }
        count
    }

    fn retire(
        &mut self,
        set: &mut AttributeSet,
        record: &ActiveEffect,
        now: f64,
        events: &mut Vec<GameplayEvent>,
    ) {
        revert_modifiers(set, &record.effect, events);
        self.pop_stack(&record.effect);
        tracing::trace!(
            set = %set.id(),
            effect = %record.effect.id(),
            age = now - record.applied_time,
            "effect retired"
        );
    }

    /// Drops a periodic schedule; the active record stays.
    pub(crate) fn remove_periodic(
        &mut self,
        target_id: AttributeSetId,
        effect_id: EffectId,
        now: f64,
        events: &mut Vec<GameplayEvent>,
    ) -> bool {
        let before = self.periodic.len();
        self.periodic.retain(|periodic| periodic.effect_id != effect_id);
        if self.periodic.len() == before {
            return false;
        }
        if let Some(record) = self.find(effect_id) {
            events.push(GameplayEvent::effect_removed(target_id, &record.snapshot(now)));
        }
        self.refresh_schedule();
        true
    }

    /// Drops every periodic schedule. Returns the count removed.
    pub(crate) fn remove_all_periodic(
        &mut self,
        target_id: AttributeSetId,
        now: f64,
        events: &mut Vec<GameplayEvent>,
    ) -> usize {
        let schedules = std::mem::take(&mut self.periodic);
        for periodic in &schedules {
            if let Some(record) = self.find(periodic.effect_id) {
                events.push(GameplayEvent::effect_removed(target_id, &record.snapshot(now)));
            }
        }
        self.refresh_schedule();
        schedules.len()
    }

    // -------------------------------------------------------------------------
    // Refresh and pause
    // -------------------------------------------------------------------------

    /// Pushes an effect's expiry back to `now + duration`.
    ///
    /// `new_duration` replaces the effect's total; `None` keeps it. Infinite
    /// effects keep no expiry.
    pub(crate) fn refresh(
        &mut self,
        target_id: AttributeSetId,
        effect_id: EffectId,
        new_duration: Option<f64>,
        now: f64,
        events: &mut Vec<GameplayEvent>,
    ) -> bool {
        let Some(record) = self.find_mut(effect_id) else {
            return false;
        };

        if record.effect.effect_type() == EffectType::Infinite {
            record.expiry_time = None;
        } else {
            match new_duration {
                Some(seconds) => record.effect.set_duration(Duration::finite(seconds)),
                None => record.effect.refresh_duration(),
            }
            let duration = record.effect.duration();
            record.expiry_time = (!duration.is_infinite()).then(|| now + duration.total_time());
        }

        let expiry_time = record.expiry_time;
        let snapshot = record.snapshot(now);
        for periodic in &mut self.periodic {
            if periodic.effect_id == effect_id {
                periodic.expiry_time = expiry_time;
            }
        }

        events.push(GameplayEvent::effect_refreshed(target_id, &snapshot));
        tracing::debug!(set = %target_id, effect = %effect_id, ?expiry_time, "effect refreshed");
        self.refresh_schedule();
        true
    }

    /// Pauses an effect. Periodic re-application stops; expiry does not.
    pub(crate) fn pause(&mut self, effect_id: EffectId) -> bool {
        match self.find_mut(effect_id) {
            Some(record) if record.effect.status() == EffectStatus::Active => {
                record.effect.pause();
                true
            }
            _ => false,
        }
    }

    /// Resumes a paused effect.
    pub(crate) fn resume(&mut self, effect_id: EffectId) -> bool {
        match self.find_mut(effect_id) {
            Some(record) if record.effect.status() == EffectStatus::Paused => {
                record.effect.resume();
                true
            }
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Sweeps
    // -------------------------------------------------------------------------

    /// Runs the expiry sweep then the periodic sweep, skipping whichever
    /// has nothing due.
    pub(crate) fn sweep(
        &mut self,
        set: &mut AttributeSet,
        now: f64,
        config: &EngineConfig,
        events: &mut Vec<GameplayEvent>,
    ) {
        if self.next_expiry.is_some_and(|t| t <= now) {
            self.sweep_expired(set, now, events);
        }
        if self.next_periodic.is_some_and(|t| t <= now) {
            self.sweep_periodic(set, now, config, events);
        }
        self.refresh_schedule();
    }

    fn sweep_expired(&mut self, set: &mut AttributeSet, now: f64, events: &mut Vec<GameplayEvent>) {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|record| record.is_expired_at(now));
        self.active = kept;

        for record in expired {
            let effect_id = record.effect.id();
            self.periodic.retain(|periodic| periodic.effect_id != effect_id);
            self.retire(set, &record, now, events);
            events.push(GameplayEvent::effect_expired(set.id(), &record.snapshot(now)));
            tracing::debug!(set = %set.id(), effect = %effect_id, "effect expired");
        }
    }

    fn sweep_periodic(
        &mut self,
        set: &mut AttributeSet,
        now: f64,
        config: &EngineConfig,
        events: &mut Vec<GameplayEvent>,
    ) {
        self.periodic.retain(|periodic| {
            let expired = periodic.is_expired_at(now);
            if expired {
                tracing::trace!(effect = %periodic.effect_id, "periodic schedule expired");
            }
            !expired
        });

        for periodic in &mut self.periodic {
            let mut executions = 0;
            while periodic.is_due_at(now) {
                if executions == config.max_catch_up_executions {
                    periodic.skip_past(now);
                    tracing::warn!(
                        set = %set.id(),
                        effect = %periodic.effect_id,
                        limit = config.max_catch_up_executions,
                        "periodic catch-up limit reached, skipping missed executions"
                    );
                    break;
                }
                periodic.next_execution_time =
                    advance_schedule(periodic.next_execution_time, periodic.interval);
                executions += 1;

                let Some(record) = self
                    .active
                    .iter_mut()
                    .find(|record| record.effect.id() == periodic.effect_id)
                else {
                    break;
                };

                if record.effect.status() == EffectStatus::Paused {
                    tracing::trace!(effect = %periodic.effect_id, "periodic execution skipped while paused");
                } else {
                    apply_modifiers(set, &mut record.effect, events);
                    periodic.execution_count += 1;
                    events.push(GameplayEvent::effect_applied(set.id(), &record.snapshot(now)));
                    tracing::trace!(
                        set = %set.id(),
                        effect = %periodic.effect_id,
                        count = periodic.execution_count,
                        "periodic execution"
                    );
                }

                if !config.catch_up_periodic {
                    break;
                }
            }
        }
    }

    fn refresh_schedule(&mut self) {
        self.next_expiry = self
            .active
            .iter()
            .filter_map(ActiveEffect::expiry_time)
            .reduce(f64::min);
        self.next_periodic = self
            .periodic
            .iter()
            .map(PeriodicEffect::next_due)
            .reduce(f64::min);
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub(crate) fn has_effect(&self, effect_id: EffectId) -> bool {
        self.find(effect_id).is_some()
    }

    pub(crate) fn active_effects(&self, now: f64) -> Vec<AttributeEffect> {
        self.active.iter().map(|record| record.snapshot(now)).collect()
    }

    pub(crate) fn effects_with_tag(&self, tags: EffectTags, now: f64) -> Vec<AttributeEffect> {
        self.active
            .iter()
            .filter(|record| record.effect.has_any_tag(tags))
            .map(|record| record.snapshot(now))
            .collect()
    }

    pub(crate) fn periodic_executions(&self, effect_id: EffectId) -> Option<u32> {
        self.periodic
            .iter()
            .find(|periodic| periodic.effect_id == effect_id)
            .map(PeriodicEffect::execution_count)
    }

    pub(crate) fn stack_count(&self, key: &str) -> u32 {
        self.stacks
            .get(key)
            .map_or(0, StackCounter::current_stacks)
    }

    /// Seconds until expiry; infinity for effects that never expire.
    pub(crate) fn remaining_time(&self, effect_id: EffectId, now: f64) -> Option<f64> {
        self.find(effect_id).map(|record| {
            record
                .expiry_time
                .map_or(f64::INFINITY, |expiry| (expiry - now).max(0.0))
        })
    }

    pub(crate) fn modifier_count(&self) -> usize {
        self.active
            .iter()
            .map(|record| record.effect.modifiers().len())
            .sum()
    }
}

// =============================================================================
// Modifier application
// =============================================================================

/// Applies an effect's modifiers in execution order, then drains the set's
/// recorded changes into `events`.
///
/// A modifier whose attribute is missing from the set is skipped; the rest
/// still apply.
fn apply_modifiers(set: &mut AttributeSet, effect: &mut AttributeEffect, events: &mut Vec<GameplayEvent>) {
    let effect_id = effect.id();
    let source = effect.source().map(|source| source.attributes().clone());
    let order = effect.application_order();
    let modifiers = effect.modifiers_mut();

    for index in order {
        let target = modifiers[index].target().clone();
        if !set.set_attribute_current_value(&target, Some(&mut modifiers[index]), source.as_ref()) {
            tracing::warn!(
                set = %set.id(),
                effect = %effect_id,
                attribute = target.key(),
                "modifier targets an attribute missing from the set, skipping"
            );
        }
    }
    drain_changes(set, events);
}

/// Undoes an effect's modifiers in reverse execution order.
///
/// Each attribute is driven to `modifier.revert(current)` through the
/// set's current-value path so dependents cascade. Override modifiers
/// cannot be undone and leave the value as is.
fn revert_modifiers(set: &mut AttributeSet, effect: &AttributeEffect, events: &mut Vec<GameplayEvent>) {
    for index in effect.application_order().into_iter().rev() {
        let modifier = &effect.modifiers()[index];
        let target = modifier.target();
        let Some(current) = set.current_value(target) else {
            tracing::warn!(
                set = %set.id(),
                effect = %effect.id(),
                attribute = target.key(),
                "cannot revert modifier, attribute missing from the set"
            );
            continue;
        };

        let restored = modifier.revert(current);
        match AttributeModifier::new(modifier.id(), target.clone(), ModifierOperation::Override, restored) {
            Ok(mut restore) => {
                set.set_attribute_current_value(target, Some(&mut restore), None);
            }
            Err(err) => {
                tracing::warn!(
                    set = %set.id(),
                    effect = %effect.id(),
                    attribute = target.key(),
                    %err,
                    "cannot revert modifier"
                );
            }
        }
    }
    drain_changes(set, events);
}

/// `next + interval`, or the next representable time if the interval is
/// too small to move `next` at its magnitude.
fn advance_schedule(next: f64, interval: f64) -> f64 {
    let advanced = next + interval;
    if advanced > next {
        advanced
    } else {
        step_up(next)
    }
}

/// Smallest `f64` greater than `value`, for finite `value`.
fn step_up(value: f64) -> f64 {
    if value == 0.0 {
        f64::from_bits(1)
    } else if value > 0.0 {
        f64::from_bits(value.to_bits() + 1)
    } else {
        f64::from_bits(value.to_bits() - 1)
    }
}

fn drain_changes(set: &mut AttributeSet, events: &mut Vec<GameplayEvent>) {
    let set_id = set.id();
    events.extend(
        set.take_changes()
            .into_iter()
            .map(|change| GameplayEvent::from_set_change(set_id, change)),
    );
}
