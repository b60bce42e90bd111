//! Gameplay effects.
//!
//! An [`AttributeEffect`] bundles modifiers with the policies that decide
//! how long they last, whether they stack, and whether they re-apply on a
//! timer. Effects are plain values: the lifecycle engine takes ownership
//! of the instance it stores, so templates are copied with
//! [`AttributeEffect::instantiate`] before application.
//!
//! # State transitions
//!
//! ```text
//!            pause            resume
//!   Active ─────────▶ Paused ─────────▶ Active
//!     │ update_duration (elapsed >= total)
//!     │ remove_stack (stacks reach 0)
//!     ▼
//!   Expired            cancel (from any state) ─▶ Cancelled
//! ```
//!
//! Refused transitions (stacking a `NoStack` effect, pausing a paused one)
//! return `false` or do nothing; they never panic.
//!
//! # Example
//!
//! ```
//! use vigor_attributes::catalog;
//! use vigor_attributes::definition::AttributeRegistry;
//! use vigor_attributes::effect::{AttributeEffect, EffectTags, StackingType};
//! use vigor_attributes::ids::{EffectId, ModifierId};
//! use vigor_attributes::modifier::{AttributeModifier, ModifierOperation};
//!
//! let registry = AttributeRegistry::with_builtin();
//! let speed = registry.get_by_key(catalog::SPEED).unwrap().clone();
//!
//! let mut haste = AttributeEffect::timed(EffectId::new(1), "Haste", 5.0)
//!     .with_modifier(AttributeModifier::new(ModifierId::new(1), speed, ModifierOperation::Percentage, 30.0).unwrap())
//!     .with_tags(EffectTags::MAGICAL | EffectTags::TEMPORARY)
//!     .with_stacking(StackingType::Stack, 3);
//!
//! assert!(haste.add_stack(2));
//! assert!(!haste.add_stack(1));
//! assert_eq!(haste.current_stacks(), 3);
//! ```

mod duration;
mod source;

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::definition::AttributeDefinition;
use crate::ids::{EffectId, IdGenerator, ModifierId};
use crate::modifier::AttributeModifier;

pub use duration::Duration;
pub use source::{GameplayEffectSource, SourceAttributes, SourceHandle, SourceType};

/// Re-application interval used when none is given.
pub const DEFAULT_INTERVAL_SECONDS: f64 = 1.0;

// =============================================================================
// Policies
// =============================================================================

/// How long an effect's modifiers stay in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectType {
    /// Applied once and never stored
    Instant,
    /// Stored until its duration runs out
    Duration,
    /// Stored until explicitly removed
    Infinite,
}

/// How repeated applications of the same effect combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StackingType {
    /// Never stacks
    NoStack,
    /// Accumulates stacks up to the cap
    Stack,
    /// A new application replaces the old one
    #[default]
    Replace,
    /// A new application only extends the duration
    DurationOnly,
}

/// Lifecycle status of an effect instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectStatus {
    /// Running normally
    #[default]
    Active,
    /// Temporarily suspended
    Paused,
    /// Ran out of time or stacks
    Expired,
    /// Stopped explicitly
    Cancelled,
}

bitflags! {
    /// Classification flags used to query and filter effects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EffectTags: u16 {
        /// Physical damage or buffs
        const PHYSICAL      = 1 << 0;
        /// Mental or morale effects
        const MENTAL        = 1 << 1;
        /// Terrain and weather
        const ENVIRONMENTAL = 1 << 2;
        /// Magic
        const MAGICAL       = 1 << 3;
        /// Tech and equipment
        const TECHNOLOGICAL = 1 << 4;
        /// Expected to wear off
        const TEMPORARY     = 1 << 5;
        /// Expected to stay
        const PERMANENT     = 1 << 6;
    }
}

// =============================================================================
// AttributeEffect
// =============================================================================

/// A bundle of modifiers plus duration, stacking and periodic policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEffect {
    id: EffectId,
    name: String,
    description: String,
    modifiers: Vec<AttributeModifier>,
    duration: Duration,
    effect_type: EffectType,
    tags: EffectTags,
    stacking_type: StackingType,
    max_stacks: u32,
    current_stacks: u32,
    priority: i32,
    is_passive: bool,
    status: EffectStatus,
    is_periodic: bool,
    interval_seconds: f64,
    source: Option<GameplayEffectSource>,
}

impl AttributeEffect {
    /// Creates an active effect with one stack and no modifiers.
    ///
    /// Stacking defaults to [`StackingType::Replace`] with a cap of 1.
    #[must_use]
    pub fn new(id: EffectId, name: &str, effect_type: EffectType, duration: Duration) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            modifiers: Vec::new(),
            duration,
            effect_type,
            tags: EffectTags::empty(),
            stacking_type: StackingType::default(),
            max_stacks: 1,
            current_stacks: 1,
            priority: 0,
            is_passive: false,
            status: EffectStatus::Active,
            is_periodic: false,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            source: None,
        }
    }

    /// Instant effect: applied once, never stored.
    #[must_use]
    pub fn instant(id: EffectId, name: &str) -> Self {
        Self::new(id, name, EffectType::Instant, Duration::finite(0.0))
    }

    /// Effect lasting `seconds`.
    #[must_use]
    pub fn timed(id: EffectId, name: &str, seconds: f64) -> Self {
        Self::new(id, name, EffectType::Duration, Duration::finite(seconds))
    }

    /// Effect lasting until removed.
    #[must_use]
    pub fn infinite(id: EffectId, name: &str) -> Self {
        Self::new(id, name, EffectType::Infinite, Duration::infinite())
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Appends a modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: AttributeModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Appends several modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: impl IntoIterator<Item = AttributeModifier>) -> Self {
        self.modifiers.extend(modifiers);
        self
    }

    /// Replaces the tag set.
    #[must_use]
    pub fn with_tags(mut self, tags: EffectTags) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the stacking policy and cap. A cap of 0 is raised to 1.
    #[must_use]
    pub fn with_stacking(mut self, stacking_type: StackingType, max_stacks: u32) -> Self {
        self.stacking_type = stacking_type;
        self.max_stacks = max_stacks.max(1);
        self.current_stacks = self.current_stacks.min(self.max_stacks);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the effect as passive.
    #[must_use]
    pub fn passive(mut self) -> Self {
        self.is_passive = true;
        self
    }

    /// Makes the effect re-apply every `interval_seconds`.
    #[must_use]
    pub fn periodic(mut self, interval_seconds: f64) -> Self {
        self.is_periodic = true;
        self.interval_seconds = interval_seconds;
        self
    }

    /// Attaches a source snapshot.
    #[must_use]
    pub fn with_source(mut self, source: GameplayEffectSource) -> Self {
        self.source = Some(source);
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Returns the id.
    #[must_use]
    pub const fn id(&self) -> EffectId {
        self.id
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the modifiers in list order.
    #[must_use]
    pub fn modifiers(&self) -> &[AttributeModifier] {
        &self.modifiers
    }

    /// Mutable access to the modifiers, for applying them.
    pub fn modifiers_mut(&mut self) -> &mut [AttributeModifier] {
        &mut self.modifiers
    }

    /// Returns the duration.
    #[must_use]
    pub const fn duration(&self) -> &Duration {
        &self.duration
    }

    /// Returns the effect type.
    #[must_use]
    pub const fn effect_type(&self) -> EffectType {
        self.effect_type
    }

    /// Returns the tags.
    #[must_use]
    pub const fn tags(&self) -> EffectTags {
        self.tags
    }

    /// Returns the stacking policy.
    #[must_use]
    pub const fn stacking_type(&self) -> StackingType {
        self.stacking_type
    }

    /// Returns the stack cap.
    #[must_use]
    pub const fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    /// Returns the current stack count.
    #[must_use]
    pub const fn current_stacks(&self) -> u32 {
        self.current_stacks
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// True for passive effects.
    #[must_use]
    pub const fn is_passive(&self) -> bool {
        self.is_passive
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> EffectStatus {
        self.status
    }

    /// True if the effect re-applies on a timer.
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        self.is_periodic
    }

    /// Returns the requested re-application interval in seconds.
    #[must_use]
    pub const fn interval_seconds(&self) -> f64 {
        self.interval_seconds
    }

    /// Returns the source snapshot, if any.
    #[must_use]
    pub const fn source(&self) -> Option<&GameplayEffectSource> {
        self.source.as_ref()
    }

    /// Key that groups applications of "the same" effect for stacking.
    #[must_use]
    pub fn stack_key(&self) -> String {
        format!("{}_{:?}", self.name, self.effect_type)
    }

    /// True if the duration ran out while the effect was active.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.status == EffectStatus::Active && self.duration.is_expired()
    }

    /// True for effects without a time limit.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.duration.is_infinite()
    }

    /// True for effects with a time limit.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        !self.duration.is_infinite()
    }

    /// Fraction of the duration left.
    #[must_use]
    pub fn remaining_percentage(&self) -> f64 {
        self.duration.remaining_percentage()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Advances the effect's own duration; marks it expired when it runs out.
    ///
    /// Only active, finite effects tick.
    pub fn update_duration(&mut self, delta: f64) {
        if self.status != EffectStatus::Active || self.duration.is_infinite() {
            return;
        }
        self.duration.update(delta);
        if self.duration.is_expired() {
            self.status = EffectStatus::Expired;
        }
    }

    /// Suspends an active effect.
    pub fn pause(&mut self) {
        if self.status == EffectStatus::Active {
            self.status = EffectStatus::Paused;
        }
    }

    /// Resumes a paused effect.
    pub fn resume(&mut self) {
        if self.status == EffectStatus::Paused {
            self.status = EffectStatus::Active;
        }
    }

    /// Cancels the effect from any state.
    pub fn cancel(&mut self) {
        self.status = EffectStatus::Cancelled;
    }

    /// Adds `count` stacks.
    ///
    /// Returns `false` without change for `NoStack` effects and inactive
    /// effects. When the cap would be exceeded the count is set to the cap
    /// and `false` is returned; the excess is dropped.
    pub fn add_stack(&mut self, count: u32) -> bool {
        if self.stacking_type == StackingType::NoStack || self.status != EffectStatus::Active {
            return false;
        }
        let requested = self.current_stacks.saturating_add(count);
        if requested <= self.max_stacks {
            self.current_stacks = requested;
            true
        } else {
            self.current_stacks = self.max_stacks;
            false
        }
    }

    /// Removes `count` stacks.
    ///
    /// Dropping to zero expires the effect and returns `false`. Refused for
    /// `NoStack` effects and inactive effects.
    pub fn remove_stack(&mut self, count: u32) -> bool {
        if self.stacking_type == StackingType::NoStack || self.status != EffectStatus::Active {
            return false;
        }
        if self.current_stacks > count {
            self.current_stacks -= count;
            true
        } else {
            self.current_stacks = 0;
            self.status = EffectStatus::Expired;
            false
        }
    }

    /// Restarts the duration of an active, finite effect.
    pub fn refresh_duration(&mut self) {
        if self.status == EffectStatus::Active && !self.duration.is_infinite() {
            self.duration.reset();
        }
    }

    /// Replaces the duration; an already-expired duration expires the effect.
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
        if self.duration.is_expired() {
            self.status = EffectStatus::Expired;
        }
    }

    /// Replaces or clears the source snapshot.
    pub fn set_source(&mut self, source: Option<GameplayEffectSource>) {
        self.source = source;
    }

    // -------------------------------------------------------------------------
    // Modifiers and tags
    // -------------------------------------------------------------------------

    /// Appends a modifier.
    pub fn add_modifier(&mut self, modifier: AttributeModifier) {
        self.modifiers.push(modifier);
    }

    /// Removes the modifier with `id`. Returns `false` if absent.
    pub fn remove_modifier(&mut self, id: ModifierId) -> bool {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.id() != id);
        self.modifiers.len() != before
    }

    /// Modifiers aimed at `definition`, in list order.
    pub fn modifiers_for<'a>(
        &'a self,
        definition: &'a AttributeDefinition,
    ) -> impl Iterator<Item = &'a AttributeModifier> + 'a {
        self.modifiers
            .iter()
            .filter(move |m| m.target() == definition)
    }

    /// Indices of the modifiers in application order.
    ///
    /// Ascending execution order; ties keep list order.
    #[must_use]
    pub fn application_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.modifiers.len()).collect();
        order.sort_by_key(|&index| self.modifiers[index].execution_order());
        order
    }

    /// Adds tags.
    pub fn add_tag(&mut self, tags: EffectTags) {
        self.tags.insert(tags);
    }

    /// Removes tags. Returns `false` if none of them were set.
    pub fn remove_tag(&mut self, tags: EffectTags) -> bool {
        let had = self.tags.intersects(tags);
        self.tags.remove(tags);
        had
    }

    /// True if every flag in `tags` is set.
    #[must_use]
    pub fn has_tag(&self, tags: EffectTags) -> bool {
        self.tags.contains(tags)
    }

    /// True if at least one flag in `tags` is set.
    #[must_use]
    pub fn has_any_tag(&self, tags: EffectTags) -> bool {
        self.tags.intersects(tags)
    }

    /// True if every flag in `tags` is set.
    #[must_use]
    pub fn has_all_tags(&self, tags: EffectTags) -> bool {
        self.tags.contains(tags)
    }

    /// Copies a template into a fresh, independent instance.
    ///
    /// The copy gets a new effect id and new modifier ids, starts active
    /// with one stack and a restarted duration.
    #[must_use]
    pub fn instantiate(&self, ids: &mut IdGenerator) -> Self {
        let mut copy = self.clone();
        copy.id = ids.next_effect_id();
        for modifier in &mut copy.modifiers {
            *modifier = modifier.instantiate(ids.next_modifier_id());
        }
        copy.status = EffectStatus::Active;
        copy.current_stacks = 1;
        copy.duration.reset();
        copy
    }
}

impl fmt::Display for AttributeEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:?}, stacks {}/{})",
            self.name, self.effect_type, self.status, self.current_stacks, self.max_stacks
        )
    }
}
