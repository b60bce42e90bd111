//! Live attribute values and their compute strategies.
//!
//! An [`AttributeValue`] holds the base, current, min and max numbers for
//! one attribute on one entity. Every mutation clamps into `[min, max]`, so
//! `min <= base <= max` and `min <= current <= max` hold after any call.
//!
//! # Compute strategies
//!
//! How a value reacts to a modifier and to changes in the attributes it
//! depends on is decided by its [`AttributeKind`], picked from the
//! definition key when the value is created:
//!
//! | kind | depends on | behavior |
//! |------|------------|----------|
//! | `Generic` | nothing | apply the modifier to current |
//! | `Health` | `MaxHealth` | rescale with max, apply, clamp to `[0, max]`, truncate |
//! | `MaxHealth` | `Constitution` | `base = raw + constitution * 100`, apply, truncate |
//! | `Hull` | `MaxHull` | like Health; source sets damage `damage * vs_hull` |
//! | `Flux` | `MaxFlux` | like Health; source sets `damage * vs_shields * reduction` |
//!
//! The set that owns the value resolves dependencies and hands their
//! current values to [`AttributeValue::compute_value`]; a value never looks
//! at its siblings directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::definition::AttributeDefinition;
use crate::effect::SourceAttributes;
use crate::error::{AttributeError, AttributeResult};
use crate::modifier::AttributeModifier;

/// Max health granted per point of constitution.
pub const HEALTH_PER_CONSTITUTION: f32 = 100.0;

/// Current values of the dependencies a set resolved for one compute call.
pub type DependencyValues<'a> = [(&'a str, f32)];

fn dependency(values: &DependencyValues<'_>, key: &str) -> Option<f32> {
    values
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, value)| *value)
}

// =============================================================================
// AttributeKind
// =============================================================================

/// Compute strategy of an attribute, with the state that strategy needs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Plain value with no dependencies.
    #[default]
    Generic,
    /// Hit points tracking `Character.MaxHealth`.
    Health {
        /// Max seen at the previous compute
        previous_max: Option<f32>,
    },
    /// Hit point ceiling derived from `Character.Core.Constitution`.
    MaxHealth {
        /// Base before the constitution bonus
        raw_base: f32,
    },
    /// Hull integrity tracking `Ship.Core.MaxHull`.
    Hull {
        /// Max seen at the previous compute
        previous_max: Option<f32>,
    },
    /// Shield flux tracking `Ship.Core.MaxFlux`.
    Flux {
        /// Max seen at the previous compute
        previous_max: Option<f32>,
    },
}

impl AttributeKind {
    /// Picks the strategy for a definition key.
    ///
    /// `base` seeds the raw base of a `MaxHealth`.
    #[must_use]
    pub fn for_key(key: &str, base: f32) -> Self {
        match key {
            catalog::HEALTH => Self::Health { previous_max: None },
            catalog::MAX_HEALTH => Self::MaxHealth { raw_base: base },
            catalog::HULL => Self::Hull { previous_max: None },
            catalog::FLUX => Self::Flux { previous_max: None },
            _ => Self::Generic,
        }
    }

    /// Keys of the attributes this kind reads when computing.
    #[must_use]
    pub const fn dependencies(&self) -> &'static [&'static str] {
        match self {
            Self::Generic => &[],
            Self::Health { .. } => &[catalog::MAX_HEALTH],
            Self::MaxHealth { .. } => &[catalog::CONSTITUTION],
            Self::Hull { .. } => &[catalog::MAX_HULL],
            Self::Flux { .. } => &[catalog::MAX_FLUX],
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Health { .. } => "health",
            Self::MaxHealth { .. } => "max_health",
            Self::Hull { .. } => "hull",
            Self::Flux { .. } => "flux",
        }
    }
}

/// Damage a hull takes from a weapon snapshot.
fn hull_damage(source: &SourceAttributes) -> Option<f32> {
    let damage = source.get(catalog::WEAPON_DAMAGE)?;
    let vs_hull = source.get(catalog::DAMAGE_MULTIPLIER_VS_HULL).unwrap_or(1.0);
    Some(damage * vs_hull)
}

/// Flux a shield absorbs from a weapon snapshot.
fn flux_damage(source: &SourceAttributes) -> Option<f32> {
    let damage = source.get(catalog::WEAPON_DAMAGE)?;
    let vs_shields = source
        .get(catalog::DAMAGE_MULTIPLIER_VS_SHIELDS)
        .unwrap_or(1.0);
    let reduction = source.get(catalog::SHIELD_DAMAGE_REDUCTION).unwrap_or(1.0);
    Some(damage * vs_shields * reduction)
}

// =============================================================================
// AttributeValue
// =============================================================================

/// Base, current and bounds of one attribute on one entity.
///
/// # Example
///
/// ```
/// use vigor_attributes::definition::AttributeDefinition;
/// use vigor_attributes::value::AttributeValue;
///
/// let speed = AttributeDefinition::new(3, "Character.Speed", "Character");
/// let mut value = AttributeValue::new(speed, 5.0, 0.0, 10.0).unwrap();
///
/// value.set_current_value(25.0);
/// assert_eq!(value.current_value(), 10.0);
///
/// assert!(value.set_min_value(11.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    definition: AttributeDefinition,
    kind: AttributeKind,
    base_value: f32,
    current_value: f32,
    min_value: f32,
    max_value: f32,
}

impl AttributeValue {
    /// Creates a value with bounds, picking the kind from the definition key.
    ///
    /// `base` is clamped into the bounds and current starts equal to it.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidRange`] if `min > max` or either
    /// bound is NaN.
    pub fn new(
        definition: AttributeDefinition,
        base: f32,
        min: f32,
        max: f32,
    ) -> AttributeResult<Self> {
        if !(min <= max) {
            return Err(AttributeError::InvalidRange { min, max });
        }

        let kind = AttributeKind::for_key(definition.key(), base);
        let mut value = Self {
            definition,
            kind,
            base_value: 0.0,
            current_value: 0.0,
            min_value: min,
            max_value: max,
        };
        value.base_value = value.clamp(base);
        value.current_value = value.base_value;
        Ok(value)
    }

    /// Creates a value bounded only by the `f32` range.
    #[must_use]
    pub fn unbounded(definition: AttributeDefinition, base: f32) -> Self {
        let kind = AttributeKind::for_key(definition.key(), base);
        Self {
            definition,
            kind,
            base_value: base,
            current_value: base,
            min_value: f32::MIN,
            max_value: f32::MAX,
        }
    }

    /// Replaces the compute strategy.
    #[must_use]
    pub fn with_kind(mut self, kind: AttributeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the definition.
    #[must_use]
    pub const fn definition(&self) -> &AttributeDefinition {
        &self.definition
    }

    /// Returns the compute strategy.
    #[must_use]
    pub const fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    /// Returns the base value.
    #[must_use]
    pub const fn base_value(&self) -> f32 {
        self.base_value
    }

    /// Returns the current value.
    #[must_use]
    pub const fn current_value(&self) -> f32 {
        self.current_value
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn min_value(&self) -> f32 {
        self.min_value
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn max_value(&self) -> f32 {
        self.max_value
    }

    /// Keys of the attributes this value depends on.
    #[must_use]
    pub const fn dependencies(&self) -> &'static [&'static str] {
        self.kind.dependencies()
    }

    /// Sets the base value and resets current to it.
    ///
    /// For a `MaxHealth` this also replaces the raw base that constitution
    /// is added to on the next compute.
    pub fn set_base_value(&mut self, value: f32) {
        if let AttributeKind::MaxHealth { raw_base } = &mut self.kind {
            *raw_base = value;
        }
        self.base_value = self.clamp(value);
        self.current_value = self.base_value;
    }

    /// Sets the current value, clamped into the bounds.
    pub fn set_current_value(&mut self, value: f32) {
        self.current_value = self.clamp(value);
    }

    /// Moves the lower bound and re-clamps base and current.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidRange`] if `value` exceeds the
    /// current max or is NaN; nothing changes.
    pub fn set_min_value(&mut self, value: f32) -> AttributeResult<()> {
        self.set_range(value, self.max_value)
    }

    /// Moves the upper bound and re-clamps base and current.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidRange`] if `value` is below the
    /// current min or is NaN; nothing changes.
    pub fn set_max_value(&mut self, value: f32) -> AttributeResult<()> {
        self.set_range(self.min_value, value)
    }

    /// Replaces both bounds at once and re-clamps base and current.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidRange`] if `min > max`.
    pub fn set_range(&mut self, min: f32, max: f32) -> AttributeResult<()> {
        if !(min <= max) {
            return Err(AttributeError::InvalidRange { min, max });
        }
        self.min_value = min;
        self.max_value = max;
        self.base_value = self.clamp(self.base_value);
        self.current_value = self.clamp(self.current_value);
        Ok(())
    }

    /// Drops every modification by resetting current to base.
    pub fn reset(&mut self) {
        self.current_value = self.base_value;
    }

    /// Position of current within the bounds, in `[0, 1]`.
    ///
    /// A zero-width range reports 1.
    #[must_use]
    pub fn percentage(&self) -> f32 {
        let span = self.max_value - self.min_value;
        if span.abs() < f32::EPSILON {
            return 1.0;
        }
        (self.current_value - self.min_value) / span
    }

    /// Recomputes current from dependencies and an optional modifier.
    ///
    /// `dependencies` holds the current values the owning set resolved for
    /// [`dependencies`](Self::dependencies); a missing entry means no
    /// adjustment. A damage-style kind given a `source` snapshot rewrites
    /// the modifier's magnitude from its formula before applying it, which
    /// is why the modifier is borrowed mutably.
    pub fn compute_value(
        &mut self,
        dependencies: &DependencyValues<'_>,
        modifier: Option<&mut AttributeModifier>,
        source: Option<&SourceAttributes>,
    ) {
        match self.kind {
            AttributeKind::Generic => {
                let current = self.current_value;
                let modified = modifier.map_or(current, |m| m.execute(current));
                self.set_current_value(modified);
            }
            AttributeKind::MaxHealth { raw_base } => {
                let constitution = dependency(dependencies, catalog::CONSTITUTION).unwrap_or(0.0);
                self.base_value = self.clamp(raw_base + constitution * HEALTH_PER_CONSTITUTION);
                self.current_value = self.base_value;

                let current = self.current_value;
                let modified = modifier.map_or(current, |m| m.execute(current));
                self.set_current_value(modified.trunc());
            }
            AttributeKind::Health { previous_max } => {
                let previous_max = self.compute_resource(
                    catalog::MAX_HEALTH,
                    previous_max,
                    dependencies,
                    modifier,
                    None,
                );
                self.kind = AttributeKind::Health { previous_max };
            }
            AttributeKind::Hull { previous_max } => {
                let damage = source.and_then(hull_damage);
                let previous_max = self.compute_resource(
                    catalog::MAX_HULL,
                    previous_max,
                    dependencies,
                    modifier,
                    damage,
                );
                self.kind = AttributeKind::Hull { previous_max };
            }
            AttributeKind::Flux { previous_max } => {
                let damage = source.and_then(flux_damage);
                let previous_max = self.compute_resource(
                    catalog::MAX_FLUX,
                    previous_max,
                    dependencies,
                    modifier,
                    damage,
                );
                self.kind = AttributeKind::Flux { previous_max };
            }
        }
    }

    /// Shared compute for pools that track a max attribute.
    ///
    /// Returns the max to remember for the next call.
    fn compute_resource(
        &mut self,
        max_key: &str,
        previous_max: Option<f32>,
        dependencies: &DependencyValues<'_>,
        modifier: Option<&mut AttributeModifier>,
        formula_damage: Option<f32>,
    ) -> Option<f32> {
        let dependency_max = dependency(dependencies, max_key);

        let mut modifier = modifier;
        if let (Some(damage), Some(m)) = (formula_damage, modifier.as_deref_mut()) {
            if let Err(err) = m.set_value(damage) {
                tracing::warn!(
                    attribute = self.definition.key(),
                    damage,
                    error = %err,
                    "source damage rejected by modifier, keeping previous magnitude"
                );
            }
        }

        let current = self.current_value;
        let rescaled = match dependency_max {
            Some(max) => {
                let previous = previous_max.unwrap_or(max);
                if (previous - max).abs() > f32::EPSILON {
                    let ratio = if previous == 0.0 { 1.0 } else { current / previous };
                    ratio * max
                } else {
                    current
                }
            }
            None => current,
        };

        let modified = modifier.map_or(rescaled, |m| m.execute(rescaled));
        let ceiling = dependency_max.unwrap_or(self.max_value);
        self.set_current_value(modified.min(ceiling).max(0.0).trunc());

        dependency_max.or(previous_max)
    }

    fn clamp(&self, value: f32) -> f32 {
        value.max(self.min_value).min(self.max_value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Base={:.2}, Current={:.2}, Range=[{:.2}, {:.2}]",
            self.definition.key(),
            self.base_value,
            self.current_value,
            self.min_value,
            self.max_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ModifierId;
    use crate::modifier::ModifierOperation;
    use proptest::prelude::*;

    fn def(id: u32, key: &str) -> AttributeDefinition {
        AttributeDefinition::new(id, key, catalog::category_of(key))
    }

    fn modifier(key: &str, operation: ModifierOperation, value: f32) -> AttributeModifier {
        AttributeModifier::new(ModifierId::new(1), def(99, key), operation, value).unwrap()
    }

    mod bounds_tests {
        use super::*;

        #[test]
        fn construction_clamps_base() {
            let value = AttributeValue::new(def(3, catalog::SPEED), 50.0, 0.0, 10.0).unwrap();
            assert!((value.base_value() - 10.0).abs() < 0.0001);
            assert!((value.current_value() - 10.0).abs() < 0.0001);
        }

        #[test]
        fn inverted_range_rejected() {
            let err = AttributeValue::new(def(3, catalog::SPEED), 5.0, 10.0, 0.0).unwrap_err();
            assert_eq!(err, AttributeError::InvalidRange { min: 10.0, max: 0.0 });
        }

        #[test]
        fn set_base_resets_current() {
            let mut value = AttributeValue::new(def(3, catalog::SPEED), 5.0, 0.0, 10.0).unwrap();
            value.set_current_value(8.0);
            value.set_base_value(3.0);
            assert!((value.current_value() - 3.0).abs() < 0.0001);
        }

        #[test]
        fn narrowing_range_reclamps() {
            let mut value = AttributeValue::new(def(3, catalog::SPEED), 8.0, 0.0, 10.0).unwrap();
            value.set_max_value(6.0).unwrap();
            assert!((value.base_value() - 6.0).abs() < 0.0001);
            assert!((value.current_value() - 6.0).abs() < 0.0001);

            value.set_min_value(2.0).unwrap();
            value.set_current_value(-4.0);
            assert!((value.current_value() - 2.0).abs() < 0.0001);
        }

        #[test]
        fn invalid_bound_change_leaves_value_untouched() {
            let mut value = AttributeValue::new(def(3, catalog::SPEED), 5.0, 0.0, 10.0).unwrap();
            assert!(value.set_min_value(11.0).is_err());
            assert!(value.set_max_value(-1.0).is_err());
            assert!((value.min_value() - 0.0).abs() < 0.0001);
            assert!((value.max_value() - 10.0).abs() < 0.0001);
        }

        #[test]
        fn nan_current_falls_to_min() {
            let mut value = AttributeValue::new(def(3, catalog::SPEED), 5.0, 1.0, 10.0).unwrap();
            value.set_current_value(f32::NAN);
            assert!((value.current_value() - 1.0).abs() < 0.0001);
        }

        #[test]
        fn percentage_of_range() {
            let mut value = AttributeValue::new(def(3, catalog::SPEED), 5.0, 0.0, 10.0).unwrap();
            assert!((value.percentage() - 0.5).abs() < 0.0001);
            value.set_range(4.0, 4.0).unwrap();
            assert!((value.percentage() - 1.0).abs() < 0.0001);
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn kind_chosen_by_key() {
            let kind = |key| *AttributeValue::unbounded(def(0, key), 1.0).kind();
            assert_eq!(kind(catalog::HEALTH), AttributeKind::Health { previous_max: None });
            assert_eq!(kind(catalog::MAX_HEALTH), AttributeKind::MaxHealth { raw_base: 1.0 });
            assert_eq!(kind(catalog::HULL), AttributeKind::Hull { previous_max: None });
            assert_eq!(kind(catalog::FLUX), AttributeKind::Flux { previous_max: None });
            assert_eq!(kind(catalog::SPEED), AttributeKind::Generic);
        }

        #[test]
        fn dependencies_are_static_per_kind() {
            assert!(AttributeKind::Generic.dependencies().is_empty());
            assert_eq!(
                AttributeKind::MaxHealth { raw_base: 0.0 }.dependencies(),
                &[catalog::CONSTITUTION]
            );
            assert_eq!(
                AttributeKind::Flux { previous_max: None }.dependencies(),
                &[catalog::MAX_FLUX]
            );
        }
    }

    mod compute_tests {
        use super::*;

        #[test]
        fn generic_applies_modifier() {
            let mut value = AttributeValue::unbounded(def(3, catalog::SPEED), 10.0);
            let mut m = modifier(catalog::SPEED, ModifierOperation::Multiply, 2.0);
            value.compute_value(&[], Some(&mut m), None);
            assert!((value.current_value() - 20.0).abs() < 0.0001);

            value.compute_value(&[], None, None);
            assert!((value.current_value() - 20.0).abs() < 0.0001);
        }

        #[test]
        fn max_health_adds_constitution() {
            let mut value = AttributeValue::unbounded(def(1, catalog::MAX_HEALTH), 100.0);
            value.compute_value(&[(catalog::CONSTITUTION, 2.0)], None, None);
            assert!((value.base_value() - 300.0).abs() < 0.0001);
            assert!((value.current_value() - 300.0).abs() < 0.0001);

            // Recompute is stable: raw base is not compounded.
            value.compute_value(&[(catalog::CONSTITUTION, 2.0)], None, None);
            assert!((value.current_value() - 300.0).abs() < 0.0001);
        }

        #[test]
        fn max_health_set_base_updates_raw() {
            let mut value = AttributeValue::unbounded(def(1, catalog::MAX_HEALTH), 100.0);
            value.set_base_value(50.0);
            value.compute_value(&[(catalog::CONSTITUTION, 1.0)], None, None);
            assert!((value.current_value() - 150.0).abs() < 0.0001);
        }

        #[test]
        fn max_health_truncates_modified_value() {
            let mut value = AttributeValue::unbounded(def(1, catalog::MAX_HEALTH), 100.0);
            let mut m = modifier(catalog::MAX_HEALTH, ModifierOperation::Add, 10.7);
            value.compute_value(&[(catalog::CONSTITUTION, 0.0)], Some(&mut m), None);
            assert!((value.current_value() - 110.0).abs() < 0.0001);
        }

        #[test]
        fn health_clamps_to_dependency_max() {
            let mut value = AttributeValue::unbounded(def(0, catalog::HEALTH), 300.0);
            let deps = [(catalog::MAX_HEALTH, 300.0)];
            value.compute_value(&deps, None, None);

            let mut heal = modifier(catalog::HEALTH, ModifierOperation::Add, 500.0);
            value.compute_value(&deps, Some(&mut heal), None);
            assert!((value.current_value() - 300.0).abs() < 0.0001);

            let mut hit = modifier(catalog::HEALTH, ModifierOperation::Add, -1000.0);
            value.compute_value(&deps, Some(&mut hit), None);
            assert!(value.current_value().abs() < 0.0001);
        }

        #[test]
        fn health_rescales_when_max_changes() {
            let mut value = AttributeValue::unbounded(def(0, catalog::HEALTH), 50.0);
            value.compute_value(&[(catalog::MAX_HEALTH, 100.0)], None, None);
            assert!((value.current_value() - 50.0).abs() < 0.0001);

            value.compute_value(&[(catalog::MAX_HEALTH, 200.0)], None, None);
            assert!((value.current_value() - 100.0).abs() < 0.0001);
            assert_eq!(
                *value.kind(),
                AttributeKind::Health {
                    previous_max: Some(200.0)
                }
            );
        }

        #[test]
        fn health_from_zero_max_takes_new_max() {
            let mut value = AttributeValue::unbounded(def(0, catalog::HEALTH), 0.0);
            value.compute_value(&[(catalog::MAX_HEALTH, 0.0)], None, None);
            value.compute_value(&[(catalog::MAX_HEALTH, 80.0)], None, None);
            assert!((value.current_value() - 80.0).abs() < 0.0001);
        }

        #[test]
        fn health_without_dependency_uses_own_bounds() {
            let mut value = AttributeValue::new(def(0, catalog::HEALTH), 40.0, 0.0, 60.0).unwrap();
            let mut heal = modifier(catalog::HEALTH, ModifierOperation::Add, 15.5);
            value.compute_value(&[], Some(&mut heal), None);
            assert!((value.current_value() - 55.0).abs() < 0.0001);
        }

        #[test]
        fn hull_uses_source_damage() {
            let damage = def(20, catalog::WEAPON_DAMAGE);
            let vs_hull = def(24, catalog::DAMAGE_MULTIPLIER_VS_HULL);
            let mut source = SourceAttributes::new();
            source.insert(&damage, 40.0);
            source.insert(&vs_hull, 1.5);

            let mut value = AttributeValue::unbounded(def(17, catalog::HULL), 500.0);
            let deps = [(catalog::MAX_HULL, 500.0)];
            let mut hit = modifier(catalog::HULL, ModifierOperation::Subtract, 1.0);
            value.compute_value(&deps, Some(&mut hit), Some(&source));

            assert!((hit.value() - 60.0).abs() < 0.0001);
            assert!((value.current_value() - 440.0).abs() < 0.0001);
        }

        #[test]
        fn flux_uses_shield_formula() {
            let mut source = SourceAttributes::new();
            source.insert(&def(20, catalog::WEAPON_DAMAGE), 100.0);
            source.insert(&def(21, catalog::DAMAGE_MULTIPLIER_VS_SHIELDS), 2.0);
            source.insert(&def(22, catalog::SHIELD_DAMAGE_REDUCTION), 0.25);

            let mut value = AttributeValue::unbounded(def(13, catalog::FLUX), 0.0);
            let deps = [(catalog::MAX_FLUX, 1000.0)];
            let mut load = modifier(catalog::FLUX, ModifierOperation::Add, 0.0);
            value.compute_value(&deps, Some(&mut load), Some(&source));

            assert!((value.current_value() - 50.0).abs() < 0.0001);
        }

        #[test]
        fn missing_weapon_damage_keeps_magnitude() {
            let source = SourceAttributes::new();
            let mut value = AttributeValue::unbounded(def(17, catalog::HULL), 100.0);
            let deps = [(catalog::MAX_HULL, 100.0)];
            let mut hit = modifier(catalog::HULL, ModifierOperation::Subtract, 10.0);
            value.compute_value(&deps, Some(&mut hit), Some(&source));

            assert!((hit.value() - 10.0).abs() < 0.0001);
            assert!((value.current_value() - 90.0).abs() < 0.0001);
        }

        #[test]
        fn rejected_formula_keeps_magnitude() {
            let mut source = SourceAttributes::new();
            source.insert(&def(20, catalog::WEAPON_DAMAGE), -5.0);

            let mut value = AttributeValue::unbounded(def(17, catalog::HULL), 100.0);
            let deps = [(catalog::MAX_HULL, 100.0)];
            let mut scale = modifier(catalog::HULL, ModifierOperation::Multiply, 0.5);
            value.compute_value(&deps, Some(&mut scale), Some(&source));

            assert!((scale.value() - 0.5).abs() < 0.0001);
            assert!((value.current_value() - 50.0).abs() < 0.0001);
        }
    }

    #[test]
    fn display_lists_all_numbers() {
        let value = AttributeValue::new(def(3, catalog::SPEED), 5.0, 0.0, 10.0).unwrap();
        assert_eq!(
            value.to_string(),
            "Character.Speed: Base=5.00, Current=5.00, Range=[0.00, 10.00]"
        );
    }

    #[derive(Debug, Clone)]
    enum Mutation {
        Base(f32),
        Current(f32),
        Min(f32),
        Max(f32),
        Add(f32),
    }

    fn mutation() -> impl Strategy<Value = Mutation> {
        prop_oneof![
            (-1000.0f32..1000.0).prop_map(Mutation::Base),
            (-1000.0f32..1000.0).prop_map(Mutation::Current),
            (-1000.0f32..1000.0).prop_map(Mutation::Min),
            (-1000.0f32..1000.0).prop_map(Mutation::Max),
            (-1000.0f32..1000.0).prop_map(Mutation::Add),
        ]
    }

    proptest! {
        #[test]
        fn bounds_hold_after_any_mutation(
            base in -500.0f32..500.0,
            mutations in prop::collection::vec(mutation(), 1..40),
        ) {
            let mut value = AttributeValue::new(def(3, catalog::SPEED), base, -100.0, 100.0).unwrap();
            for step in mutations {
                match step {
                    Mutation::Base(v) => value.set_base_value(v),
                    Mutation::Current(v) => value.set_current_value(v),
                    Mutation::Min(v) => { let _ = value.set_min_value(v); }
                    Mutation::Max(v) => { let _ = value.set_max_value(v); }
                    Mutation::Add(v) => {
                        let mut m = modifier(catalog::SPEED, ModifierOperation::Add, v);
                        value.compute_value(&[], Some(&mut m), None);
                    }
                }
                prop_assert!(value.min_value() <= value.max_value());
                prop_assert!(value.min_value() <= value.current_value());
                prop_assert!(value.current_value() <= value.max_value());
                prop_assert!(value.min_value() <= value.base_value());
                prop_assert!(value.base_value() <= value.max_value());
            }
        }
    }
}
