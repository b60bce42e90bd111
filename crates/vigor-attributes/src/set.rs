//! Attribute sets: every attribute value of one entity.
//!
//! An [`AttributeSet`] owns one [`AttributeValue`] per definition and a
//! reverse dependency index built at construction (which values must be
//! recomputed when a given value changes).
//!
//! # Cascade
//!
//! Changing a current value recomputes every direct and transitive
//! dependent exactly once. The dependents reachable from the changed
//! attribute are ordered topologically (Kahn's algorithm over the reverse
//! index, ties broken by registration order), so a value is only
//! recomputed after everything it reads has settled, even in diamond
//! shaped graphs. Cyclic graphs are rejected when the set is built.
//!
//! # Change log
//!
//! A set can record [`SetChange`]s for every value or range mutation.
//! Recording is off by default; whoever publishes changes outward (the
//! manager, usually) switches it on and drains the log with
//! [`AttributeSet::take_changes`] after each operation.
//!
//! # Example
//!
//! ```
//! use vigor_attributes::catalog;
//! use vigor_attributes::definition::AttributeRegistry;
//! use vigor_attributes::ids::AttributeSetId;
//! use vigor_attributes::set::AttributeSet;
//!
//! let registry = AttributeRegistry::with_builtin();
//! let def = |key| registry.get_by_key(key).unwrap().clone();
//!
//! let set = AttributeSet::from_entries(
//!     AttributeSetId::new(1),
//!     [
//!         (def(catalog::CONSTITUTION), 2.0, 0.0, 100.0),
//!         (def(catalog::MAX_HEALTH), 100.0, 0.0, 10_000.0),
//!         (def(catalog::HEALTH), 300.0, 0.0, 10_000.0),
//!     ],
//! )
//! .unwrap();
//!
//! assert_eq!(set.current_value(&def(catalog::MAX_HEALTH)), Some(300.0));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::definition::AttributeDefinition;
use crate::effect::SourceAttributes;
use crate::error::{AttributeError, AttributeResult};
use crate::ids::AttributeSetId;
use crate::modifier::AttributeModifier;
use crate::value::AttributeValue;

// =============================================================================
// Change records
// =============================================================================

/// A mutation recorded by an [`AttributeSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetChange {
    /// A current value was recomputed or replaced.
    Value {
        /// Attribute that changed
        definition: AttributeDefinition,
        /// Current value before the change
        old_value: f32,
        /// Current value after the change
        new_value: f32,
    },
    /// The bounds of an attribute moved.
    Range {
        /// Attribute whose bounds changed
        definition: AttributeDefinition,
        /// New lower bound
        min: f32,
        /// New upper bound
        max: f32,
    },
}

impl SetChange {
    /// Attribute the change refers to.
    #[must_use]
    pub const fn definition(&self) -> &AttributeDefinition {
        match self {
            Self::Value { definition, .. } | Self::Range { definition, .. } => definition,
        }
    }
}

// =============================================================================
// AttributeSet
// =============================================================================

/// The attribute values of one entity plus their dependency index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "AttributeSetData", try_from = "AttributeSetData")]
pub struct AttributeSet {
    id: AttributeSetId,
    values: Vec<AttributeValue>,
    /// Key -> position in `values`.
    positions: BTreeMap<String, usize>,
    /// Position -> positions of the values it reads.
    dependencies: Vec<Vec<usize>>,
    /// Position -> positions of the values that read it, in registration order.
    dependents: Vec<Vec<usize>>,
    recording: bool,
    changes: Vec<SetChange>,
}

impl AttributeSet {
    /// Builds a set and materializes every derived value.
    ///
    /// Values are recomputed once each in registration order, cascading to
    /// their dependents, so derived attributes are consistent on return.
    /// Dependencies that are not part of the set are ignored.
    ///
    /// # Errors
    ///
    /// - [`AttributeError::DuplicateAttribute`] if two values share a definition key
    /// - [`AttributeError::DependencyCycle`] if the dependency graph is cyclic
    pub fn new(id: AttributeSetId, values: Vec<AttributeValue>) -> AttributeResult<Self> {
        let mut set = Self::assemble(id, values)?;
        set.materialize();
        Ok(set)
    }

    /// Builds a set from `(definition, base, min, max)` tuples.
    ///
    /// # Errors
    ///
    /// Everything [`new`](Self::new) reports, plus
    /// [`AttributeError::InvalidRange`] for a tuple with `min > max`.
    pub fn from_entries(
        id: AttributeSetId,
        entries: impl IntoIterator<Item = (AttributeDefinition, f32, f32, f32)>,
    ) -> AttributeResult<Self> {
        let values = entries
            .into_iter()
            .map(|(definition, base, min, max)| AttributeValue::new(definition, base, min, max))
            .collect::<AttributeResult<Vec<_>>>()?;
        Self::new(id, values)
    }

    /// Validates and indexes values without recomputing anything.
    fn assemble(id: AttributeSetId, values: Vec<AttributeValue>) -> AttributeResult<Self> {
        let mut positions = BTreeMap::new();
        for (position, value) in values.iter().enumerate() {
            let key = value.definition().key().to_string();
            if positions.insert(key.clone(), position).is_some() {
                return Err(AttributeError::DuplicateAttribute { key });
            }
        }

        let dependencies: Vec<Vec<usize>> = values
            .iter()
            .map(|value| {
                value
                    .dependencies()
                    .iter()
                    .filter_map(|key| positions.get(*key).copied())
                    .collect()
            })
            .collect();

        let mut dependents = vec![Vec::new(); values.len()];
        for (position, reads) in dependencies.iter().enumerate() {
            for &dependency in reads {
                if !dependents[dependency].contains(&position) {
                    dependents[dependency].push(position);
                }
            }
        }

        let cyclic = nodes_on_cycles(&dependents, &dependencies);
        if !cyclic.is_empty() {
            return Err(AttributeError::DependencyCycle {
                keys: cyclic
                    .into_iter()
                    .map(|position| values[position].definition().key().to_string())
                    .collect(),
            });
        }

        Ok(Self {
            id,
            values,
            positions,
            dependencies,
            dependents,
            recording: false,
            changes: Vec::new(),
        })
    }

    fn materialize(&mut self) {
        for position in 0..self.values.len() {
            self.set_current_at(position, None, None);
        }
    }

    /// Returns a copy with another id and an empty, disabled change log.
    #[must_use]
    pub fn clone_with_id(&self, id: AttributeSetId) -> Self {
        let mut copy = self.clone();
        copy.id = id;
        copy.recording = false;
        copy.changes.clear();
        copy
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Returns the set id.
    #[must_use]
    pub const fn id(&self) -> AttributeSetId {
        self.id
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the set holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn position(&self, definition: &AttributeDefinition) -> Option<usize> {
        self.positions.get(definition.key()).copied()
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn get_attribute(&self, definition: &AttributeDefinition) -> Option<&AttributeValue> {
        self.position(definition).map(|position| &self.values[position])
    }

    /// Looks up an attribute by key.
    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&AttributeValue> {
        self.positions.get(key).map(|&position| &self.values[position])
    }

    /// True if the set holds `definition`.
    #[must_use]
    pub fn has_attribute(&self, definition: &AttributeDefinition) -> bool {
        self.positions.contains_key(definition.key())
    }

    /// Current value of an attribute.
    #[must_use]
    pub fn current_value(&self, definition: &AttributeDefinition) -> Option<f32> {
        self.get_attribute(definition).map(AttributeValue::current_value)
    }

    /// Base value of an attribute.
    #[must_use]
    pub fn base_value(&self, definition: &AttributeDefinition) -> Option<f32> {
        self.get_attribute(definition).map(AttributeValue::base_value)
    }

    /// Iterates values in registration order.
    pub fn values(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.iter()
    }

    /// Iterates definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.values.iter().map(AttributeValue::definition)
    }

    /// Definitions that directly depend on `definition`, in registration order.
    #[must_use]
    pub fn dependents_of(&self, definition: &AttributeDefinition) -> Vec<&AttributeDefinition> {
        self.position(definition)
            .map(|position| {
                self.dependents[position]
                    .iter()
                    .map(|&dependent| self.values[dependent].definition())
                    .collect()
            })
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Recomputes an attribute with an optional modifier, then cascades.
    ///
    /// Every transitive dependent is recomputed once, without the
    /// modifier but with the same source snapshot. Records one change for
    /// the attribute itself and one per recomputed dependent.
    ///
    /// Returns `false` if the attribute is not in the set.
    pub fn set_attribute_current_value(
        &mut self,
        definition: &AttributeDefinition,
        modifier: Option<&mut AttributeModifier>,
        source: Option<&SourceAttributes>,
    ) -> bool {
        match self.position(definition) {
            Some(position) => {
                self.set_current_at(position, modifier, source);
                true
            }
            None => false,
        }
    }

    fn set_current_at(
        &mut self,
        root: usize,
        modifier: Option<&mut AttributeModifier>,
        source: Option<&SourceAttributes>,
    ) {
        self.recompute(root, modifier, source);

        let (order, complete) = cascade_order(&self.dependents, &self.dependencies, root);
        if !complete {
            tracing::warn!(
                set = %self.id,
                attribute = self.values[root].definition().key(),
                "dependency cycle reached during cascade, skipping remaining dependents"
            );
        }
        for position in order {
            tracing::trace!(
                set = %self.id,
                from = self.values[root].definition().key(),
                to = self.values[position].definition().key(),
                "cascade"
            );
            self.recompute(position, None, source);
        }
    }

    fn recompute(
        &mut self,
        position: usize,
        modifier: Option<&mut AttributeModifier>,
        source: Option<&SourceAttributes>,
    ) {
        let reads: Vec<(&'static str, f32)> = self.values[position]
            .dependencies()
            .iter()
            .filter_map(|key| {
                self.positions
                    .get(*key)
                    .map(|&dependency| (*key, self.values[dependency].current_value()))
            })
            .collect();

        let value = &mut self.values[position];
        let old_value = value.current_value();
        value.compute_value(&reads, modifier, source);
        let new_value = value.current_value();
        self.record_value(position, old_value, new_value);
    }

    /// Sets an attribute's base value (current follows). Does not cascade.
    ///
    /// Returns `false` if the attribute is not in the set.
    pub fn set_attribute_base_value(&mut self, definition: &AttributeDefinition, value: f32) -> bool {
        let Some(position) = self.position(definition) else {
            return false;
        };
        let old_value = self.values[position].current_value();
        self.values[position].set_base_value(value);
        let new_value = self.values[position].current_value();
        self.record_value(position, old_value, new_value);
        true
    }

    /// Moves an attribute's lower bound. Does not cascade.
    ///
    /// Returns `Ok(false)` if the attribute is not in the set.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidRange`] if the new min exceeds the max.
    pub fn set_attribute_min_value(
        &mut self,
        definition: &AttributeDefinition,
        min: f32,
    ) -> AttributeResult<bool> {
        let Some(position) = self.position(definition) else {
            return Ok(false);
        };
        self.values[position].set_min_value(min)?;
        self.record_range(position);
        Ok(true)
    }

    /// Moves an attribute's upper bound. Does not cascade.
    ///
    /// Returns `Ok(false)` if the attribute is not in the set.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidRange`] if the new max is below the min.
    pub fn set_attribute_max_value(
        &mut self,
        definition: &AttributeDefinition,
        max: f32,
    ) -> AttributeResult<bool> {
        let Some(position) = self.position(definition) else {
            return Ok(false);
        };
        self.values[position].set_max_value(max)?;
        self.record_range(position);
        Ok(true)
    }

    /// Restores every current value to its base and recomputes derived values.
    ///
    /// Records one change per attribute whose current value moved.
    pub fn reset(&mut self) {
        let before: Vec<f32> = self.values.iter().map(AttributeValue::current_value).collect();
        let recording = std::mem::replace(&mut self.recording, false);

        for value in &mut self.values {
            value.reset();
        }
        self.materialize();

        self.recording = recording;
        for (position, old_value) in before.into_iter().enumerate() {
            let new_value = self.values[position].current_value();
            if (old_value - new_value).abs() > f32::EPSILON {
                self.record_value(position, old_value, new_value);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Change log
    // -------------------------------------------------------------------------

    /// Turns change recording on or off. Turning it off drops pending changes.
    pub fn set_change_recording(&mut self, enabled: bool) {
        self.recording = enabled;
        if !enabled {
            self.changes.clear();
        }
    }

    /// True if changes are being recorded.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Drains recorded changes in the order they happened.
    pub fn take_changes(&mut self) -> Vec<SetChange> {
        std::mem::take(&mut self.changes)
    }

    fn record_value(&mut self, position: usize, old_value: f32, new_value: f32) {
        if self.recording {
            self.changes.push(SetChange::Value {
                definition: self.values[position].definition().clone(),
                old_value,
                new_value,
            });
        }
    }

    fn record_range(&mut self, position: usize) {
        if self.recording {
            let value = &self.values[position];
            self.changes.push(SetChange::Range {
                definition: value.definition().clone(),
                min: value.min_value(),
                max: value.max_value(),
            });
        }
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "AttributeSet {}", self.id)?;
        for value in &self.values {
            writeln!(f, "  {value}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// Serialized form of a set: indexes are rebuilt on load.
#[derive(Serialize, Deserialize)]
struct AttributeSetData {
    id: AttributeSetId,
    values: Vec<AttributeValue>,
}

impl From<AttributeSet> for AttributeSetData {
    fn from(set: AttributeSet) -> Self {
        Self {
            id: set.id,
            values: set.values,
        }
    }
}

impl TryFrom<AttributeSetData> for AttributeSet {
    type Error = AttributeError;

    fn try_from(data: AttributeSetData) -> Result<Self, Self::Error> {
        Self::assemble(data.id, data.values)
    }
}

// =============================================================================
// Graph helpers
// =============================================================================

/// Dependents reachable from `root`, ordered so each comes after all of its
/// reachable dependencies. Ties go to the lower position.
///
/// The second element is `false` if a cycle kept some reachable node from
/// ever becoming ready.
fn cascade_order(
    dependents: &[Vec<usize>],
    dependencies: &[Vec<usize>],
    root: usize,
) -> (Vec<usize>, bool) {
    let mut reachable = vec![false; dependents.len()];
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        for &next in &dependents[node] {
            if next != root && !reachable[next] {
                reachable[next] = true;
                stack.push(next);
            }
        }
    }

    let mut pending = vec![0usize; dependents.len()];
    let mut ready = BTreeSet::new();
    let mut total = 0;
    for node in (0..dependents.len()).filter(|&node| reachable[node]) {
        total += 1;
        pending[node] = dependencies[node]
            .iter()
            .filter(|&&dependency| reachable[dependency])
            .count();
        if pending[node] == 0 {
            ready.insert(node);
        }
    }

    let mut order = Vec::with_capacity(total);
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &next in &dependents[node] {
            if reachable[next] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.insert(next);
                }
            }
        }
    }

    let complete = order.len() == total;
    (order, complete)
}

/// Positions that sit on (or behind) a dependency cycle, ascending.
fn nodes_on_cycles(dependents: &[Vec<usize>], dependencies: &[Vec<usize>]) -> Vec<usize> {
    let mut pending: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut ready: Vec<usize> = (0..pending.len()).filter(|&node| pending[node] == 0).collect();
    let mut settled = vec![false; pending.len()];

    while let Some(node) = ready.pop() {
        settled[node] = true;
        for &next in &dependents[node] {
            pending[next] -= 1;
            if pending[next] == 0 {
                ready.push(next);
            }
        }
    }

    (0..settled.len()).filter(|&node| !settled[node]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::definition::AttributeRegistry;
    use crate::ids::ModifierId;
    use crate::modifier::ModifierOperation;

    fn registry() -> AttributeRegistry {
        AttributeRegistry::with_builtin()
    }

    fn def(key: &str) -> AttributeDefinition {
        registry().get_by_key(key).unwrap().clone()
    }

    fn character() -> AttributeSet {
        AttributeSet::from_entries(
            AttributeSetId::new(1),
            [
                (def(catalog::CONSTITUTION), 2.0, 0.0, 100.0),
                (def(catalog::MAX_HEALTH), 100.0, 0.0, 10_000.0),
                (def(catalog::HEALTH), 300.0, 0.0, 10_000.0),
                (def(catalog::SPEED), 5.0, 0.0, 20.0),
            ],
        )
        .unwrap()
    }

    fn add(key: &str, value: f32) -> AttributeModifier {
        AttributeModifier::new(ModifierId::new(1), def(key), ModifierOperation::Add, value).unwrap()
    }

    mod construction_tests {
        use super::*;

        #[test]
        fn derived_values_materialized() {
            let set = character();
            assert_eq!(set.current_value(&def(catalog::MAX_HEALTH)), Some(300.0));
            assert_eq!(set.current_value(&def(catalog::HEALTH)), Some(300.0));
            assert_eq!(set.current_value(&def(catalog::SPEED)), Some(5.0));
        }

        #[test]
        fn duplicate_definition_rejected() {
            let err = AttributeSet::from_entries(
                AttributeSetId::new(1),
                [
                    (def(catalog::SPEED), 1.0, 0.0, 10.0),
                    (def(catalog::SPEED), 2.0, 0.0, 10.0),
                ],
            )
            .unwrap_err();
            assert_eq!(
                err,
                AttributeError::DuplicateAttribute {
                    key: catalog::SPEED.to_string()
                }
            );
        }

        #[test]
        fn invalid_range_rejected() {
            let err = AttributeSet::from_entries(
                AttributeSetId::new(1),
                [(def(catalog::SPEED), 1.0, 10.0, 0.0)],
            )
            .unwrap_err();
            assert!(matches!(err, AttributeError::InvalidRange { .. }));
        }

        #[test]
        fn missing_dependency_is_not_an_error() {
            let set = AttributeSet::from_entries(
                AttributeSetId::new(1),
                [(def(catalog::HEALTH), 40.0, 0.0, 100.0)],
            )
            .unwrap();
            assert_eq!(set.current_value(&def(catalog::HEALTH)), Some(40.0));
        }

        #[test]
        fn reverse_index() {
            let set = character();
            let dependents = set.dependents_of(&def(catalog::CONSTITUTION));
            assert_eq!(dependents.len(), 1);
            assert_eq!(dependents[0].key(), catalog::MAX_HEALTH);
            assert!(set.dependents_of(&def(catalog::SPEED)).is_empty());
        }
    }

    mod cascade_tests {
        use super::*;

        #[test]
        fn modifier_on_health_clamps_to_max() {
            let mut set = character();
            let mut hit = add(catalog::HEALTH, -50.0);
            assert!(set.set_attribute_current_value(&def(catalog::HEALTH), Some(&mut hit), None));
            assert_eq!(set.current_value(&def(catalog::HEALTH)), Some(250.0));

            let mut heal = add(catalog::HEALTH, 500.0);
            set.set_attribute_current_value(&def(catalog::HEALTH), Some(&mut heal), None);
            assert_eq!(set.current_value(&def(catalog::HEALTH)), Some(300.0));
        }

        #[test]
        fn constitution_change_reaches_health() {
            let mut set = character();
            let mut buff = add(catalog::CONSTITUTION, 1.0);
            set.set_attribute_current_value(&def(catalog::CONSTITUTION), Some(&mut buff), None);

            assert_eq!(set.current_value(&def(catalog::MAX_HEALTH)), Some(400.0));
            // Full health stays full when the ceiling rises.
            assert_eq!(set.current_value(&def(catalog::HEALTH)), Some(400.0));
        }

        #[test]
        fn each_dependent_recomputed_once() {
            let mut set = character();
            set.set_change_recording(true);

            let mut buff = add(catalog::CONSTITUTION, 1.0);
            set.set_attribute_current_value(&def(catalog::CONSTITUTION), Some(&mut buff), None);

            let keys: Vec<String> = set
                .take_changes()
                .iter()
                .map(|change| change.definition().key().to_string())
                .collect();
            assert_eq!(
                keys,
                vec![
                    catalog::CONSTITUTION.to_string(),
                    catalog::MAX_HEALTH.to_string(),
                    catalog::HEALTH.to_string(),
                ]
            );
        }

        #[test]
        fn unrelated_change_does_not_cascade() {
            let mut set = character();
            set.set_change_recording(true);
            let mut haste = add(catalog::SPEED, 2.0);
            set.set_attribute_current_value(&def(catalog::SPEED), Some(&mut haste), None);

            let changes = set.take_changes();
            assert_eq!(changes.len(), 1);
            assert_eq!(
                changes[0],
                SetChange::Value {
                    definition: def(catalog::SPEED),
                    old_value: 5.0,
                    new_value: 7.0
                }
            );
        }

        #[test]
        fn unknown_attribute_is_a_miss() {
            let mut set = character();
            let mut m = add(catalog::THRUST, 1.0);
            assert!(!set.set_attribute_current_value(&def(catalog::THRUST), Some(&mut m), None));
        }
    }

    mod direct_mutation_tests {
        use super::*;

        #[test]
        fn base_value_does_not_cascade() {
            let mut set = character();
            set.set_change_recording(true);
            assert!(set.set_attribute_base_value(&def(catalog::CONSTITUTION), 5.0));

            assert_eq!(set.current_value(&def(catalog::CONSTITUTION)), Some(5.0));
            assert_eq!(set.current_value(&def(catalog::MAX_HEALTH)), Some(300.0));
            assert_eq!(set.take_changes().len(), 1);
        }

        #[test]
        fn range_changes_are_recorded() {
            let mut set = character();
            set.set_change_recording(true);
            assert!(set.set_attribute_max_value(&def(catalog::SPEED), 3.0).unwrap());
            assert_eq!(set.current_value(&def(catalog::SPEED)), Some(3.0));

            assert_eq!(
                set.take_changes(),
                vec![SetChange::Range {
                    definition: def(catalog::SPEED),
                    min: 0.0,
                    max: 3.0
                }]
            );
        }

        #[test]
        fn invalid_range_propagates() {
            let mut set = character();
            assert!(set.set_attribute_min_value(&def(catalog::SPEED), 50.0).is_err());
            assert_eq!(set.set_attribute_min_value(&def(catalog::THRUST), 1.0), Ok(false));
        }

        #[test]
        fn reset_restores_bases() {
            let mut set = character();
            let mut haste = add(catalog::SPEED, 4.0);
            set.set_attribute_current_value(&def(catalog::SPEED), Some(&mut haste), None);
            let mut hit = add(catalog::HEALTH, -100.0);
            set.set_attribute_current_value(&def(catalog::HEALTH), Some(&mut hit), None);

            set.set_change_recording(true);
            set.reset();
            assert_eq!(set.current_value(&def(catalog::SPEED)), Some(5.0));
            assert_eq!(set.current_value(&def(catalog::HEALTH)), Some(300.0));
            assert_eq!(set.take_changes().len(), 2);
        }

        #[test]
        fn recording_off_by_default() {
            let mut set = character();
            set.set_attribute_base_value(&def(catalog::SPEED), 1.0);
            assert!(!set.is_recording());
            assert!(set.take_changes().is_empty());
        }
    }

    mod graph_tests {
        use super::*;

        fn invert(dependencies: &[Vec<usize>]) -> Vec<Vec<usize>> {
            let mut dependents = vec![Vec::new(); dependencies.len()];
            for (node, reads) in dependencies.iter().enumerate() {
                for &dependency in reads {
                    dependents[dependency].push(node);
                }
            }
            dependents
        }

        #[test]
        fn diamond_visits_each_node_once() {
            // 0 -> 1, 0 -> 2, {1, 2} -> 3
            let dependencies = vec![vec![], vec![0], vec![0], vec![1, 2]];
            let dependents = invert(&dependencies);

            let (order, complete) = cascade_order(&dependents, &dependencies, 0);
            assert!(complete);
            assert_eq!(order, vec![1, 2, 3]);
        }

        #[test]
        fn order_respects_dependencies_over_position() {
            // 0 -> 3 -> 1
            let dependencies = vec![vec![], vec![3], vec![], vec![0]];
            let dependents = invert(&dependencies);

            let (order, _) = cascade_order(&dependents, &dependencies, 0);
            assert_eq!(order, vec![3, 1]);
        }

        #[test]
        fn unreachable_nodes_are_skipped() {
            let dependencies = vec![vec![], vec![0], vec![]];
            let dependents = invert(&dependencies);
            let (order, _) = cascade_order(&dependents, &dependencies, 2);
            assert!(order.is_empty());
        }

        #[test]
        fn cycles_detected() {
            // 1 <-> 2, 1 also reads 0, 3 reads 2
            let dependencies = vec![vec![], vec![0, 2], vec![1], vec![2]];
            let dependents = invert(&dependencies);
            assert_eq!(nodes_on_cycles(&dependents, &dependencies), vec![1, 2, 3]);

            let (order, complete) = cascade_order(&dependents, &dependencies, 0);
            assert!(!complete);
            assert!(order.is_empty());
        }

        #[test]
        fn acyclic_graph_has_no_cycle_nodes() {
            let dependencies = vec![vec![], vec![0], vec![0], vec![1, 2]];
            let dependents = invert(&dependencies);
            assert!(nodes_on_cycles(&dependents, &dependencies).is_empty());
        }
    }

    #[test]
    fn clone_with_id_is_independent() {
        let mut set = character();
        set.set_change_recording(true);
        let copy = set.clone_with_id(AttributeSetId::new(9));
        assert_eq!(copy.id(), AttributeSetId::new(9));
        assert!(!copy.is_recording());

        set.set_attribute_base_value(&def(catalog::SPEED), 1.0);
        assert_eq!(copy.current_value(&def(catalog::SPEED)), Some(5.0));
    }

    #[test]
    fn serde_roundtrip_keeps_values_and_index() {
        let set = character();
        let json = serde_json::to_string(&set).unwrap();
        let mut restored: AttributeSet = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id(), set.id());
        assert_eq!(restored.current_value(&def(catalog::HEALTH)), Some(300.0));
        assert_eq!(restored.dependents_of(&def(catalog::MAX_HEALTH)).len(), 1);

        let mut hit = add(catalog::HEALTH, -10.0);
        restored.set_attribute_current_value(&def(catalog::HEALTH), Some(&mut hit), None);
        assert_eq!(restored.current_value(&def(catalog::HEALTH)), Some(290.0));
    }
}
