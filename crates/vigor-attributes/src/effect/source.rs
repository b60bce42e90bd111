//! Effect source snapshots.
//!
//! When an effect is built for application it may capture where it came
//! from: the kind of source, an opaque handle to the originating object,
//! its location, and a copy of the attribute values that damage formulas
//! need. The snapshot is immutable once captured; later changes to the
//! originator do not leak into an effect already in flight.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::definition::AttributeDefinition;

/// Broad origin of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceType {
    /// Granted by an equipped item
    Equipment,
    /// Produced by an activated skill
    Skill,
    /// A buff or debuff applied by another effect
    Buff,
    /// Terrain, weather or hazards
    Environment,
    /// Engine-internal bookkeeping
    #[default]
    System,
}

/// Opaque handle to whatever produced an effect (an entity id, an item id).
///
/// The engine never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceHandle(u64);

impl SourceHandle {
    /// Wraps a raw handle.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Captured attribute values keyed by definition key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceAttributes(BTreeMap<String, f32>);

impl SourceAttributes {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value for `definition`, replacing any previous one.
    pub fn insert(&mut self, definition: &AttributeDefinition, value: f32) {
        self.0.insert(definition.key().to_string(), value);
    }

    /// Returns the captured value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f32> {
        self.0.get(key).copied()
    }

    /// Number of captured values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

/// Snapshot of an effect's origin.
///
/// # Example
///
/// ```
/// use glam::Vec2;
/// use vigor_attributes::catalog;
/// use vigor_attributes::definition::AttributeRegistry;
/// use vigor_attributes::effect::{GameplayEffectSource, SourceType};
///
/// let registry = AttributeRegistry::with_builtin();
/// let damage = registry.get_by_key(catalog::WEAPON_DAMAGE).unwrap();
///
/// let source = GameplayEffectSource::new(SourceType::Equipment)
///     .at(Vec2::new(10.0, 4.0))
///     .with_attribute(damage, 40.0);
///
/// assert_eq!(source.attribute(catalog::WEAPON_DAMAGE), Some(40.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameplayEffectSource {
    source_type: SourceType,
    source_object: Option<SourceHandle>,
    source_location: Vec2,
    attributes: SourceAttributes,
}

impl GameplayEffectSource {
    /// Creates an empty snapshot of the given type at the origin.
    #[must_use]
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            source_object: None,
            source_location: Vec2::ZERO,
            attributes: SourceAttributes::new(),
        }
    }

    /// Attaches the originating object.
    #[must_use]
    pub fn with_object(mut self, handle: SourceHandle) -> Self {
        self.source_object = Some(handle);
        self
    }

    /// Sets the location the effect originated from.
    #[must_use]
    pub fn at(mut self, location: Vec2) -> Self {
        self.source_location = location;
        self
    }

    /// Captures one attribute value.
    #[must_use]
    pub fn with_attribute(mut self, definition: &AttributeDefinition, value: f32) -> Self {
        self.attributes.insert(definition, value);
        self
    }

    /// Returns the source type.
    #[must_use]
    pub const fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Returns the originating object, if one was attached.
    #[must_use]
    pub const fn source_object(&self) -> Option<SourceHandle> {
        self.source_object
    }

    /// Returns the origin location.
    #[must_use]
    pub const fn source_location(&self) -> Vec2 {
        self.source_location
    }

    /// Returns the captured attribute values.
    #[must_use]
    pub const fn attributes(&self) -> &SourceAttributes {
        &self.attributes
    }

    /// Returns one captured value by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<f32> {
        self.attributes.get(key)
    }
}
