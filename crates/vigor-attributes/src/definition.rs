//! Attribute definitions and the registry that catalogs them.
//!
//! A definition is the immutable identity of an attribute kind: a numeric
//! id, a globally unique dotted key (`Character.Health`) and a category
//! (`Character`). The [`AttributeRegistry`] is an explicit value built once
//! at startup and handed to whatever needs to resolve keys. It has no
//! removal operation.
//!
//! # Example
//!
//! ```
//! use vigor_attributes::definition::{AttributeDefinition, AttributeRegistry};
//!
//! let mut registry = AttributeRegistry::new();
//! registry
//!     .register(AttributeDefinition::new(0, "Character.Health", "Character"))
//!     .unwrap();
//!
//! assert!(registry.get_by_key("Character.Health").is_some());
//! assert!(registry.get_by_id(7.into()).is_none());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::{AttributeError, AttributeResult};

// =============================================================================
// Identifiers
// =============================================================================

/// Numeric identity of an attribute definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId(u32);

impl AttributeId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AttributeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<AttributeId> for u32 {
    fn from(id: AttributeId) -> Self {
        id.0
    }
}

// =============================================================================
// AttributeDefinition
// =============================================================================

/// Identity and category metadata for one attribute kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeDefinition {
    id: AttributeId,
    key: String,
    category: String,
}

impl AttributeDefinition {
    /// Creates a definition.
    #[must_use]
    pub fn new(id: u32, key: &str, category: &str) -> Self {
        Self {
            id: AttributeId::new(id),
            key: key.to_string(),
            category: category.to_string(),
        }
    }

    /// Returns the numeric id.
    #[must_use]
    pub const fn id(&self) -> AttributeId {
        self.id
    }

    /// Returns the unique dotted key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the category (the key minus its last segment for built-ins).
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }
}

impl fmt::Display for AttributeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

// =============================================================================
// AttributeRegistry
// =============================================================================

/// Catalog of attribute definitions, indexed by key and by id.
///
/// Uses `BTreeMap` so that iteration is ordered by id, independent of
/// registration order or platform hashing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeRegistry {
    by_id: BTreeMap<AttributeId, AttributeDefinition>,
    key_index: BTreeMap<String, AttributeId>,
}

impl AttributeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in definition from
    /// [`catalog`](crate::catalog).
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for definition in catalog::builtin_definitions() {
            // Built-in ids and keys are distinct by construction.
            let _ = registry.register(definition);
        }
        registry
    }

    /// Adds a definition to the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::DuplicateKey`] if the key is taken and
    /// [`AttributeError::DuplicateId`] if the id is taken. The registry is
    /// left unchanged in both cases.
    pub fn register(&mut self, definition: AttributeDefinition) -> AttributeResult<()> {
        if self.key_index.contains_key(definition.key()) {
            return Err(AttributeError::DuplicateKey {
                key: definition.key().to_string(),
            });
        }
        if self.by_id.contains_key(&definition.id()) {
            return Err(AttributeError::DuplicateId {
                id: definition.id().as_u32(),
            });
        }

        self.key_index
            .insert(definition.key().to_string(), definition.id());
        self.by_id.insert(definition.id(), definition);
        Ok(())
    }

    /// Looks up a definition by key.
    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&AttributeDefinition> {
        self.key_index.get(key).and_then(|id| self.by_id.get(id))
    }

    /// Looks up a definition by id.
    #[must_use]
    pub fn get_by_id(&self, id: AttributeId) -> Option<&AttributeDefinition> {
        self.by_id.get(&id)
    }

    /// Returns true if a definition with this key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    /// Iterates all definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.by_id.values()
    }

    /// Iterates the definitions of one category in id order.
    pub fn by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a AttributeDefinition> + 'a {
        self.by_id
            .values()
            .filter(move |definition| definition.category() == category)
    }

    /// Returns the number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod registry_tests {
        use super::*;

        #[test]
        fn register_and_lookup() {
            let mut registry = AttributeRegistry::new();
            registry
                .register(AttributeDefinition::new(3, "Character.Speed", "Character"))
                .unwrap();

            let by_key = registry.get_by_key("Character.Speed").unwrap();
            assert_eq!(by_key.id(), AttributeId::new(3));
            assert_eq!(by_key.category(), "Character");

            let by_id = registry.get_by_id(AttributeId::new(3)).unwrap();
            assert_eq!(by_id.key(), "Character.Speed");
        }

        #[test]
        fn missing_lookups_return_none() {
            let registry = AttributeRegistry::new();
            assert!(registry.get_by_key("Nope").is_none());
            assert!(registry.get_by_id(AttributeId::new(99)).is_none());
            assert!(registry.is_empty());
        }

        #[test]
        fn duplicate_key_is_rejected() {
            let mut registry = AttributeRegistry::new();
            registry
                .register(AttributeDefinition::new(0, "A.Key", "A"))
                .unwrap();
            let err = registry
                .register(AttributeDefinition::new(1, "A.Key", "A"))
                .unwrap_err();

            assert_eq!(
                err,
                AttributeError::DuplicateKey {
                    key: "A.Key".to_string()
                }
            );
            assert_eq!(registry.len(), 1);
            assert!(registry.get_by_id(AttributeId::new(1)).is_none());
        }

        #[test]
        fn duplicate_id_is_rejected() {
            let mut registry = AttributeRegistry::new();
            registry
                .register(AttributeDefinition::new(0, "A.One", "A"))
                .unwrap();
            let err = registry
                .register(AttributeDefinition::new(0, "A.Two", "A"))
                .unwrap_err();

            assert_eq!(err, AttributeError::DuplicateId { id: 0 });
            assert!(!registry.contains_key("A.Two"));
        }

        #[test]
        fn iteration_is_ordered_by_id() {
            let mut registry = AttributeRegistry::new();
            registry
                .register(AttributeDefinition::new(5, "B", "X"))
                .unwrap();
            registry
                .register(AttributeDefinition::new(1, "A", "X"))
                .unwrap();
            registry
                .register(AttributeDefinition::new(3, "C", "Y"))
                .unwrap();

            let ids: Vec<u32> = registry.iter().map(|d| d.id().as_u32()).collect();
            assert_eq!(ids, vec![1, 3, 5]);

            let x: Vec<&str> = registry.by_category("X").map(AttributeDefinition::key).collect();
            assert_eq!(x, vec!["A", "B"]);
        }
    }

    mod builtin_tests {
        use super::*;

        #[test]
        fn builtin_registry_has_full_catalog() {
            let registry = AttributeRegistry::with_builtin();
            assert_eq!(registry.len(), 25);

            let health = registry.get_by_key(catalog::HEALTH).unwrap();
            assert_eq!(health.id(), AttributeId::new(0));

            let hull_mult = registry.get_by_id(AttributeId::new(24)).unwrap();
            assert_eq!(hull_mult.key(), catalog::DAMAGE_MULTIPLIER_VS_HULL);
            assert_eq!(hull_mult.category(), "Ship.Weapon");
        }

        #[test]
        fn builtin_categories() {
            let registry = AttributeRegistry::with_builtin();
            assert_eq!(registry.by_category("Character.Core").count(), 6);
            assert_eq!(registry.by_category("Ship.Core").count(), 7);
            assert_eq!(registry.by_category("Ship.Weapon").count(), 5);
        }
    }

    #[test]
    fn serde_roundtrip() {
        let registry = AttributeRegistry::with_builtin();
        let json = serde_json::to_string(&registry).unwrap();
        let restored: AttributeRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), registry.len());
        assert_eq!(
            restored.get_by_key(catalog::FLUX),
            registry.get_by_key(catalog::FLUX)
        );
    }
}
