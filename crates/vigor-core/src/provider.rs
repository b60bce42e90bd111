//! Sources of attribute set and effect definitions.
//!
//! A [`DefinitionProvider`] hands out fresh instances by string id. The
//! engine mutates what it receives, so providers never return shared
//! instances: every call yields an independent copy with new ids.
//!
//! - [`TemplateProvider`]: builds instances from serde templates resolved
//!   against an [`AttributeRegistry`]
//! - [`CachingProvider`]: memoizes another provider and clones on hit
//!
//! # Example
//!
//! ```
//! use vigor_attributes::AttributeRegistry;
//! use vigor_core::provider::{DefinitionProvider, TemplateProvider};
//!
//! let json = r#"{
//!     "sets": {
//!         "scout": { "attributes": [
//!             { "key": "Character.Speed", "base": 6.0, "min": 0.0, "max": 20.0 }
//!         ] }
//!     },
//!     "effects": {
//!         "sprint": {
//!             "name": "Sprint",
//!             "effect_type": "Duration",
//!             "duration_seconds": 4.0,
//!             "modifiers": [ { "key": "Character.Speed", "operation": "Percentage", "value": 50.0 } ]
//!         }
//!     }
//! }"#;
//!
//! let provider = TemplateProvider::from_json_str(AttributeRegistry::with_builtin(), 7, json).unwrap();
//! let a = provider.get_effect_by_id("sprint").unwrap();
//! let b = provider.get_effect_by_id("sprint").unwrap();
//! assert_ne!(a.id(), b.id());
//! assert!(provider.get_attribute_set_by_id("scout").is_some());
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use vigor_attributes::{
    AttributeEffect, AttributeError, AttributeModifier, AttributeRegistry, AttributeResult,
    AttributeSet, Duration, EffectTags, EffectType, IdGenerator, ModifierOperation, StackingType,
};

use crate::error::ConfigError;

/// Lookup of attribute sets and effects by string id.
///
/// Implementations may cache, but must return an independent instance on
/// every call.
pub trait DefinitionProvider: Send + Sync {
    /// A fresh attribute set built from the definition `id`.
    fn get_attribute_set_by_id(&self, id: &str) -> Option<AttributeSet>;

    /// A fresh effect built from the definition `id`.
    fn get_effect_by_id(&self, id: &str) -> Option<AttributeEffect>;
}

// =============================================================================
// Templates
// =============================================================================

/// One attribute of a set template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSeed {
    /// Definition key
    pub key: String,
    /// Initial base value
    pub base: f32,
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
}

/// Data description of an attribute set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSetTemplate {
    /// Attributes in registration order
    pub attributes: Vec<AttributeSeed>,
}

/// Data description of a modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierTemplate {
    /// Target definition key
    pub key: String,
    /// Operation
    pub operation: ModifierOperation,
    /// Magnitude
    pub value: f32,
    /// Lower runs first
    #[serde(default)]
    pub execution_order: i32,
    /// Priority
    #[serde(default)]
    pub priority: i32,
}

fn default_max_stacks() -> u32 {
    1
}

/// Data description of an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTemplate {
    /// Display name, also the stacking key
    pub name: String,
    /// Free text
    #[serde(default)]
    pub description: String,
    /// Instant, Duration or Infinite
    pub effect_type: EffectType,
    /// Length of a Duration effect
    #[serde(default)]
    pub duration_seconds: f64,
    /// Modifiers in list order
    #[serde(default)]
    pub modifiers: Vec<ModifierTemplate>,
    /// Classification flags
    #[serde(default)]
    pub tags: EffectTags,
    /// Stacking policy
    #[serde(default)]
    pub stacking_type: StackingType,
    /// Stack cap
    #[serde(default = "default_max_stacks")]
    pub max_stacks: u32,
    /// Priority
    #[serde(default)]
    pub priority: i32,
    /// Passive effect
    #[serde(default)]
    pub passive: bool,
    /// Re-application interval; present means periodic
    #[serde(default)]
    pub interval_seconds: Option<f64>,
}

/// A document holding both kinds of template, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateDocument {
    /// Set templates
    pub sets: BTreeMap<String, AttributeSetTemplate>,
    /// Effect templates
    pub effects: BTreeMap<String, EffectTemplate>,
}

// =============================================================================
// TemplateProvider
// =============================================================================

/// Builds sets and effects from templates.
///
/// Keys unknown to the registry are skipped with a warning. Templates are
/// checked when added, so a template that would fail to build is rejected
/// up front.
#[derive(Debug)]
pub struct TemplateProvider {
    registry: AttributeRegistry,
    sets: BTreeMap<String, AttributeSetTemplate>,
    effects: BTreeMap<String, EffectTemplate>,
    ids: Mutex<IdGenerator>,
}

impl TemplateProvider {
    /// Creates an empty provider whose ids derive from `seed`.
    #[must_use]
    pub fn new(registry: AttributeRegistry, seed: u64) -> Self {
        Self {
            registry,
            sets: BTreeMap::new(),
            effects: BTreeMap::new(),
            ids: Mutex::new(IdGenerator::seeded(seed)),
        }
    }

    /// Loads every template from a JSON [`TemplateDocument`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, [`ConfigError::Invalid`]
    /// for a template that does not build.
    pub fn from_json_str(registry: AttributeRegistry, seed: u64, json: &str) -> Result<Self, ConfigError> {
        let document: TemplateDocument = serde_json::from_str(json)?;
        let mut provider = Self::new(registry, seed);
        for (id, template) in document.sets {
            provider
                .add_set_template(&id, template)
                .map_err(|err| invalid_template("sets", &id, &err))?;
        }
        for (id, template) in document.effects {
            provider
                .add_effect_template(&id, template)
                .map_err(|err| invalid_template("effects", &id, &err))?;
        }
        Ok(provider)
    }

    /// Adds or replaces a set template.
    ///
    /// # Errors
    ///
    /// Whatever building the set reports: an invalid range, a duplicate
    /// attribute or a dependency cycle.
    pub fn add_set_template(&mut self, id: &str, template: AttributeSetTemplate) -> AttributeResult<()> {
        self.build_set(&template)?;
        self.sets.insert(id.to_string(), template);
        Ok(())
    }

    /// Adds or replaces an effect template.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidModifierValue`] for a modifier the
    /// operation does not accept.
    pub fn add_effect_template(&mut self, id: &str, template: EffectTemplate) -> AttributeResult<()> {
        self.build_effect(&template)?;
        self.effects.insert(id.to_string(), template);
        Ok(())
    }

    /// The registry templates resolve against.
    #[must_use]
    pub const fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    fn with_ids<R>(&self, f: impl FnOnce(&mut IdGenerator) -> R) -> R {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut ids)
    }

    fn build_set(&self, template: &AttributeSetTemplate) -> AttributeResult<AttributeSet> {
        let entries: Vec<_> = template
            .attributes
            .iter()
            .filter_map(|seed| match self.registry.get_by_key(&seed.key) {
                Some(definition) => Some((definition.clone(), seed.base, seed.min, seed.max)),
                None => {
                    tracing::warn!(key = seed.key.as_str(), "unknown attribute key in set template, skipping");
                    None
                }
            })
            .collect();
        let id = self.with_ids(IdGenerator::next_set_id);
        AttributeSet::from_entries(id, entries)
    }

    fn build_effect(&self, template: &EffectTemplate) -> AttributeResult<AttributeEffect> {
        let duration = match template.effect_type {
            EffectType::Instant => Duration::finite(0.0),
            EffectType::Duration => Duration::finite(template.duration_seconds),
            EffectType::Infinite => Duration::infinite(),
        };

        self.with_ids(|ids| -> AttributeResult<AttributeEffect> {
            let mut effect = AttributeEffect::new(
                ids.next_effect_id(),
                &template.name,
                template.effect_type,
                duration,
            )
            .with_description(&template.description)
            .with_tags(template.tags)
            .with_stacking(template.stacking_type, template.max_stacks)
            .with_priority(template.priority);
            if template.passive {
                effect = effect.passive();
            }
            if let Some(interval) = template.interval_seconds {
                effect = effect.periodic(interval);
            }

            for modifier in &template.modifiers {
                let Some(definition) = self.registry.get_by_key(&modifier.key) else {
                    tracing::warn!(
                        key = modifier.key.as_str(),
                        effect = template.name.as_str(),
                        "unknown attribute key in effect template, skipping modifier"
                    );
                    continue;
                };
                effect.add_modifier(
                    AttributeModifier::new(
                        ids.next_modifier_id(),
                        definition.clone(),
                        modifier.operation,
                        modifier.value,
                    )?
                    .with_ordering(modifier.execution_order, modifier.priority),
                );
            }
            Ok(effect)
        })
    }
}

fn invalid_template(kind: &'static str, id: &str, err: &AttributeError) -> ConfigError {
    ConfigError::Invalid {
        field: kind,
        reason: format!("template `{id}`: {err}"),
    }
}

impl DefinitionProvider for TemplateProvider {
    fn get_attribute_set_by_id(&self, id: &str) -> Option<AttributeSet> {
        let template = self.sets.get(id)?;
        self.build_set(template)
            .map_err(|err| tracing::warn!(template = id, %err, "set template failed to build"))
            .ok()
    }

    fn get_effect_by_id(&self, id: &str) -> Option<AttributeEffect> {
        let template = self.effects.get(id)?;
        self.build_effect(template)
            .map_err(|err| tracing::warn!(template = id, %err, "effect template failed to build"))
            .ok()
    }
}

// =============================================================================
// CachingProvider
// =============================================================================

/// Memoizes another provider.
///
/// The first lookup of an id goes to the inner provider; later lookups
/// clone the cached value and give the clone fresh ids. Misses are not
/// cached.
#[derive(Debug)]
pub struct CachingProvider<P> {
    inner: P,
    sets: Mutex<BTreeMap<String, AttributeSet>>,
    effects: Mutex<BTreeMap<String, AttributeEffect>>,
    ids: Mutex<IdGenerator>,
}

impl<P: DefinitionProvider> CachingProvider<P> {
    /// Wraps `inner`; `seed` drives the ids given to cache hits.
    #[must_use]
    pub fn new(inner: P, seed: u64) -> Self {
        Self {
            inner,
            sets: Mutex::new(BTreeMap::new()),
            effects: Mutex::new(BTreeMap::new()),
            ids: Mutex::new(IdGenerator::seeded(seed)),
        }
    }

    /// The wrapped provider.
    #[must_use]
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached entries (sets plus effects).
    #[must_use]
    pub fn cached_len(&self) -> usize {
        let sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner).len();
        let effects = self.effects.lock().unwrap_or_else(PoisonError::into_inner).len();
        sets + effects
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.effects.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl<P: DefinitionProvider> DefinitionProvider for CachingProvider<P> {
    fn get_attribute_set_by_id(&self, id: &str) -> Option<AttributeSet> {
        let mut cache = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(id) {
            let fresh = self
                .ids
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .next_set_id();
            return Some(cached.clone_with_id(fresh));
        }
        let set = self.inner.get_attribute_set_by_id(id)?;
        cache.insert(id.to_string(), set.clone());
        Some(set)
    }

    fn get_effect_by_id(&self, id: &str) -> Option<AttributeEffect> {
        let mut cache = self.effects.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(id) {
            let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
            return Some(cached.instantiate(&mut ids));
        }
        let effect = self.inner.get_effect_by_id(id)?;
        cache.insert(id.to_string(), effect.clone());
        Some(effect)
    }
}
