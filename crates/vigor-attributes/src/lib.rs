//! # Vigor Attributes
//!
//! Data model for gameplay attributes and effects.
//!
//! The crate describes *what* an entity's numbers are and *how* a single
//! change propagates through them. It owns no clock and takes no locks;
//! time, storage of active effects and event publication live in
//! `vigor-core`.
//!
//! - **Definitions** ([`definition`], [`catalog`]): stable identity of each
//!   attribute kind, collected in an explicit [`AttributeRegistry`]
//! - **Values** ([`value`]): base/current/min/max with clamping and a
//!   closed set of compute strategies ([`AttributeKind`])
//! - **Sets** ([`set`]): all values of one entity with a dependency index
//!   and ordered cascade
//! - **Modifiers and effects** ([`modifier`], [`effect`]): the operations
//!   applied to values and the policies that bundle them
//!
//! ## Quick Start
//!
//! ```
//! use vigor_attributes::{
//!     catalog, AttributeModifier, AttributeRegistry, AttributeSet, AttributeSetId,
//!     ModifierId, ModifierOperation,
//! };
//!
//! let registry = AttributeRegistry::with_builtin();
//! let def = |key| registry.get_by_key(key).unwrap().clone();
//!
//! let mut hero = AttributeSet::from_entries(
//!     AttributeSetId::new(1),
//!     [
//!         (def(catalog::CONSTITUTION), 2.0, 0.0, 100.0),
//!         (def(catalog::MAX_HEALTH), 100.0, 0.0, 10_000.0),
//!         (def(catalog::HEALTH), 300.0, 0.0, 10_000.0),
//!     ],
//! )
//! .unwrap();
//!
//! let mut hit = AttributeModifier::new(
//!     ModifierId::new(1),
//!     def(catalog::HEALTH),
//!     ModifierOperation::Add,
//!     -50.0,
//! )
//! .unwrap();
//! hero.set_attribute_current_value(&def(catalog::HEALTH), Some(&mut hit), None);
//!
//! assert_eq!(hero.current_value(&def(catalog::HEALTH)), Some(250.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod definition;
pub mod effect;
pub mod error;
pub mod ids;
pub mod modifier;
pub mod set;
pub mod value;

// Re-exports for convenience
pub use definition::{AttributeDefinition, AttributeId, AttributeRegistry};
pub use effect::{
    AttributeEffect, Duration, EffectStatus, EffectTags, EffectType, GameplayEffectSource,
    SourceAttributes, SourceHandle, SourceType, StackingType,
};
pub use error::{AttributeError, AttributeResult};
pub use ids::{AttributeSetId, EffectId, IdGenerator, ModifierId};
pub use modifier::{AttributeModifier, ModifierOperation};
pub use set::{AttributeSet, SetChange};
pub use value::{AttributeKind, AttributeValue};
