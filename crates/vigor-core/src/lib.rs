//! # Vigor Core
//!
//! Runtime for gameplay attributes and effects.
//!
//! This crate drives the data model from `vigor-attributes` through time:
//! effects are applied, stacked, re-applied on a schedule and retired when
//! they run out, and every observable change is reported as an event.
//!
//! ## Architecture
//!
//! - **Engine** ([`engine`]): per-target effect state, the five-way
//!   application dispatch, and the expiry and periodic sweeps
//! - **Manager** ([`manager`]): registered sets plus the engine behind one
//!   lock; the host's single entry point
//! - **Events** ([`event`]): outward notifications and the sinks that
//!   receive them
//! - **Providers** ([`provider`]): data-driven construction of sets and
//!   effects
//! - **Clock and config** ([`clock`], [`config`]): simulated time and tuning
//!
//! The simulation is tick-driven and synchronous. The host calls
//! [`AttributeManager::update_effect_durations`] once per frame or fixed
//! step; there is no background thread.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use vigor_core::{AttributeManager, EngineConfig, EventLog};
//! use vigor_core::attributes::{
//!     catalog, AttributeEffect, AttributeModifier, AttributeRegistry, AttributeSet,
//!     AttributeSetId, EffectId, ModifierId, ModifierOperation,
//! };
//!
//! let registry = AttributeRegistry::with_builtin();
//! let def = |key| registry.get_by_key(key).unwrap().clone();
//!
//! let log = Arc::new(EventLog::new());
//! let manager = AttributeManager::new(log.clone(), EngineConfig::default());
//!
//! let hero = AttributeSetId::new(1);
//! manager
//!     .register_attribute_set(
//!         AttributeSet::from_entries(
//!             hero,
//!             [
//!                 (def(catalog::CONSTITUTION), 2.0, 0.0, 100.0),
//!                 (def(catalog::MAX_HEALTH), 100.0, 0.0, 10_000.0),
//!                 (def(catalog::HEALTH), 300.0, 0.0, 10_000.0),
//!             ],
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let hit = AttributeEffect::instant(EffectId::new(1), "Hit").with_modifier(
//!     AttributeModifier::new(ModifierId::new(1), def(catalog::HEALTH), ModifierOperation::Add, -50.0)
//!         .unwrap(),
//! );
//! manager.apply_effect(hero, hit);
//!
//! assert_eq!(manager.attribute_value(hero, &def(catalog::HEALTH)), Some(250.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export the data model
pub use vigor_attributes as attributes;

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod manager;
pub mod provider;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use clock::SimClock;
pub use config::EngineConfig;
pub use engine::{ActiveEffect, EffectEngine, PeriodicEffect, StackCounter, TargetEffects};
pub use error::{ConfigError, ManagerError, SinkError};
pub use event::{ChannelSink, EventKind, EventLog, EventSink, GameplayEvent, NullSink};
pub use manager::{AttributeManager, ManagerStatus};
pub use provider::{
    AttributeSeed, AttributeSetTemplate, CachingProvider, DefinitionProvider, EffectTemplate,
    ModifierTemplate, TemplateDocument, TemplateProvider,
};
