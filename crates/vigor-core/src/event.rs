//! Outward events and the sinks that receive them.
//!
//! The engine reports everything observable as a [`GameplayEvent`]:
//! attribute values and ranges that changed, and effects that were
//! applied, removed, refreshed or expired. The manager hands each event to
//! an [`EventSink`] after releasing its lock. Sinks are fire-and-forget;
//! a failing sink is logged and otherwise ignored.
//!
//! # Usage
//!
//! [`EventLog`] buffers events in memory and is drained with
//! `take_events()`, which is what tests and replay tooling use.
//! [`ChannelSink`] forwards to an `mpsc` receiver on another thread.
//!
//! ```
//! use vigor_core::event::{EventLog, EventSink, GameplayEvent, EventKind};
//! use vigor_attributes::{AttributeEffect, AttributeSetId, EffectId};
//!
//! let log = EventLog::new();
//! let effect = AttributeEffect::instant(EffectId::new(1), "Heal");
//! log.publish(&GameplayEvent::effect_applied(AttributeSetId::new(3), &effect)).unwrap();
//!
//! let events = log.take_events();
//! assert_eq!(events[0].kind(), EventKind::EffectApplied);
//! ```

use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use vigor_attributes::{AttributeDefinition, AttributeEffect, AttributeSetId, SetChange};

use crate::error::SinkError;

// =============================================================================
// Events
// =============================================================================

/// Discriminant of a [`GameplayEvent`], for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// See [`GameplayEvent::AttributeChanged`]
    AttributeChanged,
    /// See [`GameplayEvent::AttributeRangeChanged`]
    AttributeRangeChanged,
    /// See [`GameplayEvent::EffectApplied`]
    EffectApplied,
    /// See [`GameplayEvent::EffectRemoved`]
    EffectRemoved,
    /// See [`GameplayEvent::EffectRefreshed`]
    EffectRefreshed,
    /// See [`GameplayEvent::EffectExpired`]
    EffectExpired,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AttributeChanged => "attribute_changed",
            Self::AttributeRangeChanged => "attribute_range_changed",
            Self::EffectApplied => "effect_applied",
            Self::EffectRemoved => "effect_removed",
            Self::EffectRefreshed => "effect_refreshed",
            Self::EffectExpired => "effect_expired",
        };
        write!(f, "{name}")
    }
}

/// Something observable that happened to a registered attribute set.
///
/// Effect events carry a snapshot of the effect at the time of the event.
/// The target set is referenced by id; its live state is available from
/// the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameplayEvent {
    /// A current value changed (or was recomputed).
    AttributeChanged {
        /// Owning set
        set_id: AttributeSetId,
        /// Attribute that changed
        definition: AttributeDefinition,
        /// Value before
        old_value: f32,
        /// Value after
        new_value: f32,
    },
    /// The bounds of an attribute changed.
    AttributeRangeChanged {
        /// Owning set
        set_id: AttributeSetId,
        /// Attribute whose bounds changed
        definition: AttributeDefinition,
        /// New lower bound
        min: f32,
        /// New upper bound
        max: f32,
    },
    /// An effect's modifiers were applied (initially or by a periodic tick).
    EffectApplied {
        /// Target set
        target_id: AttributeSetId,
        /// Effect snapshot
        effect: Box<AttributeEffect>,
    },
    /// An effect was removed explicitly.
    EffectRemoved {
        /// Target set
        target_id: AttributeSetId,
        /// Effect snapshot
        effect: Box<AttributeEffect>,
    },
    /// An effect's expiry was pushed back.
    EffectRefreshed {
        /// Target set
        target_id: AttributeSetId,
        /// Effect snapshot
        effect: Box<AttributeEffect>,
    },
    /// An effect ran out of time.
    EffectExpired {
        /// Target set
        target_id: AttributeSetId,
        /// Effect snapshot
        effect: Box<AttributeEffect>,
    },
}

impl GameplayEvent {
    /// Builds an `EffectApplied` event.
    #[must_use]
    pub fn effect_applied(target_id: AttributeSetId, effect: &AttributeEffect) -> Self {
        Self::EffectApplied {
            target_id,
            effect: Box::new(effect.clone()),
        }
    }

    /// Builds an `EffectRemoved` event.
    #[must_use]
    pub fn effect_removed(target_id: AttributeSetId, effect: &AttributeEffect) -> Self {
        Self::EffectRemoved {
            target_id,
            effect: Box::new(effect.clone()),
        }
    }

    /// Builds an `EffectRefreshed` event.
    #[must_use]
    pub fn effect_refreshed(target_id: AttributeSetId, effect: &AttributeEffect) -> Self {
        Self::EffectRefreshed {
            target_id,
            effect: Box::new(effect.clone()),
        }
    }

    /// Builds an `EffectExpired` event.
    #[must_use]
    pub fn effect_expired(target_id: AttributeSetId, effect: &AttributeEffect) -> Self {
        Self::EffectExpired {
            target_id,
            effect: Box::new(effect.clone()),
        }
    }

    /// Converts a change recorded by a set into an event.
    #[must_use]
    pub fn from_set_change(set_id: AttributeSetId, change: SetChange) -> Self {
        match change {
            SetChange::Value {
                definition,
                old_value,
                new_value,
            } => Self::AttributeChanged {
                set_id,
                definition,
                old_value,
                new_value,
            },
            SetChange::Range {
                definition,
                min,
                max,
            } => Self::AttributeRangeChanged {
                set_id,
                definition,
                min,
                max,
            },
        }
    }

    /// Returns the discriminant.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::AttributeChanged { .. } => EventKind::AttributeChanged,
            Self::AttributeRangeChanged { .. } => EventKind::AttributeRangeChanged,
            Self::EffectApplied { .. } => EventKind::EffectApplied,
            Self::EffectRemoved { .. } => EventKind::EffectRemoved,
            Self::EffectRefreshed { .. } => EventKind::EffectRefreshed,
            Self::EffectExpired { .. } => EventKind::EffectExpired,
        }
    }

    /// Returns the set the event concerns.
    #[must_use]
    pub const fn set_id(&self) -> AttributeSetId {
        match self {
            Self::AttributeChanged { set_id, .. } | Self::AttributeRangeChanged { set_id, .. } => {
                *set_id
            }
            Self::EffectApplied { target_id, .. }
            | Self::EffectRemoved { target_id, .. }
            | Self::EffectRefreshed { target_id, .. }
            | Self::EffectExpired { target_id, .. } => *target_id,
        }
    }

    /// Returns the effect snapshot for effect events.
    #[must_use]
    pub fn effect(&self) -> Option<&AttributeEffect> {
        match self {
            Self::EffectApplied { effect, .. }
            | Self::EffectRemoved { effect, .. }
            | Self::EffectRefreshed { effect, .. }
            | Self::EffectExpired { effect, .. } => Some(effect),
            Self::AttributeChanged { .. } | Self::AttributeRangeChanged { .. } => None,
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Receiver of outward events.
///
/// Implementations must be `Send + Sync`; the manager may publish from
/// whichever thread called it.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the event could not be delivered. The
    /// manager logs the error and continues.
    fn publish(&self, event: &GameplayEvent) -> Result<(), SinkError>;
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &GameplayEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// In-memory sink that records events for later inspection.
///
/// # Thread Safety
///
/// The log is protected by a `Mutex` so it can be shared between the
/// manager and the code that drains it.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<GameplayEvent>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns all recorded events in publication order.
    pub fn take_events(&self) -> Vec<GameplayEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *events)
    }

    /// Number of events currently buffered.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    /// Discards all buffered events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for EventLog {
    fn publish(&self, event: &GameplayEvent) -> Result<(), SinkError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Sink that forwards events over an `mpsc` channel.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<GameplayEvent>,
}

impl ChannelSink {
    /// Wraps the sending half of a channel.
    #[must_use]
    pub fn new(sender: Sender<GameplayEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: &GameplayEvent) -> Result<(), SinkError> {
        self.sender
            .send(event.clone())
            .map_err(|_| SinkError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use vigor_attributes::EffectId;

    fn effect() -> AttributeEffect {
        AttributeEffect::timed(EffectId::new(4), "Burn", 3.0)
    }

    mod event_tests {
        use super::*;

        #[test]
        fn constructors_set_kind_and_target() {
            let target = AttributeSetId::new(2);
            let cases = [
                (GameplayEvent::effect_applied(target, &effect()), EventKind::EffectApplied),
                (GameplayEvent::effect_removed(target, &effect()), EventKind::EffectRemoved),
                (GameplayEvent::effect_refreshed(target, &effect()), EventKind::EffectRefreshed),
                (GameplayEvent::effect_expired(target, &effect()), EventKind::EffectExpired),
            ];
            for (event, kind) in cases {
                assert_eq!(event.kind(), kind);
                assert_eq!(event.set_id(), target);
                assert_eq!(event.effect().map(AttributeEffect::name), Some("Burn"));
            }
        }

        #[test]
        fn set_changes_convert() {
            let speed = AttributeDefinition::new(3, "Character.Speed", "Character");
            let event = GameplayEvent::from_set_change(
                AttributeSetId::new(1),
                SetChange::Value {
                    definition: speed.clone(),
                    old_value: 1.0,
                    new_value: 2.0,
                },
            );
            assert_eq!(event.kind(), EventKind::AttributeChanged);
            assert!(event.effect().is_none());

            let event = GameplayEvent::from_set_change(
                AttributeSetId::new(1),
                SetChange::Range {
                    definition: speed,
                    min: 0.0,
                    max: 4.0,
                },
            );
            assert_eq!(event.kind(), EventKind::AttributeRangeChanged);
        }

        #[test]
        fn kind_display() {
            assert_eq!(EventKind::EffectExpired.to_string(), "effect_expired");
        }

        #[test]
        fn serde_roundtrip() {
            let event = GameplayEvent::effect_applied(AttributeSetId::new(8), &effect());
            let json = serde_json::to_string(&event).unwrap();
            let restored: GameplayEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(restored, event);
        }
    }

    mod sink_tests {
        use super::*;

        #[test]
        fn event_log_drains_in_order() {
            let log = EventLog::new();
            assert!(log.is_empty());
            log.publish(&GameplayEvent::effect_applied(AttributeSetId::new(1), &effect()))
                .unwrap();
            log.publish(&GameplayEvent::effect_expired(AttributeSetId::new(1), &effect()))
                .unwrap();
            assert_eq!(log.event_count(), 2);

            let kinds: Vec<EventKind> = log.take_events().iter().map(GameplayEvent::kind).collect();
            assert_eq!(kinds, vec![EventKind::EffectApplied, EventKind::EffectExpired]);
            assert!(log.is_empty());
        }

        #[test]
        fn event_log_clear() {
            let log = EventLog::new();
            log.publish(&GameplayEvent::effect_applied(AttributeSetId::new(1), &effect()))
                .unwrap();
            log.clear();
            assert_eq!(log.event_count(), 0);
        }

        #[test]
        fn channel_sink_forwards() {
            let (tx, rx) = mpsc::channel();
            let sink = ChannelSink::new(tx);
            sink.publish(&GameplayEvent::effect_removed(AttributeSetId::new(5), &effect()))
                .unwrap();
            assert_eq!(rx.recv().unwrap().kind(), EventKind::EffectRemoved);
        }

        #[test]
        fn channel_sink_reports_disconnect() {
            let (tx, rx) = mpsc::channel();
            drop(rx);
            let sink = ChannelSink::new(tx);
            let result = sink.publish(&GameplayEvent::effect_removed(AttributeSetId::new(5), &effect()));
            assert_eq!(result, Err(SinkError::Disconnected));
        }

        #[test]
        fn null_sink_accepts_everything() {
            assert!(NullSink
                .publish(&GameplayEvent::effect_applied(AttributeSetId::new(1), &effect()))
                .is_ok());
        }
    }
}
