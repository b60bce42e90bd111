//! Attribute modifiers.
//!
//! A modifier is one arithmetic operation aimed at one attribute. Effects
//! carry a list of them and apply each through
//! [`AttributeSet::set_attribute_current_value`](crate::set::AttributeSet::set_attribute_current_value).
//!
//! Everything about a modifier is fixed at construction except its
//! magnitude: damage-style attribute kinds rewrite the magnitude from the
//! effect's source snapshot just before applying it.
//!
//! # Example
//!
//! ```
//! use vigor_attributes::definition::AttributeDefinition;
//! use vigor_attributes::ids::ModifierId;
//! use vigor_attributes::modifier::{AttributeModifier, ModifierOperation};
//!
//! let health = AttributeDefinition::new(0, "Character.Health", "Character");
//!
//! assert!(AttributeModifier::new(ModifierId::new(1), health.clone(), ModifierOperation::Percentage, 1500.0).is_err());
//!
//! let boost = AttributeModifier::new(ModifierId::new(2), health, ModifierOperation::Percentage, 50.0).unwrap();
//! assert!((boost.execute(100.0) - 150.0).abs() < 0.0001);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::definition::AttributeDefinition;
use crate::error::{AttributeError, AttributeResult};
use crate::ids::ModifierId;

/// Lowest accepted magnitude for [`ModifierOperation::Percentage`].
pub const PERCENTAGE_MIN: f32 = -100.0;

/// Highest accepted magnitude for [`ModifierOperation::Percentage`].
pub const PERCENTAGE_MAX: f32 = 1000.0;

// =============================================================================
// ModifierOperation
// =============================================================================

/// Arithmetic applied by a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierOperation {
    /// `base + value`
    Add,
    /// `base - value`
    Subtract,
    /// `base * value`; value must not be negative
    Multiply,
    /// `value`, discarding the base
    Override,
    /// `base * (1 + value / 100)`; value must lie in `[-100, 1000]`
    Percentage,
}

impl ModifierOperation {
    /// Short symbol used when rendering a modifier.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Override => "=",
            Self::Percentage => "%",
        }
    }

    /// Checks that `value` is an acceptable magnitude for this operation.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidModifierValue`] for non-finite
    /// values, negative `Multiply` values and `Percentage` values outside
    /// `[PERCENTAGE_MIN, PERCENTAGE_MAX]`.
    pub fn validate(self, value: f32) -> AttributeResult<()> {
        let valid = value.is_finite()
            && match self {
                Self::Multiply => value >= 0.0,
                Self::Percentage => (PERCENTAGE_MIN..=PERCENTAGE_MAX).contains(&value),
                Self::Add | Self::Subtract | Self::Override => true,
            };

        if valid {
            Ok(())
        } else {
            Err(AttributeError::InvalidModifierValue {
                operation: self,
                value,
            })
        }
    }
}

impl fmt::Display for ModifierOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Override => "Override",
            Self::Percentage => "Percentage",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// AttributeModifier
// =============================================================================

/// One operation targeting one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeModifier {
    id: ModifierId,
    target: AttributeDefinition,
    operation: ModifierOperation,
    value: f32,
    execution_order: i32,
    priority: i32,
}

impl AttributeModifier {
    /// Creates a modifier with execution order and priority 0.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidModifierValue`] if `value` is not
    /// accepted by `operation`.
    pub fn new(
        id: ModifierId,
        target: AttributeDefinition,
        operation: ModifierOperation,
        value: f32,
    ) -> AttributeResult<Self> {
        operation.validate(value)?;
        Ok(Self {
            id,
            target,
            operation,
            value,
            execution_order: 0,
            priority: 0,
        })
    }

    /// Sets the execution order and priority.
    ///
    /// Lower execution orders run first when an effect applies its modifiers.
    #[must_use]
    pub fn with_ordering(mut self, execution_order: i32, priority: i32) -> Self {
        self.execution_order = execution_order;
        self.priority = priority;
        self
    }

    /// Returns the modifier id.
    #[must_use]
    pub const fn id(&self) -> ModifierId {
        self.id
    }

    /// Returns the targeted attribute.
    #[must_use]
    pub const fn target(&self) -> &AttributeDefinition {
        &self.target
    }

    /// Returns the operation.
    #[must_use]
    pub const fn operation(&self) -> ModifierOperation {
        self.operation
    }

    /// Returns the current magnitude.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    /// Returns the execution order.
    #[must_use]
    pub const fn execution_order(&self) -> i32 {
        self.execution_order
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Replaces the magnitude.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::InvalidModifierValue`] if the operation
    /// rejects `value`; the previous magnitude is kept.
    pub fn set_value(&mut self, value: f32) -> AttributeResult<()> {
        self.operation.validate(value)?;
        self.value = value;
        Ok(())
    }

    /// Applies the operation to `base`.
    #[must_use]
    pub fn execute(&self, base: f32) -> f32 {
        match self.operation {
            ModifierOperation::Add => base + self.value,
            ModifierOperation::Subtract => base - self.value,
            ModifierOperation::Multiply => base * self.value,
            ModifierOperation::Override => self.value,
            ModifierOperation::Percentage => base * (1.0 + self.value / 100.0),
        }
    }

    /// Best-effort inverse of [`execute`](Self::execute).
    ///
    /// `Override` cannot be undone because the overridden value is gone, so
    /// it returns `modified` unchanged. A zero `Multiply` and a `-100`
    /// `Percentage` collapse everything to zero and are likewise returned
    /// unchanged.
    #[must_use]
    pub fn revert(&self, modified: f32) -> f32 {
        match self.operation {
            ModifierOperation::Add => modified - self.value,
            ModifierOperation::Subtract => modified + self.value,
            ModifierOperation::Multiply if self.value != 0.0 => modified / self.value,
            ModifierOperation::Percentage if self.value != PERCENTAGE_MIN => {
                modified / (1.0 + self.value / 100.0)
            }
            ModifierOperation::Multiply
            | ModifierOperation::Percentage
            | ModifierOperation::Override => modified,
        }
    }

    /// Returns a copy carrying a new id.
    #[must_use]
    pub fn instantiate(&self, id: ModifierId) -> Self {
        Self { id, ..self.clone() }
    }
}

impl fmt::Display for AttributeModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2}",
            self.target.key(),
            self.operation.symbol(),
            self.value
        )
    }
}
