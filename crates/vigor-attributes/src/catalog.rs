//! Built-in attribute catalog.
//!
//! Character and ship attributes shipped with the engine. Keys are exported
//! as constants so that attribute kinds and damage formulas can refer to
//! them without a registry lookup.

use crate::definition::AttributeDefinition;

// =============================================================================
// Character
// =============================================================================

/// Current hit points.
pub const HEALTH: &str = "Character.Health";
/// Hit point ceiling, derived from constitution.
pub const MAX_HEALTH: &str = "Character.MaxHealth";
/// Generic action resource.
pub const ENERGY: &str = "Character.Energy";
/// Base speed.
pub const SPEED: &str = "Character.Speed";

/// Intelligence core stat.
pub const INTELLIGENCE: &str = "Character.Core.Intelligence";
/// Perception core stat.
pub const PERCEPTION: &str = "Character.Core.Perception";
/// Charisma core stat.
pub const CHARISMA: &str = "Character.Core.Charisma";
/// Will core stat.
pub const WILL: &str = "Character.Core.Will";
/// Constitution core stat.
pub const CONSTITUTION: &str = "Character.Core.Constitution";
/// Agility core stat.
pub const AGILITY: &str = "Character.Core.Agility";

/// Derived life value.
pub const LIFE_VALUE: &str = "Character.Derived.LifeValue";
/// Derived mental value.
pub const MENTAL_VALUE: &str = "Character.Derived.MentalValue";
/// Derived movement speed.
pub const MOVEMENT_SPEED: &str = "Character.Derived.MovementSpeed";

// =============================================================================
// Ship
// =============================================================================

/// Current flux (shield load).
pub const FLUX: &str = "Ship.Core.Flux";
/// Flux capacity.
pub const MAX_FLUX: &str = "Ship.Core.MaxFlux";
/// Current armor.
pub const ARMOR: &str = "Ship.Core.Armor";
/// Armor capacity.
pub const MAX_ARMOR: &str = "Ship.Core.MaxArmor";
/// Current hull integrity.
pub const HULL: &str = "Ship.Core.Hull";
/// Hull capacity.
pub const MAX_HULL: &str = "Ship.Core.MaxHull";
/// Engine thrust.
pub const THRUST: &str = "Ship.Core.Thrust";

/// Raw weapon damage.
pub const WEAPON_DAMAGE: &str = "Ship.Weapon.Damage";
/// Damage multiplier applied against shields.
pub const DAMAGE_MULTIPLIER_VS_SHIELDS: &str = "Ship.Weapon.DamageMultiplierVsShields";
/// Fraction of shield damage that gets through.
pub const SHIELD_DAMAGE_REDUCTION: &str = "Ship.Weapon.ShieldDamageReduction";
/// Damage multiplier applied against armor.
pub const DAMAGE_MULTIPLIER_VS_ARMOR: &str = "Ship.Weapon.DamageMultiplierVsArmor";
/// Damage multiplier applied against hull.
pub const DAMAGE_MULTIPLIER_VS_HULL: &str = "Ship.Weapon.DamageMultiplierVsHull";

/// Every built-in key in id order. The index of a key is its id.
pub const BUILTIN_KEYS: [&str; 25] = [
    HEALTH,
    MAX_HEALTH,
    ENERGY,
    SPEED,
    INTELLIGENCE,
    PERCEPTION,
    CHARISMA,
    WILL,
    CONSTITUTION,
    AGILITY,
    LIFE_VALUE,
    MENTAL_VALUE,
    MOVEMENT_SPEED,
    FLUX,
    MAX_FLUX,
    ARMOR,
    MAX_ARMOR,
    HULL,
    MAX_HULL,
    THRUST,
    WEAPON_DAMAGE,
    DAMAGE_MULTIPLIER_VS_SHIELDS,
    SHIELD_DAMAGE_REDUCTION,
    DAMAGE_MULTIPLIER_VS_ARMOR,
    DAMAGE_MULTIPLIER_VS_HULL,
];

/// Returns the category of a dotted key: everything before the last `.`.
///
/// A key without a dot is its own category.
#[must_use]
pub fn category_of(key: &str) -> &str {
    key.rsplit_once('.').map_or(key, |(category, _)| category)
}

/// Builds the built-in definitions in id order.
#[must_use]
pub fn builtin_definitions() -> Vec<AttributeDefinition> {
    BUILTIN_KEYS
        .iter()
        .zip(0u32..)
        .map(|(key, id)| AttributeDefinition::new(id, key, category_of(key)))
        .collect()
}
