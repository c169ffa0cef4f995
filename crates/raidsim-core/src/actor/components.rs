//! Attack and defense data attached to actors.

use serde::{Deserialize, Serialize};

use crate::resource::ResourceKind;
use crate::time::SimTime;

/// Divisor turning attack power into weapon damage per second of swing time.
pub const AP_PER_DPS: f64 = 14.0;

/// A melee weapon.
///
/// # Example
///
/// ```
/// use raidsim_core::actor::Weapon;
/// use raidsim_core::time::SimTime;
///
/// let paws = Weapon::new(100.0, 150.0, SimTime::from_millis(2500));
/// assert_eq!(paws.average_damage(0.0), 125.0);
/// assert_eq!(paws.average_damage(1400.0), 375.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Low end of the damage range.
    pub min_damage: f64,
    /// High end of the damage range.
    pub max_damage: f64,
    /// Unhasted swing interval.
    pub speed: SimTime,
}

impl Weapon {
    /// Creates a weapon.
    #[must_use]
    pub const fn new(min_damage: f64, max_damage: f64, speed: SimTime) -> Self {
        Self {
            min_damage,
            max_damage,
            speed,
        }
    }

    /// Attack-power bonus of one hit: `AP / 14 * speed`.
    #[must_use]
    pub fn power_bonus(&self, attack_power: f64) -> f64 {
        attack_power / AP_PER_DPS * self.speed.as_secs_f64()
    }

    /// Expected damage of one hit.
    #[must_use]
    pub fn average_damage(&self, attack_power: f64) -> f64 {
        (self.min_damage + self.max_damage) / 2.0 + self.power_bonus(attack_power)
    }

    /// Checks the weapon.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if self.speed == SimTime::ZERO {
            return Err("weapon speed must be non-zero".into());
        }
        if self.min_damage > self.max_damage || self.min_damage < 0.0 {
            return Err("weapon damage range is invalid".into());
        }
        Ok(())
    }
}

/// Resource generated by landed white swings, e.g. rage from damage dealt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingResourceGain {
    /// Pool that receives the gain.
    pub kind: ResourceKind,
    /// Resource per point of damage dealt.
    pub per_damage: f64,
}

/// Defensive stats of a target.
///
/// Chances are fractions. `resistance` is the average resisted fraction for
/// magic partial resists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DefenseStats {
    /// Melee miss chance.
    pub miss: f64,
    /// Spell miss chance.
    pub spell_miss: f64,
    /// Dodge chance.
    pub dodge: f64,
    /// Parry chance.
    pub parry: f64,
    /// Block chance.
    pub block: f64,
    /// Damage absorbed by a block.
    pub block_value: f64,
    /// Armor.
    pub armor: f64,
    /// Average magic resistance, as a fraction.
    pub resistance: f64,
    /// Crit chance removed from attackers.
    pub crit_suppression: f64,
}

impl DefenseStats {
    /// A raid boss three levels above the attacker.
    #[must_use]
    pub const fn raid_boss() -> Self {
        Self {
            miss: 0.09,
            spell_miss: 0.17,
            dodge: 0.065,
            parry: 0.14,
            block: 0.0,
            block_value: 0.0,
            armor: 7684.0,
            resistance: 0.0,
            crit_suppression: 0.048,
        }
    }

    /// Fraction of physical damage that gets through `armor`.
    #[must_use]
    pub fn armor_multiplier(&self, armor_constant: f64) -> f64 {
        if self.armor <= 0.0 {
            1.0
        } else {
            1.0 - self.armor / (self.armor + armor_constant)
        }
    }
}
