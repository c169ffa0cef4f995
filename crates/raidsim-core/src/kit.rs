//! Per-actor definition tables.
//!
//! A [`Kit`] holds an actor's spell, aura and dot definitions. Handles
//! ([`SpellId`], [`AuraId`], [`DotId`]) are indices into the owning actor's
//! kit; a hook or condition always resolves its handles against the kit of
//! the actor that owns it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aura::AuraDefinition;
use crate::dot::DotDefinition;
use crate::effect::HandleRef;
use crate::error::{SimError, SimResult};
use crate::spell::SpellDefinition;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u16);

        impl $name {
            /// Creates a handle from a raw index.
            #[must_use]
            pub const fn new(index: u16) -> Self {
                Self(index)
            }

            /// Raw index into the kit table.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// The raw `u16` value.
            #[must_use]
            pub const fn raw(self) -> u16 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle!(
    /// Handle of a spell in its owner's kit.
    SpellId,
    "SpellId"
);
handle!(
    /// Handle of an aura in its owner's kit.
    AuraId,
    "AuraId"
);
handle!(
    /// Handle of a dot in its owner's kit.
    DotId,
    "DotId"
);

/// A dot definition and the handle of its backing aura.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DotSlot {
    definition: DotDefinition,
    aura: AuraId,
}

/// An actor's definition tables.
///
/// # Example
///
/// ```
/// use raidsim_core::dot::DotDefinition;
/// use raidsim_core::kit::Kit;
/// use raidsim_core::spell::SpellDefinition;
/// use raidsim_core::time::SimTime;
///
/// let mut kit = Kit::new();
/// let dot = kit.add_dot(DotDefinition::new("Corruption", 5, SimTime::from_secs(3), 20.0));
/// let spell = kit.add_spell(SpellDefinition::new("Corruption").applying(dot));
///
/// assert_eq!(kit.spell(spell).unwrap().applies_dot, Some(dot));
/// let aura = kit.dot_aura(dot).unwrap();
/// assert_eq!(kit.aura(aura).unwrap().label, "Corruption");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kit {
    spells: Vec<SpellDefinition>,
    auras: Vec<AuraDefinition>,
    dots: Vec<DotSlot>,
}

impl Kit {
    /// An empty kit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spell and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the kit already holds `u16::MAX` spells.
    pub fn add_spell(&mut self, spell: SpellDefinition) -> SpellId {
        let id = SpellId::new(next_index(self.spells.len()));
        self.spells.push(spell);
        id
    }

    /// Adds an aura and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the kit already holds `u16::MAX` auras.
    pub fn add_aura(&mut self, aura: AuraDefinition) -> AuraId {
        let id = AuraId::new(next_index(self.auras.len()));
        self.auras.push(aura);
        id
    }

    /// Adds a dot, registers its backing aura, and returns the dot handle.
    ///
    /// # Panics
    ///
    /// Panics if the kit already holds `u16::MAX` dots or auras.
    pub fn add_dot(&mut self, dot: DotDefinition) -> DotId {
        let aura = self.add_aura(dot.backing_aura());
        let id = DotId::new(next_index(self.dots.len()));
        self.dots.push(DotSlot {
            definition: dot,
            aura,
        });
        id
    }

    /// Looks up a spell.
    #[must_use]
    pub fn spell(&self, id: SpellId) -> Option<&SpellDefinition> {
        self.spells.get(id.index())
    }

    /// Looks up an aura.
    #[must_use]
    pub fn aura(&self, id: AuraId) -> Option<&AuraDefinition> {
        self.auras.get(id.index())
    }

    /// Looks up a dot.
    #[must_use]
    pub fn dot(&self, id: DotId) -> Option<&DotDefinition> {
        self.dots.get(id.index()).map(|slot| &slot.definition)
    }

    /// Backing aura of a dot.
    #[must_use]
    pub fn dot_aura(&self, id: DotId) -> Option<AuraId> {
        self.dots.get(id.index()).map(|slot| slot.aura)
    }

    /// The dot backed by `aura`, if any.
    #[must_use]
    pub fn dot_for_aura(&self, aura: AuraId) -> Option<DotId> {
        self.dots
            .iter()
            .position(|slot| slot.aura == aura)
            .map(|i| DotId::new(next_index(i)))
    }

    /// Finds a spell by label.
    #[must_use]
    pub fn find_spell(&self, label: &str) -> Option<SpellId> {
        self.spells
            .iter()
            .position(|s| s.label == label)
            .map(|i| SpellId::new(next_index(i)))
    }

    /// Spells with their handles, in handle order.
    pub fn spells(&self) -> impl Iterator<Item = (SpellId, &SpellDefinition)> {
        self.spells
            .iter()
            .enumerate()
            .map(|(i, s)| (SpellId::new(next_index(i)), s))
    }

    /// Auras with their handles, in handle order.
    pub fn auras(&self) -> impl Iterator<Item = (AuraId, &AuraDefinition)> {
        self.auras
            .iter()
            .enumerate()
            .map(|(i, a)| (AuraId::new(next_index(i)), a))
    }

    /// Number of spells.
    #[must_use]
    pub fn spell_count(&self) -> usize {
        self.spells.len()
    }

    /// Number of auras.
    #[must_use]
    pub fn aura_count(&self) -> usize {
        self.auras.len()
    }

    /// Checks that a handle resolves in this kit.
    #[must_use]
    pub fn contains(&self, handle: HandleRef) -> bool {
        match handle {
            HandleRef::Spell(id) => id.index() < self.spells.len(),
            HandleRef::Aura(id) => id.index() < self.auras.len(),
            HandleRef::Dot(id) => id.index() < self.dots.len(),
        }
    }

    /// Validates every definition and every handle referenced by hooks,
    /// conditions and dot links.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidDefinition`] naming the first offender.
    pub fn validate(&self, actor: &str) -> SimResult<()> {
        let invalid = |label: &str, reason: String| SimError::InvalidDefinition {
            actor: actor.to_string(),
            label: label.to_string(),
            reason,
        };

        let mut handles = Vec::new();
        for spell in &self.spells {
            spell.validate().map_err(|r| invalid(&spell.label, r))?;
            handles.clear();
            spell.hooks().for_each(|h| h.collect_handles(&mut handles));
            spell.conditions.iter().for_each(|c| c.collect_handles(&mut handles));
            if let Some(dot) = spell.applies_dot {
                handles.push(HandleRef::Dot(dot));
            }
            self.check_handles(&handles)
                .map_err(|h| invalid(&spell.label, format!("unknown handle {h:?}")))?;
        }
        for aura in &self.auras {
            aura.validate().map_err(|r| invalid(&aura.label, r))?;
            handles.clear();
            aura.hooks().for_each(|h| h.collect_handles(&mut handles));
            self.check_handles(&handles)
                .map_err(|h| invalid(&aura.label, format!("unknown handle {h:?}")))?;
        }
        for slot in &self.dots {
            slot.definition
                .validate()
                .map_err(|r| invalid(&slot.definition.label, r))?;
        }
        Ok(())
    }

    fn check_handles(&self, handles: &[HandleRef]) -> Result<(), HandleRef> {
        match handles.iter().find(|h| !self.contains(**h)) {
            Some(missing) => Err(*missing),
            None => Ok(()),
        }
    }
}

/// Converts a table length into the next handle index.
#[allow(clippy::cast_possible_truncation)]
fn next_index(len: usize) -> u16 {
    assert!(len < usize::from(u16::MAX), "kit table overflow");
    len as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{AuraHost, EffectHook};
    use crate::time::SimTime;

    #[test]
    fn handles_are_sequential_per_table() {
        let mut kit = Kit::new();
        let a = kit.add_aura(AuraDefinition::new("A", None));
        let d = kit.add_dot(DotDefinition::new("D", 3, SimTime::from_secs(1), 1.0));
        let b = kit.add_aura(AuraDefinition::new("B", None));
        assert_eq!(a, AuraId::new(0));
        assert_eq!(kit.dot_aura(d), Some(AuraId::new(1)));
        assert_eq!(b, AuraId::new(2));
        assert_eq!(kit.dot_for_aura(AuraId::new(1)), Some(d));
        assert_eq!(kit.dot_for_aura(b), None);
    }

    #[test]
    fn validate_reports_dangling_handles() {
        let mut kit = Kit::new();
        kit.add_spell(SpellDefinition::new("Mangle").on_landed(EffectHook::ActivateAura {
            aura: AuraId::new(4),
            on: AuraHost::Target,
        }));
        let err = kit.validate("bear").unwrap_err();
        match err {
            SimError::InvalidDefinition { actor, label, .. } => {
                assert_eq!(actor, "bear");
                assert_eq!(label, "Mangle");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn find_spell_by_label() {
        let mut kit = Kit::new();
        kit.add_spell(SpellDefinition::new("Maul"));
        let swipe = kit.add_spell(SpellDefinition::new("Swipe"));
        assert_eq!(kit.find_spell("Swipe"), Some(swipe));
        assert_eq!(kit.find_spell("Lacerate"), None);
    }
}
