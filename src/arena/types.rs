//! Arena Data Model
//!
//! Identifiers, fighters and duels. All maps keyed by these IDs are
//! `BTreeMap`s so iteration order is deterministic.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;

/// Tier bucket index, derived from character level.
pub type Tier = u8;

/// Unix timestamp in seconds, supplied by the caller.
pub type Timestamp = u64;

/// Amount of the staking token, in its smallest unit.
pub type Amount = u64;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric ID.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Character token ID.
    CharacterId,
    "character"
);
entity_id!(
    /// Weapon token ID.
    WeaponId,
    "weapon"
);
entity_id!(
    /// Shield token ID.
    ShieldId,
    "shield"
);

/// Reference to any entity the arena can hold, for errors and lock checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// A character.
    Character(CharacterId),
    /// A weapon.
    Weapon(WeaponId),
    /// A shield.
    Shield(ShieldId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Character(id) => id.fmt(f),
            EntityRef::Weapon(id) => id.fmt(f),
            EntityRef::Shield(id) => id.fmt(f),
        }
    }
}

/// Player address (20 bytes).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse from a hex string, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(&self.0[..4]))
    }
}

// =============================================================================
// ELEMENT (character / weapon trait)
// =============================================================================

/// Elemental trait of a character or weapon.
///
/// Each element is effective against the next one on the wheel:
/// Fire → Earth → Lightning → Water → Fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Element {
    /// Fire
    Fire = 0,
    /// Earth
    Earth = 1,
    /// Lightning
    Lightning = 2,
    /// Water
    Water = 3,
}

impl Element {
    /// Get element from index (0-3).
    pub fn from_index(index: u8) -> Option<Element> {
        match index {
            0 => Some(Element::Fire),
            1 => Some(Element::Earth),
            2 => Some(Element::Lightning),
            3 => Some(Element::Water),
            _ => None,
        }
    }

    /// Check if this element beats `other`.
    #[inline]
    pub fn is_effective_against(self, other: Element) -> bool {
        (self as u8 + 1) % 4 == other as u8
    }
}

// =============================================================================
// FIGHTER
// =============================================================================

/// A character entered in the arena with its equipment and stake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    /// Entered character
    pub character_id: CharacterId,

    /// Equipped weapon
    pub weapon_id: WeaponId,

    /// Equipped shield (only meaningful when `uses_shield`)
    pub shield_id: Option<ShieldId>,

    /// Tokens still at risk
    pub stake: Amount,

    /// Whether a shield occupies the shield slot
    pub uses_shield: bool,

    /// Address that entered the fighter
    pub owner: Address,

    /// Tier bucket the fighter is filed under
    pub tier: Tier,
}

impl Fighter {
    /// Shield actually occupying a slot, if any.
    pub fn equipped_shield(&self) -> Option<ShieldId> {
        if self.uses_shield {
            self.shield_id
        } else {
            None
        }
    }

    /// Hash this fighter for state verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.character_id.0);
        hasher.update_u64(self.weapon_id.0);
        hasher.update_opt_u64(self.equipped_shield().map(|s| s.0));
        hasher.update_u64(self.stake);
        hasher.update_bytes(&self.owner.0);
        hasher.update_u8(self.tier);
    }
}

// =============================================================================
// DUEL
// =============================================================================

/// A duel requested by an attacker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duel {
    /// Requesting character
    pub attacker_id: CharacterId,

    /// Assigned opponent
    pub defender_id: CharacterId,

    /// When the opponent was assigned
    pub created_at: Timestamp,

    /// Still waiting to be performed
    pub pending: bool,
}

impl Duel {
    /// Check if the attacker may still perform this duel at `now`.
    #[inline]
    pub fn within_decision_window(&self, now: Timestamp, decision_seconds: u64) -> bool {
        self.created_at.saturating_add(decision_seconds) > now
    }

    /// Hash this duel for state verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.attacker_id.0);
        hasher.update_u64(self.defender_id.0);
        hasher.update_u64(self.created_at);
        hasher.update_bool(self.pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_wheel() {
        assert!(Element::Fire.is_effective_against(Element::Earth));
        assert!(Element::Earth.is_effective_against(Element::Lightning));
        assert!(Element::Lightning.is_effective_against(Element::Water));
        assert!(Element::Water.is_effective_against(Element::Fire));

        assert!(!Element::Earth.is_effective_against(Element::Fire));
        assert!(!Element::Fire.is_effective_against(Element::Fire));
        assert!(!Element::Fire.is_effective_against(Element::Lightning));
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let address = Address::new([0xab; 20]);
        let text = address.to_string();

        assert!(text.starts_with("0xabab"));
        assert_eq!(Address::from_hex(&text), Some(address));
        assert_eq!(Address::from_hex("0x1234"), None);
    }

    #[test]
    fn test_decision_window_boundary() {
        let duel = Duel {
            attacker_id: CharacterId(1),
            defender_id: CharacterId(2),
            created_at: 1_000,
            pending: true,
        };

        assert!(duel.within_decision_window(1_179, 180));
        // created_at + decision == now has elapsed
        assert!(!duel.within_decision_window(1_180, 180));
    }

    #[test]
    fn test_unused_shield_is_not_equipped() {
        let fighter = Fighter {
            character_id: CharacterId(1),
            weapon_id: WeaponId(1),
            shield_id: Some(ShieldId(9)),
            stake: 100,
            uses_shield: false,
            owner: Address::default(),
            tier: 0,
        };

        assert_eq!(fighter.equipped_shield(), None);
    }
}
