//! Collaborator contracts.
//!
//! The arena never stores ownership, attributes, balances or entropy itself.
//! It reads them through these traits so it can run against a chain adapter,
//! a game database, or the in-memory implementations in [`super::memory`].

use crate::core::fixed::{mul_uint, Fixed};

use super::error::LedgerError;
use super::types::{Address, Amount, CharacterId, Element, EntityRef, ShieldId, WeaponId};

/// Weapon data relevant to a fight, as seen by a wielder of a given element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeaponFightData {
    /// Fight power multiplier (fixed-point, 1.0 = neutral)
    pub multiplier: Fixed,
    /// Flat power added after the multiplier
    pub bonus_power: u64,
    /// The weapon's own element
    pub element: Element,
}

/// Ownership and attribute storage for characters and equipment.
pub trait EntityAttributes {
    /// Current owner of a character.
    fn character_owner(&self, id: CharacterId) -> Option<Address>;

    /// Current level of a character.
    fn character_level(&self, id: CharacterId) -> Option<u8>;

    /// Element of a character.
    fn character_element(&self, id: CharacterId) -> Option<Element>;

    /// Base power of a character.
    fn character_power(&self, id: CharacterId) -> Option<u64>;

    /// Current owner of a weapon.
    fn weapon_owner(&self, id: WeaponId) -> Option<Address>;

    /// Fight data of a weapon for a wielder of `wielder`'s element.
    fn weapon_fight_data(&self, id: WeaponId, wielder: Element) -> Option<WeaponFightData>;

    /// Current owner of a shield.
    fn shield_owner(&self, id: ShieldId) -> Option<Address>;
}

/// Cross-system conflict checks.
pub trait ActivityLocks {
    /// Is this entity busy in another activity (raid, quest, market...)?
    fn is_busy(&self, entity: EntityRef) -> bool;
}

/// Fungible token custody.
pub trait ValueLedger {
    /// Move `amount` from `from` into arena custody.
    fn debit(&mut self, from: Address, amount: Amount) -> Result<(), LedgerError>;

    /// Release `amount` from arena custody to `to`.
    fn credit(&mut self, to: Address, amount: Amount) -> Result<(), LedgerError>;
}

/// Source of external randomness.
pub trait RandomnessSource {
    /// Fresh seed for an operation issued by `caller`.
    fn seed(&mut self, caller: Address) -> u64;
}

/// Pricing and global game constants.
pub trait PricingOracle {
    /// Convert a USD amount (cents) into staking token units.
    fn usd_to_stake(&self, usd_cents: u64) -> Amount;

    /// Fight trait bonus constant (fixed-point).
    fn trait_bonus(&self) -> Fixed;

    /// Does element `a` beat element `b`?
    fn is_element_effective_against(&self, a: Element, b: Element) -> bool {
        a.is_effective_against(b)
    }

    /// Combine base power with weapon multiplier and bonus power.
    fn combine_power(&self, base: u64, multiplier: Fixed, bonus: u64) -> u64 {
        mul_uint(multiplier, base).saturating_add(bonus)
    }
}

/// Bundle of collaborators owned by an arena.
///
/// Read-only collaborators are lent out shared; the ledger and the
/// randomness source are lent out mutably.
pub trait ArenaProviders {
    /// Entity ownership and attributes.
    fn entities(&self) -> &dyn EntityAttributes;

    /// Activity lock checks.
    fn locks(&self) -> &dyn ActivityLocks;

    /// Pricing oracle.
    fn oracle(&self) -> &dyn PricingOracle;

    /// Token ledger.
    fn ledger(&mut self) -> &mut dyn ValueLedger;

    /// Randomness source.
    fn randomness(&mut self) -> &mut dyn RandomnessSource;
}
