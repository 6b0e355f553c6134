//! In-memory collaborators.
//!
//! Backing store for tests, local simulations and the demo binary.
//! Everything is plain data in `BTreeMap`s, so a `MemoryProviders`
//! bundle is `Send + Sync` and replays deterministically.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::fixed::{Fixed, DEFAULT_TRAIT_BONUS};
use crate::core::rng::{derive_caller_seed, DeterministicRng};

use super::error::LedgerError;
use super::providers::{
    ActivityLocks, ArenaProviders, EntityAttributes, PricingOracle, RandomnessSource,
    ValueLedger, WeaponFightData,
};
use super::types::{Address, Amount, CharacterId, Element, EntityRef, ShieldId, WeaponId};

// =============================================================================
// ENTITIES
// =============================================================================

/// Stored character attributes.
#[derive(Clone, Debug)]
pub struct CharacterRecord {
    /// Owner address
    pub owner: Address,
    /// Character level
    pub level: u8,
    /// Character element
    pub element: Element,
    /// Base power
    pub power: u64,
}

/// Stored weapon attributes.
#[derive(Clone, Debug)]
pub struct WeaponRecord {
    /// Owner address
    pub owner: Address,
    /// Weapon element
    pub element: Element,
    /// Fight multiplier
    pub multiplier: Fixed,
    /// Flat bonus power
    pub bonus_power: u64,
}

/// In-memory character, weapon and shield registry.
///
/// Weapons report the same fight data whatever the wielder's element.
#[derive(Clone, Debug, Default)]
pub struct MemoryEntities {
    characters: BTreeMap<CharacterId, CharacterRecord>,
    weapons: BTreeMap<WeaponId, WeaponRecord>,
    shields: BTreeMap<ShieldId, Address>,
}

impl MemoryEntities {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a character.
    pub fn add_character(
        &mut self,
        id: CharacterId,
        owner: Address,
        level: u8,
        element: Element,
        power: u64,
    ) {
        self.characters.insert(id, CharacterRecord { owner, level, element, power });
    }

    /// Register or replace a weapon.
    pub fn add_weapon(
        &mut self,
        id: WeaponId,
        owner: Address,
        element: Element,
        multiplier: Fixed,
        bonus_power: u64,
    ) {
        self.weapons.insert(id, WeaponRecord { owner, element, multiplier, bonus_power });
    }

    /// Register or replace a shield.
    pub fn add_shield(&mut self, id: ShieldId, owner: Address) {
        self.shields.insert(id, owner);
    }

    /// Change a character's level (e.g. after it gains experience elsewhere).
    pub fn set_level(&mut self, id: CharacterId, level: u8) {
        if let Some(record) = self.characters.get_mut(&id) {
            record.level = level;
        }
    }

    /// Transfer a character.
    pub fn set_character_owner(&mut self, id: CharacterId, owner: Address) {
        if let Some(record) = self.characters.get_mut(&id) {
            record.owner = owner;
        }
    }
}

impl EntityAttributes for MemoryEntities {
    fn character_owner(&self, id: CharacterId) -> Option<Address> {
        self.characters.get(&id).map(|c| c.owner)
    }

    fn character_level(&self, id: CharacterId) -> Option<u8> {
        self.characters.get(&id).map(|c| c.level)
    }

    fn character_element(&self, id: CharacterId) -> Option<Element> {
        self.characters.get(&id).map(|c| c.element)
    }

    fn character_power(&self, id: CharacterId) -> Option<u64> {
        self.characters.get(&id).map(|c| c.power)
    }

    fn weapon_owner(&self, id: WeaponId) -> Option<Address> {
        self.weapons.get(&id).map(|w| w.owner)
    }

    fn weapon_fight_data(&self, id: WeaponId, _wielder: Element) -> Option<WeaponFightData> {
        self.weapons.get(&id).map(|w| WeaponFightData {
            multiplier: w.multiplier,
            bonus_power: w.bonus_power,
            element: w.element,
        })
    }

    fn shield_owner(&self, id: ShieldId) -> Option<Address> {
        self.shields.get(&id).copied()
    }
}

// =============================================================================
// LOCKS
// =============================================================================

/// In-memory activity locks.
#[derive(Clone, Debug, Default)]
pub struct MemoryLocks {
    busy: BTreeSet<EntityRef>,
}

impl MemoryLocks {
    /// Mark an entity busy.
    pub fn lock(&mut self, entity: EntityRef) {
        self.busy.insert(entity);
    }

    /// Release an entity.
    pub fn unlock(&mut self, entity: EntityRef) {
        self.busy.remove(&entity);
    }
}

impl ActivityLocks for MemoryLocks {
    fn is_busy(&self, entity: EntityRef) -> bool {
        self.busy.contains(&entity)
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// In-memory token ledger with an arena custody account.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    balances: BTreeMap<Address, Amount>,
    custody: Amount,
}

impl MemoryLedger {
    /// Give a player tokens.
    pub fn fund(&mut self, account: Address, amount: Amount) {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Player balance.
    pub fn balance_of(&self, account: Address) -> Amount {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    /// Tokens held by the arena.
    pub fn custody(&self) -> Amount {
        self.custody
    }
}

impl ValueLedger for MemoryLedger {
    fn debit(&mut self, from: Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds { account: from, needed: amount, available });
        }
        self.balances.insert(from, available - amount);
        self.custody = self.custody.saturating_add(amount);
        Ok(())
    }

    fn credit(&mut self, to: Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { account: to })?;
        self.balances.insert(to, balance);
        self.custody = self.custody.saturating_sub(amount);
        Ok(())
    }
}

// =============================================================================
// RANDOMNESS
// =============================================================================

/// Randomness from a seeded Xorshift128+ stream, mixed with the caller.
#[derive(Clone, Debug)]
pub struct SeededRandomness {
    rng: DeterministicRng,
}

impl SeededRandomness {
    /// Create from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        Self { rng: DeterministicRng::new(seed) }
    }
}

impl RandomnessSource for SeededRandomness {
    fn seed(&mut self, caller: Address) -> u64 {
        derive_caller_seed(self.rng.next_u64(), caller.as_bytes())
    }
}

/// Randomness that replays a fixed list of seeds, cycling when exhausted.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRandomness {
    seeds: VecDeque<u64>,
}

impl ScriptedRandomness {
    /// Create from a list of seeds.
    pub fn new(seeds: impl IntoIterator<Item = u64>) -> Self {
        Self { seeds: seeds.into_iter().collect() }
    }

    /// Replace the queued seeds.
    pub fn set(&mut self, seeds: impl IntoIterator<Item = u64>) {
        self.seeds = seeds.into_iter().collect();
    }
}

impl RandomnessSource for ScriptedRandomness {
    fn seed(&mut self, _caller: Address) -> u64 {
        match self.seeds.pop_front() {
            Some(seed) => {
                self.seeds.push_back(seed);
                seed
            }
            None => 0,
        }
    }
}

/// Either randomness flavour, so one providers type serves tests and demos.
#[derive(Clone, Debug)]
pub enum MemoryRandomness {
    /// Xorshift stream
    Seeded(SeededRandomness),
    /// Fixed replay list
    Scripted(ScriptedRandomness),
}

impl RandomnessSource for MemoryRandomness {
    fn seed(&mut self, caller: Address) -> u64 {
        match self {
            MemoryRandomness::Seeded(r) => r.seed(caller),
            MemoryRandomness::Scripted(r) => r.seed(caller),
        }
    }
}

// =============================================================================
// ORACLE
// =============================================================================

/// Oracle with a constant USD → token rate.
#[derive(Clone, Debug)]
pub struct FixedRateOracle {
    /// Token units per USD cent
    pub stake_per_usd_cent: u64,
    /// Fight trait bonus
    pub trait_bonus: Fixed,
}

impl Default for FixedRateOracle {
    fn default() -> Self {
        Self {
            stake_per_usd_cent: 1,
            trait_bonus: DEFAULT_TRAIT_BONUS,
        }
    }
}

impl PricingOracle for FixedRateOracle {
    fn usd_to_stake(&self, usd_cents: u64) -> Amount {
        usd_cents.saturating_mul(self.stake_per_usd_cent)
    }

    fn trait_bonus(&self) -> Fixed {
        self.trait_bonus
    }
}

// =============================================================================
// BUNDLE
// =============================================================================

/// All in-memory collaborators.
#[derive(Clone, Debug)]
pub struct MemoryProviders {
    /// Characters, weapons, shields
    pub entities: MemoryEntities,
    /// Activity locks
    pub locks: MemoryLocks,
    /// Token ledger
    pub ledger: MemoryLedger,
    /// Randomness
    pub randomness: MemoryRandomness,
    /// Pricing oracle
    pub oracle: FixedRateOracle,
}

impl MemoryProviders {
    /// Empty world with seeded randomness.
    pub fn seeded(seed: u64) -> Self {
        Self {
            entities: MemoryEntities::new(),
            locks: MemoryLocks::default(),
            ledger: MemoryLedger::default(),
            randomness: MemoryRandomness::Seeded(SeededRandomness::new(seed)),
            oracle: FixedRateOracle::default(),
        }
    }

    /// Empty world replaying `seeds`.
    pub fn scripted(seeds: impl IntoIterator<Item = u64>) -> Self {
        Self {
            randomness: MemoryRandomness::Scripted(ScriptedRandomness::new(seeds)),
            ..Self::seeded(0)
        }
    }

    /// Replace the scripted seeds (switches to scripted randomness).
    pub fn script_seeds(&mut self, seeds: impl IntoIterator<Item = u64>) {
        self.randomness = MemoryRandomness::Scripted(ScriptedRandomness::new(seeds));
    }
}

impl ArenaProviders for MemoryProviders {
    fn entities(&self) -> &dyn EntityAttributes {
        &self.entities
    }

    fn locks(&self) -> &dyn ActivityLocks {
        &self.locks
    }

    fn oracle(&self) -> &dyn PricingOracle {
        &self.oracle
    }

    fn ledger(&mut self) -> &mut dyn ValueLedger {
        &mut self.ledger
    }

    fn randomness(&mut self) -> &mut dyn RandomnessSource {
        &mut self.randomness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_debit_and_credit() {
        let alice = Address::new([1; 20]);
        let mut ledger = MemoryLedger::default();
        ledger.fund(alice, 100);

        ledger.debit(alice, 60).unwrap();
        assert_eq!(ledger.balance_of(alice), 40);
        assert_eq!(ledger.custody(), 60);

        let err = ledger.debit(alice, 41).unwrap_err();
        assert_eq!(err, LedgerError::InsufficientFunds { account: alice, needed: 41, available: 40 });

        ledger.credit(alice, 45).unwrap();
        assert_eq!(ledger.balance_of(alice), 85);
        assert_eq!(ledger.custody(), 15);
    }

    #[test]
    fn test_scripted_randomness_cycles() {
        let mut random = ScriptedRandomness::new([3, 5]);
        let caller = Address::default();

        assert_eq!(random.seed(caller), 3);
        assert_eq!(random.seed(caller), 5);
        assert_eq!(random.seed(caller), 3);

        assert_eq!(ScriptedRandomness::default().seed(caller), 0);
    }

    #[test]
    fn test_seeded_randomness_is_reproducible() {
        let caller = Address::new([9; 20]);
        let mut a = SeededRandomness::new(77);
        let mut b = SeededRandomness::new(77);

        for _ in 0..10 {
            assert_eq!(a.seed(caller), b.seed(caller));
        }
    }

    #[test]
    fn test_locks() {
        let mut locks = MemoryLocks::default();
        let weapon = EntityRef::Weapon(WeaponId(4));

        locks.lock(weapon);
        assert!(locks.is_busy(weapon));
        locks.unlock(weapon);
        assert!(!locks.is_busy(weapon));
    }
}
