//! Fighter Registry
//!
//! The fighter table is the single source of truth for "in arena": a
//! character is entered iff it has a row. Weapon, shield and tier indexes
//! are secondary and are only ever changed together with the table, by
//! [`Registry::insert`] and [`Registry::remove`].

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::economy::withdrawal_refund;
use super::error::{ArenaError, Result};
use super::events::ArenaEventData;
use super::providers::ArenaProviders;
use super::state::ArenaState;
use super::types::{
    Address, Amount, CharacterId, EntityRef, Fighter, ShieldId, Tier, Timestamp, WeaponId,
};

// =============================================================================
// TIER BUCKET
// =============================================================================

/// Indexable set of characters entered at one tier.
///
/// Removal swaps the last member into the freed slot, so positions are
/// stable only between removals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierBucket {
    members: Vec<CharacterId>,
    positions: BTreeMap<CharacterId, usize>,
}

impl TierBucket {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Is the bucket empty?
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member at `index`.
    pub fn get(&self, index: usize) -> Option<CharacterId> {
        self.members.get(index).copied()
    }

    /// Is `id` a member?
    pub fn contains(&self, id: CharacterId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Members in index order.
    pub fn members(&self) -> &[CharacterId] {
        &self.members
    }

    fn insert(&mut self, id: CharacterId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.positions.insert(id, self.members.len());
        self.members.push(id);
        true
    }

    fn remove(&mut self, id: CharacterId) -> bool {
        let Some(index) = self.positions.remove(&id) else {
            return false;
        };
        self.members.swap_remove(index);
        if let Some(moved) = self.members.get(index) {
            self.positions.insert(*moved, index);
        }
        true
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Fighter table plus its secondary indexes.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    fighters: BTreeMap<CharacterId, Fighter>,
    weapons: BTreeMap<WeaponId, CharacterId>,
    shields: BTreeMap<ShieldId, CharacterId>,
    tiers: BTreeMap<Tier, TierBucket>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fighter entered with `id`.
    pub fn get(&self, id: CharacterId) -> Option<&Fighter> {
        self.fighters.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: CharacterId) -> Option<&mut Fighter> {
        self.fighters.get_mut(&id)
    }

    /// Is the character entered?
    pub fn contains_character(&self, id: CharacterId) -> bool {
        self.fighters.contains_key(&id)
    }

    /// Is the weapon equipped by an entered fighter?
    pub fn contains_weapon(&self, id: WeaponId) -> bool {
        self.weapons.contains_key(&id)
    }

    /// Is the shield equipped by an entered fighter?
    pub fn contains_shield(&self, id: ShieldId) -> bool {
        self.shields.contains_key(&id)
    }

    /// Characters entered at `tier`.
    pub fn bucket(&self, tier: Tier) -> Option<&TierBucket> {
        self.tiers.get(&tier)
    }

    /// All tier buckets.
    pub fn buckets(&self) -> &BTreeMap<Tier, TierBucket> {
        &self.tiers
    }

    /// All fighters, by character ID.
    pub fn fighters(&self) -> impl Iterator<Item = &Fighter> {
        self.fighters.values()
    }

    /// Fighters entered by `owner`.
    pub fn owned_by(&self, owner: Address) -> impl Iterator<Item = &Fighter> + '_ {
        self.fighters.values().filter(move |f| f.owner == owner)
    }

    /// Number of entered fighters.
    pub fn len(&self) -> usize {
        self.fighters.len()
    }

    /// Is the arena empty?
    pub fn is_empty(&self) -> bool {
        self.fighters.is_empty()
    }

    /// Add a fighter and index it. Callers check for conflicts first.
    pub(crate) fn insert(&mut self, fighter: Fighter) {
        let id = fighter.character_id;
        self.weapons.insert(fighter.weapon_id, id);
        if let Some(shield) = fighter.equipped_shield() {
            self.shields.insert(shield, id);
        }
        self.tiers.entry(fighter.tier).or_default().insert(id);
        self.fighters.insert(id, fighter);
    }

    /// Remove a fighter and all of its index entries.
    pub(crate) fn remove(&mut self, id: CharacterId) -> Option<Fighter> {
        let fighter = self.fighters.remove(&id)?;
        self.weapons.remove(&fighter.weapon_id);
        if let Some(shield) = fighter.equipped_shield() {
            self.shields.remove(&shield);
        }
        if let Some(bucket) = self.tiers.get_mut(&fighter.tier) {
            bucket.remove(id);
            if bucket.is_empty() {
                self.tiers.remove(&fighter.tier);
            }
        }
        Some(fighter)
    }

    /// Rebuild from a fighter table and the bucket orders it was saved with.
    ///
    /// Fighters missing from `orders` are appended to their bucket in ID order;
    /// IDs in `orders` without a fighter are ignored.
    pub(crate) fn restore(
        fighters: impl IntoIterator<Item = Fighter>,
        orders: &BTreeMap<Tier, Vec<CharacterId>>,
    ) -> Self {
        let mut table: BTreeMap<CharacterId, Fighter> =
            fighters.into_iter().map(|f| (f.character_id, f)).collect();
        let mut registry = Self::new();

        for (tier, order) in orders {
            for id in order {
                let filed_here = table.get(id).is_some_and(|f| f.tier == *tier);
                if filed_here {
                    if let Some(fighter) = table.remove(id) {
                        registry.insert(fighter);
                    }
                }
            }
        }
        for fighter in table.into_values() {
            registry.insert(fighter);
        }
        registry
    }
}

// =============================================================================
// ENTER / WITHDRAW
// =============================================================================

impl<P: ArenaProviders> ArenaState<P> {
    /// Enter a fighter, staking the entry wager from `caller`.
    ///
    /// Returns the staked amount. `shield_id` of `None` leaves the shield
    /// slot empty.
    pub fn enter_arena(
        &mut self,
        caller: Address,
        character_id: CharacterId,
        weapon_id: WeaponId,
        shield_id: Option<ShieldId>,
        now: Timestamp,
    ) -> Result<Amount> {
        let character = EntityRef::Character(character_id);
        let weapon = EntityRef::Weapon(weapon_id);

        if self.registry.contains_character(character_id) {
            return Err(ArenaError::AlreadyInArena(character));
        }
        if self.registry.contains_weapon(weapon_id) {
            return Err(ArenaError::AlreadyInArena(weapon));
        }
        if let Some(shield_id) = shield_id {
            if self.registry.contains_shield(shield_id) {
                return Err(ArenaError::AlreadyInArena(EntityRef::Shield(shield_id)));
            }
        }

        let entities = self.providers.entities();
        check_owner(caller, character, entities.character_owner(character_id))?;
        check_owner(caller, weapon, entities.weapon_owner(weapon_id))?;
        if let Some(shield_id) = shield_id {
            check_owner(caller, EntityRef::Shield(shield_id), entities.shield_owner(shield_id))?;
        }

        let locks = self.providers.locks();
        if locks.is_busy(character) {
            return Err(ArenaError::Busy(character));
        }
        if locks.is_busy(weapon) {
            return Err(ArenaError::Busy(weapon));
        }

        let tier = self.current_tier(character_id)?;
        let stake = self.entry_wager_for_tier(tier);
        if stake == 0 {
            return Err(ArenaError::ZeroStake(character_id));
        }

        self.providers.ledger().debit(caller, stake)?;

        let now = self.advance_clock(now);
        self.registry.insert(Fighter {
            character_id,
            weapon_id,
            shield_id,
            stake,
            uses_shield: shield_id.is_some(),
            owner: caller,
            tier,
        });
        self.last_activity.insert(character_id, now);
        self.rankings.register(character_id, tier);

        self.emit(now, ArenaEventData::FighterEntered {
            character_id,
            weapon_id,
            shield_id,
            owner: caller,
            tier,
            stake,
        });
        info!(character = %character_id, weapon = %weapon_id, tier, stake, owner = %caller, "fighter entered");
        Ok(stake)
    }

    /// Withdraw a fighter and refund its stake to `caller`.
    ///
    /// With a pending duel a quarter of the stake is kept as a penalty.
    /// Returns the refunded amount.
    pub fn withdraw_from_arena(
        &mut self,
        caller: Address,
        character_id: CharacterId,
        now: Timestamp,
    ) -> Result<Amount> {
        self.require_character_owner(caller, character_id)?;
        let fighter = self
            .registry
            .get(character_id)
            .ok_or(ArenaError::NotInArena(character_id))?;

        let (refund, penalty) = withdrawal_refund(fighter.stake, self.has_pending_duel(character_id));

        if refund > 0 {
            self.providers.ledger().credit(caller, refund)?;
        }

        let now = self.advance_clock(now);
        self.remove_fighter(character_id);
        self.collected_fees = self.collected_fees.saturating_add(penalty);

        self.emit(now, ArenaEventData::FighterWithdrew { character_id, owner: caller, refund, penalty });
        if penalty > 0 {
            warn!(character = %character_id, refund, penalty, "fighter withdrew with a pending duel");
        } else {
            info!(character = %character_id, refund, "fighter withdrew");
        }
        Ok(refund)
    }

    /// Weapons equipped by `owner`'s entered fighters.
    pub fn participating_weapons(&self, owner: Address) -> impl Iterator<Item = WeaponId> + '_ {
        self.registry.owned_by(owner).map(|f| f.weapon_id)
    }

    /// Shields equipped by `owner`'s entered fighters.
    pub fn participating_shields(&self, owner: Address) -> impl Iterator<Item = ShieldId> + '_ {
        self.registry.owned_by(owner).filter_map(Fighter::equipped_shield)
    }

    /// Characters `owner` has entered.
    pub fn participating_characters(&self, owner: Address) -> impl Iterator<Item = CharacterId> + '_ {
        self.registry.owned_by(owner).map(|f| f.character_id)
    }

    /// Drop a fighter with its own duel record and activity timestamp.
    pub(crate) fn remove_fighter(&mut self, character_id: CharacterId) -> Option<Fighter> {
        self.duels.remove(&character_id);
        self.last_activity.remove(&character_id);
        self.registry.remove(character_id)
    }
}

/// Check that `owner` (as reported by the attribute provider) is `caller`.
pub(crate) fn check_owner(caller: Address, entity: EntityRef, owner: Option<Address>) -> Result<()> {
    match owner {
        None => Err(ArenaError::UnknownEntity(entity)),
        Some(owner) if owner != caller => Err(ArenaError::NotOwner { entity, caller }),
        Some(_) => Ok(()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
