//! Arena State
//!
//! The `ArenaState` aggregate: fighter table, duels, rankings, pools and
//! balances, plus the read-only query surface.
//!
//! Every mutating operation follows the same order:
//!
//! ```text
//! 1. validate against current state      (no mutation)
//! 2. fallible ledger debit / credit      (collaborator call)
//! 3. advance clock, apply mutations      (infallible)
//! 4. queue event, log
//! ```
//!
//! so a rejected call leaves the arena exactly as it was.

use std::collections::BTreeMap;

use tracing::info;

use crate::core::hash::{compute_state_hash, StateHash};

use super::config::ArenaConfig;
use super::error::{ArenaError, Result};
use super::events::{ArenaEvent, ArenaEventData};
use super::leaderboard::Rankings;
use super::providers::ArenaProviders;
use super::registry::{check_owner, Registry};
use super::types::{
    Address, Amount, CharacterId, Duel, EntityRef, ShieldId, Tier, Timestamp, WeaponId,
};

/// Complete arena state.
///
/// Uses BTreeMap for deterministic iteration order.
pub struct ArenaState<P> {
    /// Economy and timing parameters
    pub(crate) config: ArenaConfig,

    /// External collaborators
    pub(crate) providers: P,

    /// Entered fighters and their indexes
    pub(crate) registry: Registry,

    /// Latest duel per attacker
    pub(crate) duels: BTreeMap<CharacterId, Duel>,

    /// Last arena activity per character
    pub(crate) last_activity: BTreeMap<CharacterId, Timestamp>,

    /// Ranking points and tier boards
    pub(crate) rankings: Rankings,

    /// Accumulated pool tax per tier
    pub(crate) rewards_pool: BTreeMap<Tier, Amount>,

    /// Unclaimed winnings per player
    pub(crate) player_rewards: BTreeMap<Address, Amount>,

    /// Re-roll fees and early-exit penalties
    pub(crate) collected_fees: Amount,

    /// Current ranked season (starts at 1)
    pub(crate) season: u32,

    /// When the current season started
    pub(crate) season_started_at: Timestamp,

    /// Logical clock (high-water mark of observed timestamps)
    pub(crate) clock: Timestamp,

    /// Events not yet drained
    pub(crate) events: Vec<ArenaEvent>,
}

impl<P: ArenaProviders> ArenaState<P> {
    /// Create an empty arena.
    pub fn new(config: ArenaConfig, providers: P) -> Result<Self> {
        config.validate()?;
        Ok(Self::empty(config, providers))
    }

    /// Empty arena with an already validated configuration.
    pub(crate) fn empty(config: ArenaConfig, providers: P) -> Self {
        Self {
            config,
            providers,
            registry: Registry::new(),
            duels: BTreeMap::new(),
            last_activity: BTreeMap::new(),
            rankings: Rankings::new(),
            rewards_pool: BTreeMap::new(),
            player_rewards: BTreeMap::new(),
            collected_fees: 0,
            season: 1,
            season_started_at: 0,
            clock: 0,
            events: Vec::new(),
        }
    }

    /// Collaborators.
    pub fn providers(&self) -> &P {
        &self.providers
    }

    /// Collaborators, mutably (funding accounts, changing levels...).
    pub fn providers_mut(&mut self) -> &mut P {
        &mut self.providers
    }

    /// Entered fighters.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Ranking points and boards.
    pub fn rankings(&self) -> &Rankings {
        &self.rankings
    }

    /// Active configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Replace the configuration.
    ///
    /// Administrative operation; callers must restrict access upstream.
    /// Costs and wagers follow the new values from the next call on; stakes
    /// already deposited are untouched.
    pub fn update_config(&mut self, config: ArenaConfig) -> Result<()> {
        config.validate()?;
        info!(?config, "arena config updated");
        self.config = config;
        Ok(())
    }

    // =========================================================================
    // CLOCK & EVENTS
    // =========================================================================

    /// Logical clock.
    pub fn clock(&self) -> Timestamp {
        self.clock
    }

    /// `now` clamped to the clock, without moving it.
    pub(crate) fn observed_time(&self, now: Timestamp) -> Timestamp {
        now.max(self.clock)
    }

    /// Move the clock to `now` if later. Returns the effective time.
    pub(crate) fn advance_clock(&mut self, now: Timestamp) -> Timestamp {
        self.clock = self.observed_time(now);
        self.clock
    }

    pub(crate) fn emit(&mut self, timestamp: Timestamp, data: ArenaEventData) {
        self.events.push(ArenaEvent::new(timestamp, data));
    }

    /// Take queued events (consumes them).
    pub fn drain_events(&mut self) -> Vec<ArenaEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // VALIDATION HELPERS
    // =========================================================================

    /// Tier of a character from its current level.
    pub(crate) fn current_tier(&self, character_id: CharacterId) -> Result<Tier> {
        self.providers
            .entities()
            .character_level(character_id)
            .map(|level| self.config.tier_for_level(level))
            .ok_or(ArenaError::UnknownEntity(EntityRef::Character(character_id)))
    }

    pub(crate) fn require_character_owner(
        &self,
        caller: Address,
        character_id: CharacterId,
    ) -> Result<()> {
        let owner = self.providers.entities().character_owner(character_id);
        check_owner(caller, EntityRef::Character(character_id), owner)
    }

    /// Caller owns the character and the character is entered.
    pub(crate) fn require_entered_owner(
        &self,
        caller: Address,
        character_id: CharacterId,
    ) -> Result<()> {
        self.require_character_owner(caller, character_id)?;
        if !self.registry.contains_character(character_id) {
            return Err(ArenaError::NotInArena(character_id));
        }
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Latest duel record of an attacker, pending or not.
    pub fn duel(&self, attacker_id: CharacterId) -> Option<&Duel> {
        self.duels.get(&attacker_id)
    }

    /// Does the character have an unresolved duel as attacker?
    ///
    /// An expired duel still counts until it is re-rolled.
    pub fn has_pending_duel(&self, character_id: CharacterId) -> bool {
        self.duels.get(&character_id).is_some_and(|d| d.pending)
    }

    /// Defender of the character's pending duel.
    pub fn get_opponent(&self, character_id: CharacterId) -> Result<CharacterId> {
        self.duels
            .get(&character_id)
            .filter(|d| d.pending)
            .map(|d| d.defender_id)
            .ok_or(ArenaError::NoPendingDuel(character_id))
    }

    /// Is the pending duel still inside its decision window?
    pub fn is_attacker_within_decision_time(&self, character_id: CharacterId, now: Timestamp) -> bool {
        let now = self.observed_time(now);
        self.duels
            .get(&character_id)
            .is_some_and(|d| d.pending && d.within_decision_window(now, self.config.decision_seconds))
    }

    /// Is the character past its unattackable window?
    ///
    /// Characters with no recorded activity are attackable.
    pub fn is_character_attackable(&self, character_id: CharacterId, now: Timestamp) -> bool {
        let now = self.observed_time(now);
        match self.last_activity.get(&character_id) {
            Some(last) => last.saturating_add(self.config.unattackable_seconds) <= now,
            None => true,
        }
    }

    /// Remaining stake of an entered character.
    pub fn character_wager(&self, character_id: CharacterId) -> Option<Amount> {
        self.registry.get(character_id).map(|f| f.stake)
    }

    /// Is the character entered?
    pub fn is_character_in_arena(&self, character_id: CharacterId) -> bool {
        self.registry.contains_character(character_id)
    }

    /// Is the weapon equipped by an entered fighter?
    pub fn is_weapon_in_arena(&self, weapon_id: WeaponId) -> bool {
        self.registry.contains_weapon(weapon_id)
    }

    /// Is the shield equipped by an entered fighter?
    pub fn is_shield_in_arena(&self, shield_id: ShieldId) -> bool {
        self.registry.contains_shield(shield_id)
    }

    /// Tier of a character from its current level.
    pub fn arena_tier(&self, character_id: CharacterId) -> Result<Tier> {
        self.current_tier(character_id)
    }

    /// Current ranked season.
    pub fn current_season(&self) -> u32 {
        self.season
    }

    /// When the current season started.
    pub fn season_started_at(&self) -> Timestamp {
        self.season_started_at
    }

    /// Compute hash of current state for replay verification.
    ///
    /// Covers everything a snapshot carries except bucket order, which
    /// follows from the operation sequence.
    pub fn state_hash(&self) -> StateHash {
        compute_state_hash(self.season, self.clock, |hasher| {
            hasher.update_u64(self.season_started_at);
            hasher.update_u64(self.collected_fees);

            hasher.update_u64(self.registry.len() as u64);
            for fighter in self.registry.fighters() {
                fighter.hash_into(hasher);
            }

            hasher.update_u64(self.duels.len() as u64);
            for duel in self.duels.values() {
                duel.hash_into(hasher);
            }

            for (id, at) in &self.last_activity {
                hasher.update_u64(id.0);
                hasher.update_u64(*at);
            }

            hasher.update_u64(self.rankings.all_points().len() as u64);
            for (id, points) in self.rankings.all_points() {
                hasher.update_u64(id.0);
                hasher.update_u64(*points);
            }
            for (tier, board) in self.rankings.boards() {
                hasher.update_u8(*tier);
                hasher.update_u8(board.len() as u8);
                for id in board {
                    hasher.update_u64(id.0);
                }
            }

            for (tier, pool) in &self.rewards_pool {
                hasher.update_u8(*tier);
                hasher.update_u64(*pool);
            }
            for (player, amount) in &self.player_rewards {
                hasher.update_bytes(player.as_bytes());
                hasher.update_u64(*amount);
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
