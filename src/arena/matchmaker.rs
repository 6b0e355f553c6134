//! Matchmaker
//!
//! Opponent assignment inside the requester's tier bucket.
//!
//! ## Algorithm
//!
//! ```text
//! r = seed mod n                      (n = bucket size)
//! for i in 0..n:
//!     candidate = bucket[(r + i) mod n]
//!     skip if candidate == requester
//!     skip if candidate is inside its unattackable window
//!     skip if candidate is owned by the requester's address
//!     -> select candidate
//! none selected -> NoOpponentAvailable
//! ```

use tracing::info;

use super::error::{ArenaError, Result};
use super::events::ArenaEventData;
use super::providers::ArenaProviders;
use super::registry::TierBucket;
use super::state::ArenaState;
use super::types::{Address, CharacterId, Duel, Timestamp};

/// Scan `bucket` from `start`, wrapping once, for the first eligible member.
pub fn scan_bucket<F>(bucket: &TierBucket, start: usize, mut eligible: F) -> Option<CharacterId>
where
    F: FnMut(CharacterId) -> bool,
{
    let n = bucket.len();
    (0..n)
        .filter_map(|i| bucket.get((start + i) % n))
        .find(|candidate| eligible(*candidate))
}

impl<P: ArenaProviders> ArenaState<P> {
    /// Assign an opponent to a fighter without a pending duel.
    ///
    /// Returns the selected defender.
    pub fn request_opponent(
        &mut self,
        caller: Address,
        character_id: CharacterId,
        now: Timestamp,
    ) -> Result<CharacterId> {
        self.require_entered_owner(caller, character_id)?;
        if self.has_pending_duel(character_id) {
            return Err(ArenaError::DuelAlreadyPending(character_id));
        }

        let now = self.observed_time(now);
        let defender_id = self.find_opponent(caller, character_id, now)?;
        self.assign_duel(character_id, defender_id, now, false);
        Ok(defender_id)
    }

    /// Replace the opponent of a pending duel, charging the re-roll fee.
    ///
    /// The fee is a percentage of the current duel cost (a quarter by
    /// default) debited from `caller`. Returns the new defender.
    pub fn reroll_opponent(
        &mut self,
        caller: Address,
        character_id: CharacterId,
        now: Timestamp,
    ) -> Result<CharacterId> {
        self.require_entered_owner(caller, character_id)?;
        if !self.has_pending_duel(character_id) {
            return Err(ArenaError::NoPendingDuel(character_id));
        }

        let fee = self.config.reroll_fee(self.duel_cost(character_id)?);
        let now = self.observed_time(now);
        let defender_id = self.find_opponent(caller, character_id, now)?;

        if fee > 0 {
            self.providers.ledger().debit(caller, fee)?;
        }

        self.collected_fees = self.collected_fees.saturating_add(fee);
        self.assign_duel(character_id, defender_id, now, true);
        info!(character = %character_id, fee, "opponent re-rolled");
        Ok(defender_id)
    }

    /// Draw a start index and scan the requester's current tier.
    fn find_opponent(
        &mut self,
        caller: Address,
        character_id: CharacterId,
        now: Timestamp,
    ) -> Result<CharacterId> {
        let tier = self.current_tier(character_id)?;
        let seed = self.providers.randomness().seed(caller);

        let selected = self.registry.bucket(tier).and_then(|bucket| {
            let start = (seed % bucket.len().max(1) as u64) as usize;
            scan_bucket(bucket, start, |candidate| {
                candidate != character_id
                    && self.is_character_attackable(candidate, now)
                    && self.registry.get(candidate).is_some_and(|f| f.owner != caller)
            })
        });
        selected.ok_or(ArenaError::NoOpponentAvailable { character: character_id, tier })
    }

    fn assign_duel(
        &mut self,
        attacker_id: CharacterId,
        defender_id: CharacterId,
        now: Timestamp,
        rerolled: bool,
    ) {
        let now = self.advance_clock(now);
        self.duels.insert(attacker_id, Duel { attacker_id, defender_id, created_at: now, pending: true });
        self.last_activity.insert(attacker_id, now);
        self.last_activity.insert(defender_id, now);

        self.emit(now, ArenaEventData::DuelCreated { attacker_id, defender_id, rerolled });
        info!(attacker = %attacker_id, defender = %defender_id, rerolled, "duel created");
    }
}

// =============================================================================
// TESTS
// =============================================================================
