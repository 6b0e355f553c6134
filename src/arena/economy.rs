//! Wager Economy
//!
//! Duel cost, entry wager, bounty distribution, early-exit refunds,
//! player reward claims and season payouts.
//!
//! ## Bounty distribution
//!
//! ```text
//! bounty        = 2 × duel_cost
//! pool_tax      = bounty × tax% / 100          (truncated)
//! winner_reward = bounty − pool_tax − duel_cost
//!
//! winner_reward + pool_tax + duel_cost == bounty   (always)
//! ```

use serde::{Serialize, Deserialize};
use tracing::info;

use super::config::TOP_RANKS;
use super::error::{ArenaError, Result};
use super::events::ArenaEventData;
use super::providers::ArenaProviders;
use super::state::ArenaState;
use super::types::{Address, Amount, CharacterId, Tier, Timestamp};

/// How one duel's bounty is split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountySplit {
    /// Amount at stake this duel (taken from the loser).
    pub duel_cost: Amount,
    /// Total redistributed: 2 × duel cost.
    pub bounty: Amount,
    /// Diverted to the tier's reward pool.
    pub pool_tax: Amount,
    /// Credited to the winner's claimable rewards.
    pub winner_reward: Amount,
}

/// Split the bounty for a duel costing `duel_cost`.
///
/// `tax_percent` must be at most 50 (enforced by config validation);
/// larger values saturate the winner reward at zero.
pub fn split_bounty(duel_cost: Amount, tax_percent: u64) -> BountySplit {
    let bounty = duel_cost.saturating_mul(2);
    let pool_tax = ((bounty as u128 * tax_percent as u128) / 100) as Amount;
    let winner_reward = bounty.saturating_sub(pool_tax).saturating_sub(duel_cost);

    BountySplit { duel_cost, bounty, pool_tax, winner_reward }
}

/// Refund and penalty for withdrawing a fighter.
///
/// A pending duel costs a quarter of the stake (integer division).
pub fn withdrawal_refund(stake: Amount, duel_pending: bool) -> (Amount, Amount) {
    if duel_pending {
        let penalty = stake / 4;
        (stake - penalty, penalty)
    } else {
        (stake, 0)
    }
}

/// Share of `pool` for a prize percentage.
pub fn prize_share(pool: Amount, percent: u64) -> Amount {
    ((pool as u128 * percent as u128) / 100) as Amount
}

impl<P: ArenaProviders> ArenaState<P> {
    /// Duel cost at a tier, in staking tokens.
    pub fn duel_cost_for_tier(&self, tier: Tier) -> Amount {
        let usd = self.config.duel_cost_usd_cents(tier);
        self.providers.oracle().usd_to_stake(usd)
    }

    /// Duel cost for a character, from its current tier.
    pub fn duel_cost(&self, character_id: CharacterId) -> Result<Amount> {
        let tier = self.current_tier(character_id)?;
        Ok(self.duel_cost_for_tier(tier))
    }

    /// Stake required to enter a character.
    pub fn entry_wager(&self, character_id: CharacterId) -> Result<Amount> {
        let tier = self.current_tier(character_id)?;
        Ok(self.entry_wager_for_tier(tier))
    }

    /// Stake required to enter at a tier.
    pub fn entry_wager_for_tier(&self, tier: Tier) -> Amount {
        self.duel_cost_for_tier(tier).saturating_mul(self.config.wagering_factor)
    }

    /// Unclaimed duel winnings of a player.
    pub fn player_rewards(&self, player: Address) -> Amount {
        self.player_rewards.get(&player).copied().unwrap_or(0)
    }

    /// Accumulated pool tax of a tier.
    pub fn ranking_rewards_pool(&self, tier: Tier) -> Amount {
        self.rewards_pool.get(&tier).copied().unwrap_or(0)
    }

    /// Re-roll fees and early-exit penalties retained by the arena.
    pub fn collected_fees(&self) -> Amount {
        self.collected_fees
    }

    /// Pay out a player's accumulated winnings through the ledger.
    pub fn withdraw_rewards(&mut self, caller: Address, now: Timestamp) -> Result<Amount> {
        let amount = self.player_rewards(caller);
        if amount == 0 {
            return Err(ArenaError::NoRewards(caller));
        }

        self.providers.ledger().credit(caller, amount)?;

        let now = self.advance_clock(now);
        self.player_rewards.remove(&caller);
        self.emit(now, ArenaEventData::RewardsClaimed { player: caller, amount });
        info!(player = %caller, amount, "rewards claimed");
        Ok(amount)
    }

    /// Close the ranked season.
    ///
    /// Each tier's pool is split among the owners of its top-ranked
    /// characters by `prize_percentages`; what is paid leaves the pool, the
    /// rest carries over. All ranking points and boards are cleared.
    ///
    /// Administrative operation; callers must restrict access upstream.
    pub fn end_season(&mut self, now: Timestamp) -> Amount {
        let now = self.advance_clock(now);
        let boards = self.rankings.reset();
        let prizes = self.config.prize_percentages;
        let mut paid_out: Amount = 0;

        for (tier, board) in boards {
            let pool = self.ranking_rewards_pool(tier);
            if pool == 0 {
                continue;
            }
            let mut paid_from_pool: Amount = 0;

            for (rank, character_id) in board.iter().take(TOP_RANKS).enumerate() {
                let Some(owner) = self.season_prize_owner(*character_id) else {
                    continue;
                };
                let share = prize_share(pool, prizes[rank]);
                if share == 0 {
                    continue;
                }
                *self.player_rewards.entry(owner).or_insert(0) += share;
                paid_from_pool += share;
                info!(season = self.season, tier, rank = rank + 1, character = %character_id, share, "season prize");
            }

            self.rewards_pool.insert(tier, pool - paid_from_pool);
            paid_out += paid_from_pool;
        }

        let finished = self.season;
        self.emit(now, ArenaEventData::SeasonEnded { season: finished, paid_out });
        self.season += 1;
        self.season_started_at = now;
        info!(season = finished, paid_out, "ranked season ended");
        paid_out
    }

    fn season_prize_owner(&self, character_id: CharacterId) -> Option<Address> {
        match self.registry.get(character_id) {
            Some(fighter) => Some(fighter.owner),
            None => self.providers.entities().character_owner(character_id),
        }
    }
}
