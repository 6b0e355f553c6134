//! Arena Events
//!
//! Notifications produced by arena operations, queued in order of
//! occurrence and drained by the caller.

use serde::{Serialize, Deserialize};

use super::types::{Address, Amount, CharacterId, Tier, Timestamp, WeaponId, ShieldId};

/// Arena event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaEventData {
    /// Fighter entered the arena
    FighterEntered {
        /// Entered character
        character_id: CharacterId,
        /// Equipped weapon
        weapon_id: WeaponId,
        /// Equipped shield, if the slot is used
        shield_id: Option<ShieldId>,
        /// Entering address
        owner: Address,
        /// Bucket the fighter was filed under
        tier: Tier,
        /// Amount debited
        stake: Amount,
    },

    /// Fighter left voluntarily
    FighterWithdrew {
        /// Withdrawn character
        character_id: CharacterId,
        /// Address credited with the refund
        owner: Address,
        /// Amount credited
        refund: Amount,
        /// Early-exit penalty kept by the arena
        penalty: Amount,
    },

    /// Opponent assigned
    DuelCreated {
        /// Requesting character
        attacker_id: CharacterId,
        /// Selected opponent
        defender_id: CharacterId,
        /// Replaced an earlier assignment for a fee
        rerolled: bool,
    },

    /// Duel performed
    DuelResolved {
        /// Attacking character
        attacker_id: CharacterId,
        /// Defending character
        defender_id: CharacterId,
        /// Attacker's power roll
        attacker_roll: u64,
        /// Defender's power roll
        defender_roll: u64,
        /// Winning character
        winner_id: CharacterId,
        /// Losing character
        loser_id: CharacterId,
        /// Credited to the winner's owner
        winner_reward: Amount,
        /// Added to the tier pool
        pool_tax: Amount,
        /// Taken from the loser's stake
        stake_lost: Amount,
    },

    /// Loser's stake ran out
    FighterEvicted {
        /// Evicted character
        character_id: CharacterId,
        /// Address that entered it
        owner: Address,
    },

    /// Ranking points overwritten administratively
    RankingPointsSet {
        /// Updated character
        character_id: CharacterId,
        /// New total
        points: u64,
    },

    /// Player withdrew accumulated rewards
    RewardsClaimed {
        /// Claiming player
        player: Address,
        /// Amount credited
        amount: Amount,
    },

    /// Ranked season closed and pools paid out
    SeasonEnded {
        /// Season that closed
        season: u32,
        /// Moved from pools into player rewards
        paid_out: Amount,
    },
}

/// An arena event with its timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaEvent {
    /// Arena clock when the event occurred
    pub timestamp: Timestamp,

    /// Event data
    pub data: ArenaEventData,
}

impl ArenaEvent {
    /// Create a new event.
    pub fn new(timestamp: Timestamp, data: ArenaEventData) -> Self {
        Self { timestamp, data }
    }

    /// Character the event is about, if any.
    pub fn character_id(&self) -> Option<CharacterId> {
        match &self.data {
            ArenaEventData::FighterEntered { character_id, .. }
            | ArenaEventData::FighterWithdrew { character_id, .. }
            | ArenaEventData::FighterEvicted { character_id, .. }
            | ArenaEventData::RankingPointsSet { character_id, .. } => Some(*character_id),
            ArenaEventData::DuelCreated { attacker_id, .. }
            | ArenaEventData::DuelResolved { attacker_id, .. } => Some(*attacker_id),
            ArenaEventData::RewardsClaimed { .. } | ArenaEventData::SeasonEnded { .. } => None,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
