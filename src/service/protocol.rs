//! Arena Protocol
//!
//! Request and response messages for the arena service.
//! Messages are serialized as JSON; the caller's address is supplied by the
//! transport (after authentication), never by the message itself.

use serde::{Serialize, Deserialize};

use crate::arena::error::{ArenaError, ErrorKind};
use crate::arena::resolver::DuelOutcome;
use crate::arena::types::{Amount, CharacterId, ShieldId, Tier, Timestamp, WeaponId};

// =============================================================================
// REQUESTS
// =============================================================================

/// Operations and queries accepted by the arena service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaRequest {
    /// Enter a fighter, staking the entry wager.
    Enter {
        /// Character to enter.
        character_id: CharacterId,
        /// Weapon to equip.
        weapon_id: WeaponId,
        /// Shield to equip (ignored unless `use_shield`).
        #[serde(default)]
        shield_id: Option<ShieldId>,
        /// Whether the shield slot is used.
        #[serde(default)]
        use_shield: bool,
    },

    /// Assign an opponent.
    RequestOpponent {
        /// Attacking character.
        character_id: CharacterId,
    },

    /// Replace the pending opponent for a fee.
    RerollOpponent {
        /// Attacking character.
        character_id: CharacterId,
    },

    /// Fight the pending opponent.
    PerformDuel {
        /// Attacking character.
        character_id: CharacterId,
    },

    /// Leave the arena and recover the stake.
    Withdraw {
        /// Character to withdraw.
        character_id: CharacterId,
    },

    /// Pay out accumulated winnings.
    ClaimRewards,

    /// Current duel cost of a character.
    DuelCost {
        /// Character queried.
        character_id: CharacterId,
    },

    /// Entry wager of a character.
    EntryWager {
        /// Character queried.
        character_id: CharacterId,
    },

    /// Tier of a character.
    ArenaTier {
        /// Character queried.
        character_id: CharacterId,
    },

    /// Caller's entered characters, weapons and shields.
    MyParticipation,

    /// Top-ranked characters of a character's tier.
    TopTierPlayers {
        /// Character whose tier is queried.
        character_id: CharacterId,
    },

    /// Ranking points of a character.
    RankingPoints {
        /// Character queried.
        character_id: CharacterId,
    },

    /// Is a character entered?
    CharacterInArena {
        /// Character queried.
        character_id: CharacterId,
    },

    /// Is a weapon equipped in the arena?
    WeaponInArena {
        /// Weapon queried.
        weapon_id: WeaponId,
    },

    /// Is a shield equipped in the arena?
    ShieldInArena {
        /// Shield queried.
        shield_id: ShieldId,
    },

    /// Opponent of a pending duel.
    Opponent {
        /// Attacking character.
        character_id: CharacterId,
    },

    /// Remaining stake of a character.
    CharacterWager {
        /// Character queried.
        character_id: CharacterId,
    },

    /// Is the pending duel still inside its decision window?
    WithinDecisionTime {
        /// Attacking character.
        character_id: CharacterId,
    },

    /// Does a character have a pending duel?
    HasPendingDuel {
        /// Character queried.
        character_id: CharacterId,
    },

    /// Can a character be selected as an opponent right now?
    IsAttackable {
        /// Character queried.
        character_id: CharacterId,
    },

    /// Caller's unclaimed winnings.
    MyRewards,

    /// Accumulated pool of a tier.
    RankingRewardsPool {
        /// Tier queried.
        tier: Tier,
    },

    /// Current season number and start time.
    Season,

    /// Overwrite ranking points (administrative).
    SetRankingPoints {
        /// Character updated.
        character_id: CharacterId,
        /// New points.
        points: u64,
    },

    /// Close the season and pay out pools (administrative).
    EndSeason,
}

impl ArenaRequest {
    /// Does this request change arena state?
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ArenaRequest::Enter { .. }
                | ArenaRequest::RequestOpponent { .. }
                | ArenaRequest::RerollOpponent { .. }
                | ArenaRequest::PerformDuel { .. }
                | ArenaRequest::Withdraw { .. }
                | ArenaRequest::ClaimRewards
                | ArenaRequest::SetRankingPoints { .. }
                | ArenaRequest::EndSeason
        )
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Replies from the arena service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaResponse {
    /// Fighter entered with this stake.
    Entered {
        /// Staked amount.
        stake: Amount,
    },

    /// Opponent assigned.
    OpponentAssigned {
        /// Selected defender.
        defender_id: CharacterId,
    },

    /// Duel performed.
    DuelResolved {
        /// Rolls, winner and bounty split.
        outcome: DuelOutcome,
    },

    /// Fighter withdrew with this refund.
    Withdrawn {
        /// Refunded amount.
        refund: Amount,
    },

    /// Token amount (costs, wagers, rewards, pools, claims).
    Amount {
        /// Value.
        amount: Amount,
    },

    /// Tier number.
    Tier {
        /// Value.
        tier: Tier,
    },

    /// Ranking points.
    Points {
        /// Value.
        points: u64,
    },

    /// Yes/no answer.
    Flag {
        /// Value.
        value: bool,
    },

    /// Single character.
    Character {
        /// Value.
        character_id: CharacterId,
    },

    /// Ordered list of characters.
    Characters {
        /// Values.
        character_ids: Vec<CharacterId>,
    },

    /// Caller's entered fighters.
    Participation {
        /// Entered characters.
        characters: Vec<CharacterId>,
        /// Equipped weapons.
        weapons: Vec<WeaponId>,
        /// Equipped shields.
        shields: Vec<ShieldId>,
    },

    /// Season information.
    Season {
        /// Current season.
        season: u32,
        /// Season start.
        started_at: Timestamp,
    },

    /// Season closed.
    SeasonEnded {
        /// Closed season.
        season: u32,
        /// Total moved from pools to player rewards.
        paid_out: Amount,
    },

    /// Operation applied, nothing to report.
    Done,

    /// Operation rejected.
    Error(ErrorPayload),
}

impl ArenaResponse {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Is this a rejection?
    pub fn is_error(&self) -> bool {
        matches!(self, ArenaResponse::Error(_))
    }
}

/// Rejection details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl From<&ArenaError> for ErrorPayload {
    fn from(err: &ArenaError) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

impl From<ArenaError> for ArenaResponse {
    fn from(err: ArenaError) -> Self {
        ArenaResponse::Error(ErrorPayload::from(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_roundtrip() {
        let request = ArenaRequest::Enter {
            character_id: CharacterId(7),
            weapon_id: WeaponId(9),
            shield_id: Some(ShieldId(2)),
            use_shield: true,
        };

        let json = request.to_json().unwrap();
        assert!(json.contains("\"type\":\"enter\""));
        assert_eq!(ArenaRequest::from_json(&json).unwrap(), request);
    }

    #[test]
    fn test_enter_shield_fields_default() {
        let json = r#"{"type":"enter","character_id":1,"weapon_id":2}"#;
        let request = ArenaRequest::from_json(json).unwrap();

        assert_eq!(
            request,
            ArenaRequest::Enter {
                character_id: CharacterId(1),
                weapon_id: WeaponId(2),
                shield_id: None,
                use_shield: false,
            }
        );
    }

    #[test]
    fn test_unit_requests_parse() {
        assert_eq!(ArenaRequest::from_json(r#"{"type":"claim_rewards"}"#).unwrap(), ArenaRequest::ClaimRewards);
        assert_eq!(
            ArenaRequest::from_json(r#"{"type":"ranking_rewards_pool","tier":2}"#).unwrap(),
            ArenaRequest::RankingRewardsPool { tier: 2 }
        );
        assert!(ArenaRequest::from_json(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn test_mutations_are_flagged() {
        assert!(ArenaRequest::ClaimRewards.is_mutation());
        assert!(ArenaRequest::PerformDuel { character_id: CharacterId(1) }.is_mutation());
        assert!(!ArenaRequest::MyRewards.is_mutation());
        assert!(!ArenaRequest::Opponent { character_id: CharacterId(1) }.is_mutation());
    }

    #[test]
    fn test_error_response_carries_kind() {
        let response = ArenaResponse::from(ArenaError::NoPendingDuel(CharacterId(4)));
        let json = response.to_json().unwrap();

        assert!(json.contains("\"kind\":\"state\""));
        assert!(json.contains("character#4 has no pending duel"));
        assert!(ArenaResponse::from_json(&json).unwrap().is_error());
    }
}
