//! Arena Service Handle
//!
//! Async front for an `ArenaState`. The arena lives behind one
//! `tokio::sync::RwLock`: every mutation takes the write lock for its whole
//! duration, so operations never interleave; queries share the read lock.
//! Timestamps come from an injected [`Clock`]. Events drained after each
//! mutation are forwarded on a broadcast channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, instrument, warn};

use crate::arena::error::{ArenaError, Result};
use crate::arena::events::ArenaEvent;
use crate::arena::providers::ArenaProviders;
use crate::arena::resolver::DuelOutcome;
use crate::arena::snapshot::ArenaSnapshot;
use crate::arena::state::ArenaState;
use crate::arena::types::{Address, Amount, CharacterId, ShieldId, Timestamp, WeaponId};
use crate::core::hash::StateHash;

use super::protocol::{ArenaRequest, ArenaResponse};

/// Event channel capacity; slow subscribers lag past this.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// CLOCK
// =============================================================================

/// Source of the current time in unix seconds.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp().max(0) as Timestamp
    }
}

/// Clock moved by hand, for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Clock stopped at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self { now: AtomicU64::new(now) }
    }

    /// Jump to `now`.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Shared handle to a single arena.
pub struct ArenaService<P> {
    arena: Arc<RwLock<ArenaState<P>>>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<ArenaEvent>,
}

impl<P> Clone for ArenaService<P> {
    fn clone(&self) -> Self {
        Self {
            arena: Arc::clone(&self.arena),
            clock: Arc::clone(&self.clock),
            events: self.events.clone(),
        }
    }
}

impl<P: ArenaProviders + Send + Sync> ArenaService<P> {
    /// Wrap an arena.
    pub fn new(arena: ArenaState<P>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { arena: Arc::new(RwLock::new(arena)), clock, events }
    }

    /// Receive events from subsequent operations.
    pub fn subscribe(&self) -> broadcast::Receiver<ArenaEvent> {
        self.events.subscribe()
    }

    /// Run a read-only closure against the arena.
    pub async fn read<R>(&self, f: impl FnOnce(&ArenaState<P>) -> R) -> R {
        let arena = self.arena.read().await;
        f(&arena)
    }

    /// Run a mutation under the write lock, then publish its events.
    async fn mutate<R>(
        &self,
        op: impl FnOnce(&mut ArenaState<P>, Timestamp) -> Result<R>,
    ) -> Result<R> {
        let mut arena = self.arena.write().await;
        let now = self.clock.now();
        let result = op(&mut arena, now);

        let events = arena.drain_events();
        drop(arena);
        self.publish(events);
        result
    }

    fn publish(&self, events: Vec<ArenaEvent>) {
        for event in events {
            // No subscribers is not an error.
            if self.events.send(event).is_err() {
                debug!("arena event dropped, no subscribers");
            }
        }
    }

    /// Enter a fighter. `shield_id` is only equipped when `use_shield`.
    #[instrument(skip(self))]
    pub async fn enter_arena(
        &self,
        caller: Address,
        character_id: CharacterId,
        weapon_id: WeaponId,
        shield_id: Option<ShieldId>,
        use_shield: bool,
    ) -> Result<Amount> {
        let shield_id = shield_id.filter(|_| use_shield);
        self.mutate(|arena, now| arena.enter_arena(caller, character_id, weapon_id, shield_id, now))
            .await
    }

    /// Assign an opponent.
    #[instrument(skip(self))]
    pub async fn request_opponent(&self, caller: Address, character_id: CharacterId) -> Result<CharacterId> {
        self.mutate(|arena, now| arena.request_opponent(caller, character_id, now)).await
    }

    /// Replace the pending opponent for a fee.
    #[instrument(skip(self))]
    pub async fn reroll_opponent(&self, caller: Address, character_id: CharacterId) -> Result<CharacterId> {
        self.mutate(|arena, now| arena.reroll_opponent(caller, character_id, now)).await
    }

    /// Fight the pending opponent.
    #[instrument(skip(self))]
    pub async fn perform_duel(&self, caller: Address, character_id: CharacterId) -> Result<DuelOutcome> {
        self.mutate(|arena, now| arena.perform_duel(caller, character_id, now)).await
    }

    /// Withdraw a fighter.
    #[instrument(skip(self))]
    pub async fn withdraw_from_arena(&self, caller: Address, character_id: CharacterId) -> Result<Amount> {
        self.mutate(|arena, now| arena.withdraw_from_arena(caller, character_id, now)).await
    }

    /// Claim accumulated winnings.
    #[instrument(skip(self))]
    pub async fn withdraw_rewards(&self, caller: Address) -> Result<Amount> {
        self.mutate(|arena, now| arena.withdraw_rewards(caller, now)).await
    }

    /// Overwrite ranking points (administrative).
    #[instrument(skip(self))]
    pub async fn set_ranking_points(&self, character_id: CharacterId, points: u64) -> Result<()> {
        self.mutate(|arena, now| arena.set_ranking_points(character_id, points, now)).await
    }

    /// Close the season (administrative). Returns the amount paid out.
    #[instrument(skip(self))]
    pub async fn end_season(&self) -> Amount {
        let paid = self.mutate(|arena, now| Ok(arena.end_season(now))).await;
        paid.unwrap_or_default()
    }

    /// Capture the arena state.
    pub async fn snapshot(&self) -> ArenaSnapshot {
        self.read(ArenaState::snapshot).await
    }

    /// Hash of the arena state.
    pub async fn state_hash(&self) -> StateHash {
        self.read(ArenaState::state_hash).await
    }

    /// Execute a protocol request on behalf of `caller`.
    #[instrument(skip(self))]
    pub async fn handle(&self, caller: Address, request: ArenaRequest) -> ArenaResponse {
        let result = if request.is_mutation() {
            self.mutate(|arena, now| apply_mutation(arena, caller, &request, now)).await
        } else {
            let now = self.clock.now();
            self.read(|arena| answer_query(arena, caller, &request, now)).await
        };

        result.unwrap_or_else(|err| {
            warn!(%caller, kind = %err.kind(), error = %err, "arena request rejected");
            ArenaResponse::from(err)
        })
    }
}

/// Apply a state-changing request.
fn apply_mutation<P: ArenaProviders>(
    arena: &mut ArenaState<P>,
    caller: Address,
    request: &ArenaRequest,
    now: Timestamp,
) -> Result<ArenaResponse> {
    let response = match *request {
        ArenaRequest::Enter { character_id, weapon_id, shield_id, use_shield } => {
            let shield_id = shield_id.filter(|_| use_shield);
            let stake = arena.enter_arena(caller, character_id, weapon_id, shield_id, now)?;
            ArenaResponse::Entered { stake }
        }
        ArenaRequest::RequestOpponent { character_id } => ArenaResponse::OpponentAssigned {
            defender_id: arena.request_opponent(caller, character_id, now)?,
        },
        ArenaRequest::RerollOpponent { character_id } => ArenaResponse::OpponentAssigned {
            defender_id: arena.reroll_opponent(caller, character_id, now)?,
        },
        ArenaRequest::PerformDuel { character_id } => ArenaResponse::DuelResolved {
            outcome: arena.perform_duel(caller, character_id, now)?,
        },
        ArenaRequest::Withdraw { character_id } => ArenaResponse::Withdrawn {
            refund: arena.withdraw_from_arena(caller, character_id, now)?,
        },
        ArenaRequest::ClaimRewards => ArenaResponse::Amount {
            amount: arena.withdraw_rewards(caller, now)?,
        },
        ArenaRequest::SetRankingPoints { character_id, points } => {
            arena.set_ranking_points(character_id, points, now)?;
            ArenaResponse::Done
        }
        ArenaRequest::EndSeason => {
            let season = arena.current_season();
            let paid_out = arena.end_season(now);
            ArenaResponse::SeasonEnded { season, paid_out }
        }
        _ => return answer_query(arena, caller, request, now),
    };
    Ok(response)
}

/// Answer a read-only request.
fn answer_query<P: ArenaProviders>(
    arena: &ArenaState<P>,
    caller: Address,
    request: &ArenaRequest,
    now: Timestamp,
) -> Result<ArenaResponse> {
    let response = match *request {
        ArenaRequest::DuelCost { character_id } => ArenaResponse::Amount {
            amount: arena.duel_cost(character_id)?,
        },
        ArenaRequest::EntryWager { character_id } => ArenaResponse::Amount {
            amount: arena.entry_wager(character_id)?,
        },
        ArenaRequest::ArenaTier { character_id } => ArenaResponse::Tier {
            tier: arena.arena_tier(character_id)?,
        },
        ArenaRequest::MyParticipation => ArenaResponse::Participation {
            characters: arena.participating_characters(caller).collect(),
            weapons: arena.participating_weapons(caller).collect(),
            shields: arena.participating_shields(caller).collect(),
        },
        ArenaRequest::TopTierPlayers { character_id } => ArenaResponse::Characters {
            character_ids: arena.top_tier_players(character_id)?,
        },
        ArenaRequest::RankingPoints { character_id } => ArenaResponse::Points {
            points: arena.character_ranking_points(character_id),
        },
        ArenaRequest::CharacterInArena { character_id } => ArenaResponse::Flag {
            value: arena.is_character_in_arena(character_id),
        },
        ArenaRequest::WeaponInArena { weapon_id } => ArenaResponse::Flag {
            value: arena.is_weapon_in_arena(weapon_id),
        },
        ArenaRequest::ShieldInArena { shield_id } => ArenaResponse::Flag {
            value: arena.is_shield_in_arena(shield_id),
        },
        ArenaRequest::Opponent { character_id } => ArenaResponse::Character {
            character_id: arena.get_opponent(character_id)?,
        },
        ArenaRequest::CharacterWager { character_id } => ArenaResponse::Amount {
            amount: arena.character_wager(character_id).unwrap_or(0),
        },
        ArenaRequest::WithinDecisionTime { character_id } => ArenaResponse::Flag {
            value: arena.is_attacker_within_decision_time(character_id, now),
        },
        ArenaRequest::HasPendingDuel { character_id } => ArenaResponse::Flag {
            value: arena.has_pending_duel(character_id),
        },
        ArenaRequest::IsAttackable { character_id } => ArenaResponse::Flag {
            value: arena.is_character_attackable(character_id, now),
        },
        ArenaRequest::MyRewards => ArenaResponse::Amount { amount: arena.player_rewards(caller) },
        ArenaRequest::RankingRewardsPool { tier } => ArenaResponse::Amount {
            amount: arena.ranking_rewards_pool(tier),
        },
        ArenaRequest::Season => ArenaResponse::Season {
            season: arena.current_season(),
            started_at: arena.season_started_at(),
        },
        ArenaRequest::Enter { .. }
        | ArenaRequest::RequestOpponent { .. }
        | ArenaRequest::RerollOpponent { .. }
        | ArenaRequest::PerformDuel { .. }
        | ArenaRequest::Withdraw { .. }
        | ArenaRequest::ClaimRewards
        | ArenaRequest::SetRankingPoints { .. }
        | ArenaRequest::EndSeason => return Err(ArenaError::NotAQuery),
    };
    Ok(response)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::error::ErrorKind;
    use crate::arena::events::ArenaEventData;
    use crate::arena::memory::MemoryProviders;
    use crate::arena::testing::{alice, bob, world, ALICE_SHIELD};

    fn service() -> (ArenaService<MemoryProviders>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (ArenaService::new(world(), clock.clone()), clock)
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        clock.advance(5);
        assert_eq!(clock.now(), 15);
        clock.set(3);
        assert_eq!(clock.now(), 3);
        assert!(SystemClock.now() > 1_600_000_000);
    }

    #[tokio::test]
    async fn test_full_duel_through_service() {
        let (service, clock) = service();
        let mut events = service.subscribe();

        service.enter_arena(alice(), CharacterId(1), WeaponId(1), None, false).await.unwrap();
        service.enter_arena(bob(), CharacterId(3), WeaponId(3), None, false).await.unwrap();

        clock.advance(200);
        let defender = service.request_opponent(alice(), CharacterId(1)).await.unwrap();
        assert_eq!(defender, CharacterId(3));

        clock.advance(10);
        let outcome = service.perform_duel(alice(), CharacterId(1)).await.unwrap();
        assert_eq!(outcome.split.bounty, 200);

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.data);
        }
        assert_eq!(kinds.len(), 4);
        assert!(matches!(kinds[2], ArenaEventData::DuelCreated { rerolled: false, .. }));
        assert!(matches!(kinds[3], ArenaEventData::DuelResolved { .. }));
    }

    #[tokio::test]
    async fn test_shield_requires_use_flag() {
        let (service, _) = service();

        service
            .enter_arena(alice(), CharacterId(1), WeaponId(1), Some(ALICE_SHIELD), false)
            .await
            .unwrap();

        assert!(!service.read(|arena| arena.is_shield_in_arena(ALICE_SHIELD)).await);
    }

    #[tokio::test]
    async fn test_handle_maps_requests_and_errors() {
        let (service, clock) = service();

        let response = service
            .handle(alice(), ArenaRequest::Enter {
                character_id: CharacterId(1),
                weapon_id: WeaponId(1),
                shield_id: Some(ALICE_SHIELD),
                use_shield: true,
            })
            .await;
        assert_eq!(response, ArenaResponse::Entered { stake: 300 });

        let response = service
            .handle(alice(), ArenaRequest::ShieldInArena { shield_id: ALICE_SHIELD })
            .await;
        assert_eq!(response, ArenaResponse::Flag { value: true });

        let response = service
            .handle(alice(), ArenaRequest::RequestOpponent { character_id: CharacterId(1) })
            .await;
        match response {
            ArenaResponse::Error(payload) => assert_eq!(payload.kind, ErrorKind::Unavailable),
            other => panic!("unexpected response {:?}", other),
        }

        clock.advance(1);
        let response = service.handle(alice(), ArenaRequest::MyParticipation).await;
        assert_eq!(
            response,
            ArenaResponse::Participation {
                characters: vec![CharacterId(1)],
                weapons: vec![WeaponId(1)],
                shields: vec![ALICE_SHIELD],
            }
        );

        let response = service.handle(alice(), ArenaRequest::ClaimRewards).await;
        assert!(response.is_error());
    }

    #[test]
    fn test_read_path_rejects_mutations() {
        let arena = world();

        for request in [
            ArenaRequest::ClaimRewards,
            ArenaRequest::EndSeason,
            ArenaRequest::PerformDuel { character_id: CharacterId(1) },
        ] {
            assert!(request.is_mutation());
            let err = answer_query(&arena, alice(), &request, 1_000).unwrap_err();
            assert!(matches!(err, ArenaError::NotAQuery));
            assert_eq!(err.kind(), ErrorKind::State);
        }
        assert_eq!(arena.current_season(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_entries_are_serialized() {
        let (service, _) = service();

        let a = service.clone();
        let b = service.clone();
        let (first, second) = tokio::join!(
            a.enter_arena(alice(), CharacterId(1), WeaponId(1), None, false),
            b.enter_arena(alice(), CharacterId(1), WeaponId(1), None, false),
        );

        // Exactly one of the two identical entries wins.
        assert!(first.is_ok() ^ second.is_ok());
        let balance = service.read(|arena| arena.providers().ledger.balance_of(alice())).await;
        assert_eq!(balance, 10_000 - 300);
    }

    #[tokio::test]
    async fn test_season_request() {
        let (service, clock) = service();
        service.set_ranking_points(CharacterId(1), 9).await.unwrap();

        clock.set(5_000);
        let response = service.handle(bob(), ArenaRequest::EndSeason).await;
        assert_eq!(response, ArenaResponse::SeasonEnded { season: 1, paid_out: 0 });

        let response = service.handle(bob(), ArenaRequest::Season).await;
        assert_eq!(response, ArenaResponse::Season { season: 2, started_at: 5_000 });
        assert_eq!(service.read(|arena| arena.character_ranking_points(CharacterId(1))).await, 0);
    }
}
