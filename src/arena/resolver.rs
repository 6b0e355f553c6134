//! Duel Resolver
//!
//! Power rolls, winner determination and settlement of a pending duel.
//!
//! ## Power roll
//!
//! ```text
//! power  = oracle.combine_power(base, weapon.multiplier, weapon.bonus_power)
//! jitter = power − power/10 + seed mod (2·(power/10) + 1)        (±10%)
//! roll   = trait_bonus × jitter                                  (truncated)
//!
//! trait_bonus = 1.0
//!             + bonus      if own element == weapon element
//!             + bonus / 2  if own element beats opponent's
//!             − bonus / 2  if opponent's element beats own
//! ```
//!
//! Each side's seed is the duel seed combined with its character ID.
//! Ties go to the attacker.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

#[cfg(feature = "debug-tracing")]
use tracing::debug;

use crate::core::fixed::{fixed_mul, mul_uint, Fixed, FIXED_HALF, FIXED_ONE};
use crate::core::rng::combine_seeds;

use super::economy::{split_bounty, BountySplit};
use super::error::{ArenaError, Result};
use super::events::ArenaEventData;
use super::providers::{ArenaProviders, PricingOracle, WeaponFightData};
use super::state::ArenaState;
use super::types::{Address, CharacterId, Element, EntityRef, Timestamp};

/// Result of a performed duel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelOutcome {
    /// Character that requested the duel
    pub attacker_id: CharacterId,
    /// Assigned opponent
    pub defender_id: CharacterId,
    /// Attacker's power roll
    pub attacker_roll: u64,
    /// Defender's power roll
    pub defender_roll: u64,
    /// Winning side
    pub winner_id: CharacterId,
    /// Losing side
    pub loser_id: CharacterId,
    /// How the bounty was distributed
    pub split: BountySplit,
    /// Loser ran out of stake and left the arena
    pub loser_evicted: bool,
}

/// Fight-relevant attributes of one side, gathered before any roll.
#[derive(Clone, Copy, Debug)]
struct Combatant {
    id: CharacterId,
    element: Element,
    power: u64,
    weapon: WeaponFightData,
}

/// Apply a ±10% jitter to `power`.
///
/// Saturates at `u64::MAX` for powers within a tenth of the maximum.
#[inline]
pub fn plus_minus_10_percent(power: u64, seed: u64) -> u64 {
    let tenth = power / 10;
    (power - tenth).saturating_add(seed % (2 * tenth + 1))
}

/// Fixed-point trait multiplier of a fighter against an opponent.
pub fn trait_bonus_against(
    oracle: &dyn PricingOracle,
    own: Element,
    weapon: Element,
    opponent: Element,
) -> Fixed {
    let bonus = oracle.trait_bonus();
    let half = fixed_mul(bonus, FIXED_HALF);
    let mut total = FIXED_ONE;

    if own == weapon {
        total += bonus;
    }
    if oracle.is_element_effective_against(own, opponent) {
        total += half;
    }
    if oracle.is_element_effective_against(opponent, own) {
        total -= half;
    }
    total
}

impl<P: ArenaProviders> ArenaState<P> {
    /// Perform the caller's pending duel and settle it.
    ///
    /// Fails with `DecisionExpired` once the decision window has elapsed;
    /// the duel then stays pending until it is re-rolled.
    pub fn perform_duel(
        &mut self,
        caller: Address,
        attacker_id: CharacterId,
        now: Timestamp,
    ) -> Result<DuelOutcome> {
        self.require_entered_owner(caller, attacker_id)?;
        let duel = *self
            .duels
            .get(&attacker_id)
            .filter(|d| d.pending)
            .ok_or(ArenaError::NoPendingDuel(attacker_id))?;

        let observed = self.observed_time(now);
        if !duel.within_decision_window(observed, self.config.decision_seconds) {
            return Err(ArenaError::DecisionExpired {
                attacker: attacker_id,
                created_at: duel.created_at,
                now: observed,
            });
        }

        let defender_id = duel.defender_id;
        if !self.registry.contains_character(defender_id) {
            return Err(ArenaError::OpponentLeft { attacker: attacker_id, defender: defender_id });
        }

        let attacker = self.combatant(attacker_id)?;
        let defender = self.combatant(defender_id)?;
        let attacker_tier = self.current_tier(attacker_id)?;
        let defender_tier = self.current_tier(defender_id)?;

        let seed = self.providers.randomness().seed(caller);
        let attacker_roll = self.power_roll(&attacker, &defender, seed);
        let defender_roll = self.power_roll(&defender, &attacker, seed);

        let (winner_id, loser_id, winner_tier, loser_tier) = if attacker_roll >= defender_roll {
            (attacker_id, defender_id, attacker_tier, defender_tier)
        } else {
            (defender_id, attacker_id, defender_tier, attacker_tier)
        };

        let (winner_owner, loser_owner, loser_stake) =
            match (self.registry.get(winner_id), self.registry.get(loser_id)) {
                (Some(winner), Some(loser)) => (winner.owner, loser.owner, loser.stake),
                _ => return Err(ArenaError::NotInArena(loser_id)),
            };

        // Stake below the current cost (price or tier moved since entry)
        // caps what is at risk.
        let duel_cost = self.duel_cost_for_tier(attacker_tier).min(loser_stake);
        let split = split_bounty(duel_cost, self.config.pool_tax_percent);

        // Settlement: nothing below can fail.
        let now = self.advance_clock(now);

        *self.player_rewards.entry(winner_owner).or_insert(0) += split.winner_reward;
        *self.rewards_pool.entry(attacker_tier).or_insert(0) += split.pool_tax;

        let remaining_stake = loser_stake - duel_cost;
        if let Some(loser) = self.registry.get_mut(loser_id) {
            loser.stake = remaining_stake;
        }
        if let Some(duel) = self.duels.get_mut(&attacker_id) {
            duel.pending = false;
        }

        self.rankings.record_win(winner_id, winner_tier, self.config.winning_points);
        self.rankings.record_loss(loser_id, loser_tier, self.config.losing_points);

        self.emit(now, ArenaEventData::DuelResolved {
            attacker_id,
            defender_id,
            attacker_roll,
            defender_roll,
            winner_id,
            loser_id,
            winner_reward: split.winner_reward,
            pool_tax: split.pool_tax,
            stake_lost: duel_cost,
        });
        info!(
            attacker = %attacker_id,
            defender = %defender_id,
            attacker_roll,
            defender_roll,
            winner = %winner_id,
            reward = split.winner_reward,
            tax = split.pool_tax,
            "duel resolved"
        );

        let loser_evicted = remaining_stake == 0;
        if loser_evicted {
            self.remove_fighter(loser_id);
            self.emit(now, ArenaEventData::FighterEvicted { character_id: loser_id, owner: loser_owner });
            warn!(character = %loser_id, owner = %loser_owner, "fighter evicted, stake exhausted");
        }

        Ok(DuelOutcome {
            attacker_id,
            defender_id,
            attacker_roll,
            defender_roll,
            winner_id,
            loser_id,
            split,
            loser_evicted,
        })
    }

    fn combatant(&self, id: CharacterId) -> Result<Combatant> {
        let entities = self.providers.entities();
        let unknown = || ArenaError::UnknownEntity(EntityRef::Character(id));

        let fighter = self.registry.get(id).ok_or(ArenaError::NotInArena(id))?;
        let element = entities.character_element(id).ok_or_else(unknown)?;
        let power = entities.character_power(id).ok_or_else(unknown)?;
        let weapon = entities
            .weapon_fight_data(fighter.weapon_id, element)
            .ok_or(ArenaError::UnknownEntity(EntityRef::Weapon(fighter.weapon_id)))?;

        Ok(Combatant { id, element, power, weapon })
    }

    fn power_roll(&self, own: &Combatant, opponent: &Combatant, duel_seed: u64) -> u64 {
        let oracle = self.providers.oracle();
        let power = oracle.combine_power(own.power, own.weapon.multiplier, own.weapon.bonus_power);
        let jittered = plus_minus_10_percent(power, combine_seeds(duel_seed, own.id.0));
        let bonus = trait_bonus_against(oracle, own.element, own.weapon.element, opponent.element);
        let roll = mul_uint(bonus, jittered);

        #[cfg(feature = "debug-tracing")]
        debug!(character = %own.id, power, jittered, bonus, roll, "power roll");

        roll
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::config::ArenaConfig;
    use crate::arena::error::ErrorKind;
    use crate::arena::memory::{FixedRateOracle, MemoryProviders};
    use crate::arena::testing::{alice, bob, enter_all, world};
    use crate::arena::providers::EntityAttributes;
    use crate::arena::types::WeaponId;
    use crate::core::fixed::DEFAULT_TRAIT_BONUS;
    use proptest::prelude::*;

    /// Arena where every fighter stakes exactly one duel cost (100).
    fn one_duel_world() -> ArenaState<MemoryProviders> {
        let mut arena = world();
        let config = ArenaConfig { wagering_factor: 1, ..arena.config().clone() };
        arena.update_config(config).unwrap();
        arena
    }

    fn set_power(arena: &mut ArenaState<MemoryProviders>, id: u64, power: u64) {
        let entities = &mut arena.providers_mut().entities;
        let owner = entities.character_owner(CharacterId(id)).unwrap();
        let level = entities.character_level(CharacterId(id)).unwrap();
        let element = entities.character_element(CharacterId(id)).unwrap();
        entities.add_character(CharacterId(id), owner, level, element, power);
    }

    /// Character 1 attacks character 3, created at 2000.
    fn duel_1_vs_3(arena: &mut ArenaState<MemoryProviders>) {
        enter_all(arena, &[1, 3], 1_000);
        arena.providers_mut().script_seeds([0]);
        assert_eq!(arena.request_opponent(alice(), CharacterId(1), 2_000).unwrap(), CharacterId(3));
    }

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(plus_minus_10_percent(1_000, 0), 900);
        assert_eq!(plus_minus_10_percent(1_000, 200), 1_100);
        assert_eq!(plus_minus_10_percent(1_000, 201), 900);
        assert_eq!(plus_minus_10_percent(9, 12345), 9);
        assert_eq!(plus_minus_10_percent(0, u64::MAX), 0);

        let tenth = u64::MAX / 10;
        assert_eq!(plus_minus_10_percent(u64::MAX, 0), u64::MAX - tenth);
        assert_eq!(plus_minus_10_percent(u64::MAX, 2 * tenth), u64::MAX);
    }

    #[test]
    fn test_saturated_power_still_wins() {
        for seed in 0..8 {
            let mut arena = world();
            duel_1_vs_3(&mut arena);
            set_power(&mut arena, 1, u64::MAX);
            arena.providers_mut().script_seeds([seed]);
            let outcome = arena.perform_duel(alice(), CharacterId(1), 2_010).unwrap();

            assert_eq!(outcome.winner_id, CharacterId(1));
            assert!(outcome.attacker_roll >= u64::MAX - u64::MAX / 10);
            assert!(outcome.defender_roll <= 1_100 * 2);
        }
    }

    #[test]
    fn test_eviction_after_tier_change_leaves_old_board() {
        let mut arena = one_duel_world();
        duel_1_vs_3(&mut arena);
        arena.set_ranking_points(CharacterId(3), 10, 2_000).unwrap();
        assert_eq!(arena.top_tier_players(CharacterId(1)).unwrap(), vec![CharacterId(3), CharacterId(1)]);

        // Character 3 levels up to tier 2 while its duel is pending.
        arena.providers_mut().entities.add_character(CharacterId(3), bob(), 25, Element::Lightning, 1);
        let outcome = arena.perform_duel(alice(), CharacterId(1), 2_010).unwrap();

        assert!(outcome.loser_evicted);
        assert_eq!(outcome.split.duel_cost, 100);
        assert_eq!(arena.character_ranking_points(CharacterId(3)), 7);
        assert_eq!(arena.top_tier_players(CharacterId(1)).unwrap(), vec![CharacterId(1)]);
        assert_eq!(arena.rankings().seat(CharacterId(3)), None);
        assert!(arena.registry().bucket(1).is_some_and(|b| !b.contains(CharacterId(3))));
        assert!(arena.registry().bucket(2).is_none());
    }

    #[test]
    fn test_trait_bonus_combinations() {
        let oracle = FixedRateOracle::default();
        let bonus = DEFAULT_TRAIT_BONUS;
        let half = fixed_mul(bonus, FIXED_HALF);

        // Fire wielding Fire against Earth: matching weapon and advantage.
        assert_eq!(
            trait_bonus_against(&oracle, Element::Fire, Element::Fire, Element::Earth),
            FIXED_ONE + bonus + half
        );
        // Fire wielding Water against Water: disadvantage only.
        assert_eq!(
            trait_bonus_against(&oracle, Element::Fire, Element::Water, Element::Water),
            FIXED_ONE - half
        );
        // Fire against Lightning is neutral.
        assert_eq!(
            trait_bonus_against(&oracle, Element::Fire, Element::Earth, Element::Lightning),
            FIXED_ONE
        );
    }

    #[test]
    fn test_rolls_match_formula() {
        let mut arena = world();
        duel_1_vs_3(&mut arena);
        arena.providers_mut().script_seeds([42]);

        let outcome = arena.perform_duel(alice(), CharacterId(1), 2_010).unwrap();

        // Both wield their own element; Fire and Lightning are neutral.
        let bonus = FIXED_ONE + DEFAULT_TRAIT_BONUS;
        let expected = |id: u64| mul_uint(bonus, plus_minus_10_percent(1_000, combine_seeds(42, id)));
        assert_eq!(outcome.attacker_roll, expected(1));
        assert_eq!(outcome.defender_roll, expected(3));

        let attacker_won = outcome.attacker_roll >= outcome.defender_roll;
        assert_eq!(outcome.winner_id == CharacterId(1), attacker_won);
    }

    #[test]
    fn test_attacker_wins_ties() {
        let mut arena = world();
        set_power(&mut arena, 1, 0);
        set_power(&mut arena, 3, 0);
        duel_1_vs_3(&mut arena);

        let outcome = arena.perform_duel(alice(), CharacterId(1), 2_010).unwrap();
        assert_eq!((outcome.attacker_roll, outcome.defender_roll), (0, 0));
        assert_eq!(outcome.winner_id, CharacterId(1));
    }

    #[test]
    fn test_tier_one_scenario_evicts_exhausted_defender() {
        // A = 1 (alice, 10 pts), B = 3 (bob, 20 pts), C = 4 (bob, 5 pts).
        let mut arena = one_duel_world();
        set_power(&mut arena, 3, 1);
        enter_all(&mut arena, &[1, 3, 4], 1_000);
        arena.set_ranking_points(CharacterId(1), 10, 1_000).unwrap();
        arena.set_ranking_points(CharacterId(3), 20, 1_000).unwrap();
        arena.set_ranking_points(CharacterId(4), 5, 1_000).unwrap();

        // Draw lands on B's slot.
        arena.providers_mut().script_seeds([1]);
        assert_eq!(arena.request_opponent(alice(), CharacterId(1), 2_000).unwrap(), CharacterId(3));
        assert_eq!(arena.character_wager(CharacterId(3)), Some(100));
        arena.drain_events();

        let outcome = arena.perform_duel(alice(), CharacterId(1), 2_050).unwrap();

        assert_eq!(outcome.winner_id, CharacterId(1));
        assert_eq!(outcome.split, BountySplit { duel_cost: 100, bounty: 200, pool_tax: 30, winner_reward: 70 });
        assert!(outcome.loser_evicted);
        assert_eq!(arena.player_rewards(alice()), 70);
        assert_eq!(arena.ranking_rewards_pool(1), 30);
        assert!(!arena.is_character_in_arena(CharacterId(3)));
        assert!(!arena.is_weapon_in_arena(WeaponId(3)));
        assert!(!arena.has_pending_duel(CharacterId(1)));

        assert_eq!(arena.character_ranking_points(CharacterId(1)), 15);
        assert_eq!(arena.character_ranking_points(CharacterId(3)), 17);
        assert_eq!(
            arena.top_tier_players(CharacterId(1)).unwrap(),
            vec![CharacterId(3), CharacterId(1), CharacterId(4)]
        );

        let events = arena.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].data, ArenaEventData::DuelResolved { stake_lost: 100, .. }));
        assert_eq!(
            events[1].data,
            ArenaEventData::FighterEvicted { character_id: CharacterId(3), owner: bob() }
        );
    }

    #[test]
    fn test_defender_win_costs_attacker_stake() {
        let mut arena = world();
        set_power(&mut arena, 1, 1);
        duel_1_vs_3(&mut arena);

        let outcome = arena.perform_duel(alice(), CharacterId(1), 2_010).unwrap();

        assert_eq!(outcome.winner_id, CharacterId(3));
        assert!(!outcome.loser_evicted);
        assert_eq!(arena.character_wager(CharacterId(1)), Some(200));
        assert_eq!(arena.character_wager(CharacterId(3)), Some(300));
        assert_eq!(arena.player_rewards(bob()), 70);
        assert_eq!(arena.player_rewards(alice()), 0);
        // Loss with no points floors at zero.
        assert_eq!(arena.character_ranking_points(CharacterId(1)), 0);
        assert_eq!(arena.character_ranking_points(CharacterId(3)), 5);
        assert!(!arena.has_pending_duel(CharacterId(1)));
    }

    #[test]
    fn test_duel_cost_capped_to_remaining_stake() {
        let mut arena = one_duel_world();
        set_power(&mut arena, 3, 1);
        duel_1_vs_3(&mut arena);

        let pricier = ArenaConfig { base_wager_usd_cents: 190, ..arena.config().clone() };
        arena.update_config(pricier).unwrap();
        assert_eq!(arena.duel_cost(CharacterId(1)).unwrap(), 200);

        let outcome = arena.perform_duel(alice(), CharacterId(1), 2_010).unwrap();
        assert_eq!(outcome.split.duel_cost, 100);
        assert_eq!(outcome.split.winner_reward + outcome.split.pool_tax, 100);
        assert!(outcome.loser_evicted);
    }

    #[test]
    fn test_expired_duel_stays_pending() {
        let mut arena = world();
        duel_1_vs_3(&mut arena);

        let err = arena.perform_duel(alice(), CharacterId(1), 2_180).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timing);
        assert!(arena.has_pending_duel(CharacterId(1)));
        assert!(!arena.is_attacker_within_decision_time(CharacterId(1), 2_180));

        // A new request is refused; a re-roll restarts the window.
        assert!(arena.request_opponent(alice(), CharacterId(1), 2_200).is_err());
        arena.reroll_opponent(alice(), CharacterId(1), 2_200).unwrap();
        arena.perform_duel(alice(), CharacterId(1), 2_210).unwrap();
    }

    #[test]
    fn test_departed_defender_keeps_duel_pending() {
        let mut arena = world();
        duel_1_vs_3(&mut arena);
        arena.withdraw_from_arena(bob(), CharacterId(3), 2_005).unwrap();

        let err = arena.perform_duel(alice(), CharacterId(1), 2_010).unwrap_err();
        assert!(matches!(err, ArenaError::OpponentLeft { defender: CharacterId(3), .. }));
        assert!(arena.has_pending_duel(CharacterId(1)));
    }

    #[test]
    fn test_perform_requires_owner_and_duel() {
        let mut arena = world();
        enter_all(&mut arena, &[1, 3], 1_000);

        let err = arena.perform_duel(alice(), CharacterId(1), 2_000).unwrap_err();
        assert!(matches!(err, ArenaError::NoPendingDuel(_)));

        arena.request_opponent(alice(), CharacterId(1), 2_000).unwrap();
        let err = arena.perform_duel(bob(), CharacterId(1), 2_001).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ownership);

        arena.perform_duel(alice(), CharacterId(1), 2_002).unwrap();
        let err = arena.perform_duel(alice(), CharacterId(1), 2_003).unwrap_err();
        assert!(matches!(err, ArenaError::NoPendingDuel(_)));
    }

    proptest! {
        #[test]
        fn prop_jitter_within_ten_percent(power in any::<u64>(), seed in any::<u64>()) {
            let jittered = plus_minus_10_percent(power, seed);
            prop_assert!(jittered >= power - power / 10);
            prop_assert!(jittered <= power.saturating_add(power / 10));
        }
    }
}
