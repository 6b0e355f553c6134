//! Tier Leaderboards
//!
//! Ranking points per character and the top-3 board per tier.
//!
//! Boards are maintained incrementally: only the character whose points just
//! changed is moved, by adjacent comparisons. A character outside the board
//! only enters it through its own points change (or while the board has free
//! slots), so when a board member drops below an outsider the outsider stays
//! out until its next change. Boards are never re-sorted from scratch.
//!
//! A character holds at most one board slot. Each update names the tier the
//! character belongs to now; if its slot is on another tier's board (its
//! level moved since), that stale slot is dropped before the update runs.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::debug;

use super::config::TOP_RANKS;
use super::error::Result;
use super::events::ArenaEventData;
use super::providers::ArenaProviders;
use super::state::ArenaState;
use super::types::{CharacterId, Tier, Timestamp};

/// Ranking points and per-tier top boards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rankings {
    points: BTreeMap<CharacterId, u64>,
    boards: BTreeMap<Tier, Vec<CharacterId>>,
    /// Board each slotted character sits on.
    seats: BTreeMap<CharacterId, Tier>,
}

impl Rankings {
    /// Create empty rankings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranking points of a character (0 if never ranked).
    pub fn points(&self, id: CharacterId) -> u64 {
        self.points.get(&id).copied().unwrap_or(0)
    }

    /// Top characters of a tier, best first.
    pub fn top(&self, tier: Tier) -> &[CharacterId] {
        self.boards.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All boards.
    pub fn boards(&self) -> &BTreeMap<Tier, Vec<CharacterId>> {
        &self.boards
    }

    /// Tier whose board holds `id`, if any.
    pub fn seat(&self, id: CharacterId) -> Option<Tier> {
        self.seats.get(&id).copied()
    }

    /// All non-zero point totals.
    pub fn all_points(&self) -> &BTreeMap<CharacterId, u64> {
        &self.points
    }

    /// Give an entering character a chance at a free board slot.
    pub fn register(&mut self, id: CharacterId, tier: Tier) {
        self.reseat(id, tier);
        self.promote(id, tier);
    }

    /// Add `amount` points for a win. Returns the new total.
    pub fn record_win(&mut self, id: CharacterId, tier: Tier, amount: u64) -> u64 {
        let total = self.points(id).saturating_add(amount);
        self.reseat(id, tier);
        self.store(id, total);
        self.promote(id, tier);
        total
    }

    /// Remove `amount` points for a loss, flooring at zero. Returns the new total.
    pub fn record_loss(&mut self, id: CharacterId, tier: Tier, amount: u64) -> u64 {
        let current = self.points(id);
        let total = if current <= amount { 0 } else { current - amount };
        self.reseat(id, tier);
        self.store(id, total);
        self.demote(id, tier);
        total
    }

    /// Overwrite a character's points.
    pub fn set_points(&mut self, id: CharacterId, tier: Tier, points: u64) {
        let previous = self.points(id);
        self.reseat(id, tier);
        self.store(id, points);
        if points >= previous {
            self.promote(id, tier);
        } else {
            self.demote(id, tier);
        }
    }

    /// Clear all points and boards, returning the boards as they stood.
    pub fn reset(&mut self) -> BTreeMap<Tier, Vec<CharacterId>> {
        self.points.clear();
        self.seats.clear();
        std::mem::take(&mut self.boards)
    }

    /// Rebuild from stored parts.
    pub(crate) fn from_parts(
        points: BTreeMap<CharacterId, u64>,
        boards: BTreeMap<Tier, Vec<CharacterId>>,
    ) -> Self {
        let seats = boards
            .iter()
            .flat_map(|(tier, board)| board.iter().map(move |id| (*id, *tier)))
            .collect();
        Self { points, boards, seats }
    }

    fn store(&mut self, id: CharacterId, points: u64) {
        if points == 0 {
            self.points.remove(&id);
        } else {
            self.points.insert(id, points);
        }
    }

    /// Drop `id`'s slot if it sits on a board other than `tier`'s.
    ///
    /// Removing one entry keeps the old board ordered; the freed slot is
    /// filled by the next character that changes there.
    fn reseat(&mut self, id: CharacterId, tier: Tier) {
        let Some(seated) = self.seat(id).filter(|seated| *seated != tier) else {
            return;
        };
        self.seats.remove(&id);
        if let Some(board) = self.boards.get_mut(&seated) {
            board.retain(|c| *c != id);
            if board.is_empty() {
                self.boards.remove(&seated);
            }
        }
        debug!(character = %id, from = seated, to = tier, "left leaderboard after tier change");
    }

    /// Move `id` towards the top after its points did not decrease.
    fn promote(&mut self, id: CharacterId, tier: Tier) {
        let Self { points, boards, seats } = self;
        let score = |c: CharacterId| points.get(&c).copied().unwrap_or(0);
        let board = boards.entry(tier).or_default();

        let mut position = match board.iter().position(|c| *c == id) {
            Some(position) => position,
            None if board.len() < TOP_RANKS => {
                board.push(id);
                seats.insert(id, tier);
                board.len() - 1
            }
            None => {
                let last = board.len() - 1;
                if score(id) < score(board[last]) {
                    return;
                }
                debug!(tier, character = %id, replaced = %board[last], "entered leaderboard");
                seats.remove(&board[last]);
                seats.insert(id, tier);
                board[last] = id;
                last
            }
        };

        while position > 0 && score(board[position]) >= score(board[position - 1]) {
            board.swap(position, position - 1);
            position -= 1;
        }
    }

    /// Move `id` towards the bottom after its points decreased.
    fn demote(&mut self, id: CharacterId, tier: Tier) {
        let Self { points, boards, .. } = self;
        let score = |c: CharacterId| points.get(&c).copied().unwrap_or(0);
        let Some(board) = boards.get_mut(&tier) else {
            return;
        };
        let Some(mut position) = board.iter().position(|c| *c == id) else {
            return;
        };

        while position + 1 < board.len() && score(board[position + 1]) > score(board[position]) {
            board.swap(position, position + 1);
            position += 1;
        }
    }
}

impl<P: ArenaProviders> ArenaState<P> {
    /// Overwrite a character's ranking points.
    ///
    /// Administrative operation. No role check is performed here: callers
    /// exposing it must restrict it to an administrative role upstream.
    pub fn set_ranking_points(
        &mut self,
        character_id: CharacterId,
        points: u64,
        now: Timestamp,
    ) -> Result<()> {
        let tier = self.current_tier(character_id)?;
        let now = self.advance_clock(now);

        self.rankings.set_points(character_id, tier, points);
        self.emit(now, ArenaEventData::RankingPointsSet { character_id, points });
        debug!(character = %character_id, points, tier, "ranking points set");
        Ok(())
    }

    /// Top-ranked characters of the tier `character_id` currently belongs to.
    pub fn top_tier_players(&self, character_id: CharacterId) -> Result<Vec<CharacterId>> {
        let tier = self.current_tier(character_id)?;
        Ok(self.rankings.top(tier).to_vec())
    }

    /// Ranking points of a character.
    pub fn character_ranking_points(&self, character_id: CharacterId) -> u64 {
        self.rankings.points(character_id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
