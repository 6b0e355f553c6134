//! Arena Snapshots
//!
//! Serializable copy of the arena's own state. Collaborators (entities,
//! ledger, randomness) are not included; a restore is handed fresh ones.
//! Bucket order is saved so matchmaking draws replay identically.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::info;

use super::config::{ArenaConfig, ConfigError};
use super::leaderboard::Rankings;
use super::providers::ArenaProviders;
use super::registry::Registry;
use super::state::ArenaState;
use super::types::{Address, Amount, CharacterId, Duel, Fighter, Tier, Timestamp};

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Encoding or decoding failed.
    #[error("snapshot codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Snapshot written by an incompatible version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    Version {
        /// Version found in the snapshot.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// Configuration supplied for the restore is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Arena state at a point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    /// Layout version
    pub version: u32,
    /// Entered fighters, by character ID
    pub fighters: Vec<Fighter>,
    /// Member order of every tier bucket
    pub bucket_orders: BTreeMap<Tier, Vec<CharacterId>>,
    /// Latest duel per attacker
    pub duels: Vec<Duel>,
    /// Last activity per character
    pub last_activity: BTreeMap<CharacterId, Timestamp>,
    /// Ranking points per character
    pub ranking_points: BTreeMap<CharacterId, u64>,
    /// Top board per tier
    pub boards: BTreeMap<Tier, Vec<CharacterId>>,
    /// Pool tax per tier
    pub rewards_pool: BTreeMap<Tier, Amount>,
    /// Unclaimed winnings per player
    pub player_rewards: Vec<(Address, Amount)>,
    /// Retained fees
    pub collected_fees: Amount,
    /// Ranked season
    pub season: u32,
    /// Season start
    pub season_started_at: Timestamp,
    /// Logical clock
    pub clock: Timestamp,
}

impl ArenaSnapshot {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version { found: snapshot.version, expected: SNAPSHOT_VERSION });
        }
        Ok(snapshot)
    }
}

impl<P: ArenaProviders> ArenaState<P> {
    /// Capture the arena's state. Queued events are not included.
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            version: SNAPSHOT_VERSION,
            fighters: self.registry.fighters().cloned().collect(),
            bucket_orders: self
                .registry
                .buckets()
                .iter()
                .map(|(tier, bucket)| (*tier, bucket.members().to_vec()))
                .collect(),
            duels: self.duels.values().copied().collect(),
            last_activity: self.last_activity.clone(),
            ranking_points: self.rankings.all_points().clone(),
            boards: self.rankings.boards().clone(),
            rewards_pool: self.rewards_pool.clone(),
            player_rewards: self.player_rewards.iter().map(|(a, v)| (*a, *v)).collect(),
            collected_fees: self.collected_fees,
            season: self.season,
            season_started_at: self.season_started_at,
            clock: self.clock,
        }
    }

    /// Rebuild an arena from a snapshot with fresh collaborators.
    pub fn restore(
        snapshot: ArenaSnapshot,
        providers: P,
        config: ArenaConfig,
    ) -> Result<Self, SnapshotError> {
        config.validate()?;
        let fighters = snapshot.fighters.len();

        let mut arena = ArenaState::empty(config, providers);
        arena.registry = Registry::restore(snapshot.fighters, &snapshot.bucket_orders);
        arena.duels = snapshot.duels.into_iter().map(|d| (d.attacker_id, d)).collect();
        arena.last_activity = snapshot.last_activity;
        arena.rankings = Rankings::from_parts(snapshot.ranking_points, snapshot.boards);
        arena.rewards_pool = snapshot.rewards_pool;
        arena.player_rewards = snapshot.player_rewards.into_iter().collect();
        arena.collected_fees = snapshot.collected_fees;
        arena.season = snapshot.season;
        arena.season_started_at = snapshot.season_started_at;
        arena.clock = snapshot.clock;

        info!(fighters, season = arena.season, clock = arena.clock, "arena restored from snapshot");
        Ok(arena)
    }
}
