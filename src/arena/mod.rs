//! Arena Engine
//!
//! Staked duels between entered fighters.
//!
//! ## Module Structure
//!
//! - `types`: Identifiers, fighters, duels
//! - `config`: Economy and timing parameters
//! - `error`: Error types and categories
//! - `events`: Notifications produced by operations
//! - `providers`: Collaborator traits (entities, locks, ledger, randomness, pricing)
//! - `memory`: In-memory collaborators
//! - `state`: The `ArenaState` aggregate and its queries
//! - `registry`: Fighter table, enter/withdraw
//! - `matchmaker`: Opponent assignment and re-rolls
//! - `resolver`: Power rolls and duel settlement
//! - `economy`: Costs, bounty split, claims, seasons
//! - `leaderboard`: Ranking points and top-3 boards
//! - `snapshot`: Save and restore

pub mod types;
pub mod config;
pub mod error;
pub mod events;
pub mod providers;
pub mod memory;
pub mod state;
pub mod registry;
pub mod matchmaker;
pub mod resolver;
pub mod economy;
pub mod leaderboard;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use types::{Address, Amount, CharacterId, Duel, Element, EntityRef, Fighter, ShieldId, Tier, Timestamp, WeaponId};
pub use config::{ArenaConfig, ConfigError};
pub use error::{ArenaError, ErrorKind, LedgerError, Result};
pub use events::{ArenaEvent, ArenaEventData};
pub use providers::{
    ActivityLocks, ArenaProviders, EntityAttributes, PricingOracle, RandomnessSource, ValueLedger,
    WeaponFightData,
};
pub use memory::MemoryProviders;
pub use state::ArenaState;
pub use economy::BountySplit;
pub use resolver::DuelOutcome;
pub use snapshot::{ArenaSnapshot, SnapshotError};
