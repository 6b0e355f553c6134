//! Arena error types.
//!
//! Every rejected operation surfaces one [`ArenaError`]; [`ArenaError::kind`]
//! groups the variants into the categories callers branch on.

use std::fmt;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use super::config::ConfigError;
use super::types::{Address, Amount, CharacterId, EntityRef, Tier, Timestamp};

/// Result alias for arena operations.
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Value ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Account cannot cover a debit.
    #[error("{account} holds {available}, needs {needed}")]
    InsufficientFunds {
        /// Debited account.
        account: Address,
        /// Requested amount.
        needed: Amount,
        /// Current balance.
        available: Amount,
    },

    /// Credit would overflow the account balance.
    #[error("balance overflow crediting {account}")]
    Overflow {
        /// Credited account.
        account: Address,
    },
}

/// Arena operation errors.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The attribute provider does not know this entity.
    #[error("unknown {0}")]
    UnknownEntity(EntityRef),

    /// Caller does not own the referenced entity.
    #[error("{caller} does not own {entity}")]
    NotOwner {
        /// Entity checked.
        entity: EntityRef,
        /// Address that made the call.
        caller: Address,
    },

    /// Entity already entered by some fighter.
    #[error("{0} is already in the arena")]
    AlreadyInArena(EntityRef),

    /// Entity is locked by another activity.
    #[error("{0} is busy in another activity")]
    Busy(EntityRef),

    /// Character is not entered.
    #[error("{0} is not in the arena")]
    NotInArena(CharacterId),

    /// Character already has a pending duel.
    #[error("{0} already has a pending duel")]
    DuelAlreadyPending(CharacterId),

    /// Entry wager priced at zero; a fighter needs something at stake.
    #[error("entry wager for {0} is zero")]
    ZeroStake(CharacterId),

    /// Character has no pending duel.
    #[error("{0} has no pending duel")]
    NoPendingDuel(CharacterId),

    /// Defender left the arena after the duel was requested.
    #[error("{defender} left the arena; re-roll {attacker}'s opponent")]
    OpponentLeft {
        /// Attacker of the stale duel.
        attacker: CharacterId,
        /// Departed defender.
        defender: CharacterId,
    },

    /// Player has nothing to claim.
    #[error("{0} has no rewards to claim")]
    NoRewards(Address),

    /// Decision window elapsed.
    #[error("decision window for {attacker} expired (duel created at {created_at}, now {now})")]
    DecisionExpired {
        /// Attacker of the expired duel.
        attacker: CharacterId,
        /// When the duel was created.
        created_at: Timestamp,
        /// Time of the attempt.
        now: Timestamp,
    },

    /// Matchmaker scanned the whole tier without an eligible opponent.
    #[error("no opponent available for {character} in tier {tier}")]
    NoOpponentAvailable {
        /// Requesting character.
        character: CharacterId,
        /// Tier scanned.
        tier: Tier,
    },

    /// A state-changing request reached the read-only path.
    #[error("request changes arena state and cannot be answered as a query")]
    NotAQuery,

    /// Ledger rejected a transfer.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Configuration update rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Broad categories of [`ArenaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller does not own the referenced entity.
    Ownership,
    /// Entity already entered or busy elsewhere.
    Conflict,
    /// Duel/fighter state does not allow the operation.
    State,
    /// Decision window expired.
    Timing,
    /// No eligible opponent.
    Unavailable,
    /// Ledger could not cover a debit.
    InsufficientFunds,
    /// Invalid configuration.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Ownership => "ownership",
            ErrorKind::Conflict => "conflict",
            ErrorKind::State => "state",
            ErrorKind::Timing => "timing",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Config => "config",
        };
        write!(f, "{}", label)
    }
}

impl ArenaError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArenaError::UnknownEntity(_) | ArenaError::NotOwner { .. } => ErrorKind::Ownership,
            ArenaError::AlreadyInArena(_) | ArenaError::Busy(_) => ErrorKind::Conflict,
            ArenaError::NotInArena(_)
            | ArenaError::ZeroStake(_)
            | ArenaError::DuelAlreadyPending(_)
            | ArenaError::NoPendingDuel(_)
            | ArenaError::OpponentLeft { .. }
            | ArenaError::NoRewards(_)
            | ArenaError::NotAQuery => ErrorKind::State,
            ArenaError::DecisionExpired { .. } => ErrorKind::Timing,
            ArenaError::NoOpponentAvailable { .. } => ErrorKind::Unavailable,
            ArenaError::Ledger(LedgerError::InsufficientFunds { .. }) => ErrorKind::InsufficientFunds,
            ArenaError::Ledger(LedgerError::Overflow { .. }) => ErrorKind::State,
            ArenaError::Config(_) => ErrorKind::Config,
        }
    }
}
