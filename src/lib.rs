//! # Duel Arena
//!
//! Staked one-on-one duel arena: fighters enter with a token stake, are
//! matched inside their tier, fight with power rolls, and climb per-tier
//! leaderboards.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        DUEL ARENA                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── fixed.rs     - Q16.16 fixed-point arithmetic            │
//! │  ├── rng.rs       - Xorshift128+ PRNG, seed derivation       │
//! │  └── hash.rs      - State hashing for verification           │
//! │                                                              │
//! │  arena/           - Arena engine (deterministic)             │
//! │  ├── state.rs     - ArenaState aggregate and queries         │
//! │  ├── registry.rs  - Fighter table, enter/withdraw            │
//! │  ├── matchmaker.rs- Opponent assignment, re-rolls            │
//! │  ├── resolver.rs  - Power rolls, duel settlement             │
//! │  ├── economy.rs   - Costs, bounty split, claims, seasons     │
//! │  ├── leaderboard.rs- Ranking points, top-3 boards            │
//! │  ├── providers.rs - Collaborator traits                      │
//! │  └── snapshot.rs  - Save and restore                         │
//! │                                                              │
//! │  service/         - Async front (non-deterministic)          │
//! │  ├── handle.rs    - Single-writer ArenaService               │
//! │  └── protocol.rs  - Request/response messages                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `arena/` modules are **100% deterministic**:
//! - No floating-point arithmetic in duel logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies (callers pass `now`)
//! - All randomness from the injected `RandomnessSource`
//!
//! Given identical operations, collaborator state and seeds, an arena
//! reaches the **identical state hash** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod arena;
pub mod service;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::rng::DeterministicRng;
pub use arena::{
    Address, ArenaConfig, ArenaError, ArenaState, CharacterId, ErrorKind, MemoryProviders,
    ShieldId, WeaponId,
};
pub use service::{ArenaRequest, ArenaResponse, ArenaService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
