//! Core deterministic primitives.
//!
//! Everything the arena computes from seeds and multipliers goes through
//! these types, so a replay of the same operations yields the same state.

pub mod fixed;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
