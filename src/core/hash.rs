//! State Hashing for Verification
//!
//! Provides deterministic hashing of arena state for:
//! - Replay validation (same operations, same hash)
//! - Snapshot integrity checks

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for arena state.
///
/// Wraps SHA-256 with helpers for fixed-width integers.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for arena state.
    pub fn for_arena_state() -> Self {
        Self::new(b"DUEL_ARENA_STATE_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with an optional u64, tagging presence.
    #[inline]
    pub fn update_opt_u64(&mut self, value: Option<u64>) {
        match value {
            Some(v) => {
                self.update_u8(1);
                self.update_u64(v);
            }
            None => self.update_u8(0),
        }
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute state hash for arena verification.
///
/// Called by `ArenaState::state_hash()`. The closure adds the
/// state-specific data after the season and clock header.
pub fn compute_state_hash<F>(season: u32, clock: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_arena_state();

    hasher.update_u32(season);
    hasher.update_u64(clock);

    add_state(&mut hasher);

    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_arena_state();
            hasher.update_u32(100);
            hasher.update_u64(12345);
            hasher.update_opt_u64(Some(7));
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_optional_tagging() {
        let none = {
            let mut h = StateHasher::new(b"test");
            h.update_opt_u64(None);
            h.finalize()
        };
        let zero = {
            let mut h = StateHasher::new(b"test");
            h.update_opt_u64(Some(0));
            h.finalize()
        };

        assert_ne!(none, zero);
    }

    #[test]
    fn test_domain_separation() {
        let hash = |domain: &[u8]| {
            let mut h = StateHasher::new(domain);
            h.update_bytes(&[1, 2, 3, 4]);
            h.finalize()
        };
        assert_ne!(hash(b"DOMAIN_A"), hash(b"DOMAIN_B"));
        assert_ne!(hash(b"DUEL_ARENA_STATE_V1"), StateHasher::for_arena_state().finalize());
    }

    #[test]
    fn test_compute_state_hash() {
        let hash = compute_state_hash(1, 1_000, |hasher| hasher.update_u64(5));
        let same = compute_state_hash(1, 1_000, |hasher| hasher.update_u64(5));
        let later = compute_state_hash(1, 1_001, |hasher| hasher.update_u64(5));

        assert_eq!(hash, same);
        assert_ne!(hash, later);
    }
}
