//! Deterministic Randomness
//!
//! Xorshift128+ stream for the in-memory randomness source, plus the
//! SHA-256 seed derivations the arena relies on.
//!
//! Seeds handed to the arena are plain `u64`s. Whenever one seed has to feed
//! several independent draws (for example both sides of a duel), it is split
//! with [`combine_seeds`], which hashes the inputs under a domain separator.

use sha2::{Sha256, Digest};

/// Xorshift128+ generator seeded through SplitMix64.
///
/// # Example
///
/// ```
/// use duel_arena::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(12345);
/// assert_eq!(rng.next_u64(), 6233086606872742541);
/// ```
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    s0: u64,
    s1: u64,
}

impl DeterministicRng {
    /// Seed a stream. Weak seeds (0, 1, 2, ...) still give unrelated streams.
    pub fn new(seed: u64) -> Self {
        let mut cursor = seed;
        let s0 = splitmix64(&mut cursor);
        let s1 = splitmix64(&mut cursor);

        // An all-zero state would only ever yield zeros.
        if s0 == 0 && s1 == 0 {
            Self { s0: 1, s1: 1 }
        } else {
            Self { s0, s1 }
        }
    }

    /// Next value of the stream.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let out = self.s0.wrapping_add(self.s1);
        let mixed = self.s1 ^ self.s0;

        self.s0 = self.s0.rotate_left(24) ^ mixed ^ (mixed << 16);
        self.s1 = mixed.rotate_left(37);
        out
    }
}

#[inline]
fn splitmix64(cursor: &mut u64) -> u64 {
    *cursor = cursor.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *cursor;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// First 8 bytes of a digest as a little-endian seed.
fn seed_from_digest(digest: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Mix a base seed with a discriminator into an independent seed.
///
/// Used to derive per-character seeds from one per-operation seed.
pub fn combine_seeds(seed: u64, discriminator: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"DUEL_ARENA_COMBINE_V1");
    hasher.update(seed.to_le_bytes());
    hasher.update(discriminator.to_le_bytes());
    seed_from_digest(&hasher.finalize())
}

/// Derive a per-call seed for a caller from an entropy stream value.
///
/// The caller bytes are mixed in so two players drawing from the same
/// stream position still see unrelated seeds.
pub fn derive_caller_seed(entropy: u64, caller: &[u8]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"DUEL_ARENA_SEED_V1");
    hasher.update(entropy.to_le_bytes());
    hasher.update(caller);
    seed_from_digest(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = DeterministicRng::new(12345);
        let mut b = DeterministicRng::new(12345);
        let mut other = DeterministicRng::new(12346);

        let mut diverged = false;
        for _ in 0..1000 {
            let value = a.next_u64();
            assert_eq!(value, b.next_u64());
            diverged |= value != other.next_u64();
        }
        assert!(diverged);
    }

    #[test]
    fn test_stream_values_are_pinned() {
        // Recorded arena replays depend on these.
        let mut rng = DeterministicRng::new(42);
        assert_eq!(rng.next_u64(), 16629283624882167704);
        assert_eq!(rng.next_u64(), 1420492921613871959);
        assert_eq!(rng.next_u64(), 9768315062676884790);
    }

    #[test]
    fn test_combine_seeds() {
        assert_eq!(combine_seeds(7, 1), combine_seeds(7, 1));
        assert_ne!(combine_seeds(7, 1), combine_seeds(7, 2));
        assert_ne!(combine_seeds(7, 1), combine_seeds(8, 1));
    }

    #[test]
    fn test_derive_caller_seed() {
        let a = derive_caller_seed(99, &[1u8; 20]);
        let b = derive_caller_seed(99, &[2u8; 20]);

        assert_eq!(a, derive_caller_seed(99, &[1u8; 20]));
        assert_ne!(a, b);
        assert_ne!(a, combine_seeds(99, 1));
    }
}
