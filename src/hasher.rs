//! Key hashing: the pluggable `bytes -> u32` function every prober works from

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// The largest prime below 2^32. Default hashes are reduced modulo this value.
pub const PRIME32: u64 = 0xffff_fffb;

/// Reduces a key to the 32-bit hash the probers work with.
///
/// Any `Fn(&[u8]) -> u32` closure is a `KeyHasher`, which makes it easy to plug in a fixed
/// function, for example to force collisions in tests.
pub trait KeyHasher {
    /// Hashes `key` into a 32-bit value
    fn hash_key(&self, key: &[u8]) -> u32;
}

impl<F> KeyHasher for F
where
    F: Fn(&[u8]) -> u32,
{
    fn hash_key(&self, key: &[u8]) -> u32 {
        self(key)
    }
}

/// Default hasher: seeded xxh3-64 folded into the 32-bit prime-modular space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededHasher {
    /// Seed mixed into every xxh3 invocation
    seed: u64,
}

impl SeededHasher {
    /// Creates a hasher with the given seed
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Returns the seed of this hasher
    #[must_use]
    pub const fn seed(self) -> u64 {
        self.seed
    }
}

impl Default for SeededHasher {
    fn default() -> Self {
        Self::new(rand::random())
    }
}

impl KeyHasher for SeededHasher {
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
    fn hash_key(&self, key: &[u8]) -> u32 {
        // The remainder is below PRIME32, so it always fits into u32.
        (xxh3_64_with_seed(key, self.seed) % PRIME32) as u32
    }
}

/// Fingerprint cached in every slot: the high byte of the key hash
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn top_hash(hash: u32) -> u8 {
    (hash >> 24) as u8
}
