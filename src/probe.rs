//! Deterministic pseudo-random probe sequences
//!
//! A sequence is a pure function of its seed state, start hash and length: building it twice
//! yields the same candidate indices, so an insert and a later lookup of the same key walk the
//! same path without sharing any generator between calls.

use std::ops::Range;

use rand_chacha::{
    ChaCha8Rng,
    rand_core::{RngCore, SeedableRng},
};

/// Maps a 64-bit value onto `0..len`; `len` must be non-zero
#[inline]
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub(crate) fn reduce(value: u64, len: usize) -> usize {
    // The remainder is below `len`, so it always fits back into usize.
    (value % len as u64) as usize
}

/// Iterator over candidate slot indices for one key
#[derive(Debug, Clone)]
pub(crate) struct ProbeSequence {
    /// Generator seeded from the seed state, never reused across sequences
    rng: ChaCha8Rng,
    /// Length of the probed slot array
    len: usize,
    /// First index, yielded before any generator output
    first: Option<usize>,
    /// Remaining candidates of the random phase
    random_left: usize,
    /// Linear sweep over the whole array, run after the random phase in exhaustive mode
    sweep: Range<usize>,
}

impl ProbeSequence {
    /// Creates a sequence of `random_probes` candidates over `0..len`.
    ///
    /// The first candidate is `start mod len`, the following ones are drawn from a `ChaCha8`
    /// generator seeded with `seed_state`. When `exhaustive` is set, the random phase is followed
    /// by a sweep of every index in order, so the whole array is visited.
    pub(crate) fn new(
        seed_state: u32,
        start: u32,
        len: usize,
        random_probes: usize,
        exhaustive: bool,
    ) -> Self {
        let live = len > 0;
        Self {
            rng: ChaCha8Rng::seed_from_u64(u64::from(seed_state)),
            len,
            first: live.then(|| reduce(u64::from(start), len)),
            random_left: if live { random_probes } else { 0 },
            sweep: if live && exhaustive { 0..len } else { 0..0 },
        }
    }
}

impl Iterator for ProbeSequence {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.random_left > 0 {
            self.random_left = self.random_left.saturating_sub(1);
            return Some(match self.first.take() {
                Some(first) => first,
                None => reduce(self.rng.next_u64(), self.len),
            });
        }
        self.sweep.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.random_left.saturating_add(self.sweep.len());
        (left, Some(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_index_is_start_mod_len() {
        let mut seq = ProbeSequence::new(7, 23, 10, 4, false);
        assert_eq!(seq.next(), Some(3));
        assert_eq!(seq.count(), 3);
    }

    #[test]
    fn test_empty_array_yields_nothing() {
        assert_eq!(ProbeSequence::new(1, 2, 0, 5, true).count(), 0);
    }

    #[test]
    fn test_exhaustive_mode_visits_every_index() {
        let seq: Vec<usize> = ProbeSequence::new(99, 5, 16, 2, true).collect();
        assert_eq!(seq.len(), 18);
        for index in 0..16 {
            assert!(seq.contains(&index));
        }
    }

    #[test]
    fn test_seed_state_changes_sequence() {
        let left: Vec<usize> = ProbeSequence::new(1, 0, 1 << 20, 8, false).collect();
        let right: Vec<usize> = ProbeSequence::new(2, 0, 1 << 20, 8, false).collect();
        assert_eq!(left.first(), right.first());
        assert_ne!(left, right);
    }

    proptest! {
        #[test]
        fn prop_sequences_are_reproducible(
            seed in any::<u32>(),
            start in any::<u32>(),
            len in 1usize..512,
            probes in 0usize..64,
            exhaustive in any::<bool>(),
        ) {
            let first: Vec<usize> = ProbeSequence::new(seed, start, len, probes, exhaustive).collect();
            let second: Vec<usize> = ProbeSequence::new(seed, start, len, probes, exhaustive).collect();
            prop_assert_eq!(&first, &second);
            prop_assert!(first.iter().all(|&index| index < len));
        }
    }
}
