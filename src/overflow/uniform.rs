//! Overflow table probed along a per-key pseudo-random sequence

use crate::{
    probe::ProbeSequence,
    slot::{Probe, Search, Slot, empty_slots, is_vacant, probe},
};

/// Flat slot array with uniform random probing
#[derive(Debug)]
pub(crate) struct UniformTable<V> {
    /// Slot array, allocated once
    slots: Vec<Option<Slot<V>>>,
    /// Fixed table seed, mixed with the key hash into every sequence
    seed: u32,
    /// Length of the random phase
    probes: usize,
    /// Sweep the whole table after the random phase
    exhaustive: bool,
}

impl<V> UniformTable<V> {
    /// Allocates `len` empty slots probed `probes` times per key before the optional sweep
    pub(crate) fn new(len: usize, probes: usize, exhaustive: bool, seed: u32) -> Self {
        Self { slots: empty_slots(len), seed, probes, exhaustive }
    }

    /// Candidate indices for `hash`, identical for insert and lookup
    fn sequence(&self, hash: u32) -> ProbeSequence {
        ProbeSequence::new(hash ^ self.seed, hash, self.slots.len(), self.probes, self.exhaustive)
    }

    /// First free index on the path of `hash`
    pub(crate) fn vacancy(&self, hash: u32) -> Option<usize> {
        self.sequence(hash).find(|&index| is_vacant(&self.slots, index))
    }

    /// Walks the path of `hash` until `key` or an empty slot shows up
    pub(crate) fn find(&self, hash: u32, fingerprint: u8, key: &[u8]) -> Search<usize> {
        for index in self.sequence(hash) {
            match probe(&self.slots, index, fingerprint, key) {
                Probe::Hit => return Search::Found(index),
                Probe::Vacant => return Search::Absent,
                Probe::Miss => {}
            }
        }
        Search::Exhausted
    }

    /// Stores `slot` at the free `index`; false if it is taken or out of range
    pub(crate) fn place(&mut self, index: usize, slot: Slot<V>) -> bool {
        match self.slots.get_mut(index) {
            Some(entry @ None) => {
                *entry = Some(slot);
                true
            }
            _ => false,
        }
    }

    /// The occupied slot at `index`
    pub(crate) fn slot(&self, index: usize) -> Option<&Slot<V>> {
        self.slots.get(index)?.as_ref()
    }

    /// The occupied slot at `index`, mutably
    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot<V>> {
        self.slots.get_mut(index)?.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::top_hash;

    fn insert(table: &mut UniformTable<u32>, hash: u32, key: &[u8], value: u32) -> Option<usize> {
        let index = table.vacancy(hash)?;
        assert!(table.place(index, Slot::new(hash, key, value)));
        Some(index)
    }

    #[test]
    fn test_first_candidate_is_hash_mod_len() {
        let mut table = UniformTable::new(16, 2, false, 0xDEAD_BEEF);
        assert_eq!(insert(&mut table, 35, b"k", 1), Some(3));
        assert_eq!(table.find(35, top_hash(35), b"k"), Search::Found(3));
        assert_eq!(table.slot(3).map(|slot| slot.value), Some(1));
    }

    #[test]
    fn test_insert_and_lookup_follow_the_same_path() {
        let mut table = UniformTable::new(64, 3, true, 7);
        let mut placed = Vec::new();
        for i in 0..64_u32 {
            let hash = i.wrapping_mul(0x9E37_79B9);
            let key = i.to_le_bytes();
            let index = insert(&mut table, hash, &key, i);
            assert!(index.is_some(), "exhaustive table rejected key {i}");
            placed.push((hash, key, index));
        }
        for (hash, key, index) in placed {
            let found = table.find(hash, top_hash(hash), &key);
            assert_eq!(found, index.map_or(Search::Exhausted, Search::Found));
        }
        assert_eq!(table.vacancy(1), None);
    }

    #[test]
    fn test_limited_probing_gives_up() {
        let mut table = UniformTable::new(64, 1, false, 0);
        // Same hash, same single candidate: the second key has nowhere to go.
        assert!(insert(&mut table, 5, b"a", 1).is_some());
        assert_eq!(insert(&mut table, 5, b"b", 2), None);
        assert_eq!(table.find(5, top_hash(5), b"b"), Search::Exhausted);
    }

    #[test]
    fn test_empty_slot_proves_absence() {
        let table = UniformTable::<u32>::new(8, 2, false, 3);
        assert_eq!(table.find(11, top_hash(11), b"missing"), Search::Absent);
    }

    #[test]
    fn test_place_rejects_taken_slot() {
        let mut table = UniformTable::new(4, 1, true, 0);
        assert!(table.place(2, Slot::new(0, b"a", 1)));
        assert!(!table.place(2, Slot::new(0, b"b", 2)));
        assert!(!table.place(4, Slot::new(0, b"c", 3)));
        if let Some(slot) = table.slot_mut(2) {
            slot.value = 9;
        }
        assert_eq!(table.slot(2).map(|slot| slot.value), Some(9));
    }
}
