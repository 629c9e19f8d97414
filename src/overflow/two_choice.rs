//! Bucketed overflow table with two-choice hashing

use crate::{
    probe::reduce,
    slot::{Probe, Search, Slot, empty_slots, is_vacant, probe},
};

/// Flat slot array split into equal buckets; every key may live in one of two of them
#[derive(Debug)]
pub(crate) struct TwoChoiceTable<V> {
    /// Slot array, a whole number of buckets
    slots: Vec<Option<Slot<V>>>,
    /// Slots per bucket
    bucket: usize,
    /// Seeds selecting the first and the second candidate bucket
    seeds: [u32; 2],
}

impl<V> TwoChoiceTable<V> {
    /// Allocates `len` empty slots in buckets of `bucket` slots
    pub(crate) fn new(len: usize, bucket: usize, seeds: [u32; 2]) -> Self {
        Self { slots: empty_slots(len), bucket, seeds }
    }

    /// Offsets of the two candidate buckets of `hash`
    fn buckets(&self, hash: u32) -> Option<[usize; 2]> {
        let count = self.slots.len().checked_div(self.bucket).filter(|&count| count > 0)?;
        let bucket = self.bucket;
        Some(self.seeds.map(|seed| reduce(u64::from(hash ^ seed), count).saturating_mul(bucket)))
    }

    /// Candidate indices in lockstep order: slot 0 of both buckets, then slot 1, and so on
    fn candidates(&self, hash: u32) -> impl Iterator<Item = usize> + use<V> {
        let bucket = self.bucket;
        self.buckets(hash).into_iter().flat_map(move |[first, second]| {
            (0..bucket).flat_map(move |j| [first.saturating_add(j), second.saturating_add(j)])
        })
    }

    /// First free candidate of `hash`; none once both buckets are full
    pub(crate) fn vacancy(&self, hash: u32) -> Option<usize> {
        self.candidates(hash).find(|&index| is_vacant(&self.slots, index))
    }

    /// Scans both buckets in lockstep, never past an empty slot
    pub(crate) fn find(&self, hash: u32, fingerprint: u8, key: &[u8]) -> Search<usize> {
        for index in self.candidates(hash) {
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

    // 8 buckets of 2 slots. 8657 lands in bucket 1 with seed 0 and in bucket 4 with seed 5.
    const HASH: u32 = 8657;

    fn table() -> TwoChoiceTable<u8> {
        TwoChoiceTable::new(16, 2, [0, 5])
    }

    fn insert(table: &mut TwoChoiceTable<u8>, hash: u32, key: u8) -> Option<usize> {
        let index = table.vacancy(hash)?;
        assert!(table.place(index, Slot::new(hash, &[key], key)));
        Some(index)
    }

    #[test]
    fn test_candidates_alternate_between_buckets() {
        let table = table();
        assert_eq!(table.buckets(HASH), Some([2, 8]));
        assert_eq!(table.candidates(HASH).collect::<Vec<_>>(), vec![2, 8, 3, 9]);
    }

    #[test]
    fn test_insert_fills_both_buckets_then_fails() {
        let mut table = table();
        let placed: Vec<Option<usize>> = (0..4).map(|key| insert(&mut table, HASH, key)).collect();
        assert_eq!(placed, vec![Some(2), Some(8), Some(3), Some(9)]);
        assert_eq!(insert(&mut table, HASH, 4), None);

        for key in 0..4 {
            assert!(matches!(table.find(HASH, top_hash(HASH), &[key]), Search::Found(_)));
        }
        assert_eq!(table.find(HASH, top_hash(HASH), &[4]), Search::Exhausted);
    }

    #[test]
    fn test_key_is_found_in_either_bucket() {
        let mut table = table();
        // Pre-fill the first slot of bucket 1 with a foreign key so ours lands in bucket 4.
        assert!(table.place(2, Slot::new(0, b"decoy", 0)));
        assert_eq!(insert(&mut table, HASH, 7), Some(8));
        assert_eq!(table.find(HASH, top_hash(HASH), &[7]), Search::Found(8));
        assert_eq!(table.slot(8).map(|slot| slot.value), Some(7));
    }

    #[test]
    fn test_lookup_stops_at_first_empty_slot() {
        let mut table = table();
        assert!(table.place(2, Slot::new(HASH, &[1], 1)));
        // Slot 8 is empty, so a key stored behind it cannot have been inserted along this path.
        assert!(table.place(3, Slot::new(HASH, &[2], 2)));
        assert_eq!(table.find(HASH, top_hash(HASH), &[2]), Search::Absent);
    }

    #[test]
    fn test_no_leakage_from_neighbouring_buckets() {
        let mut table = table();
        for index in [0, 1, 4, 5, 6, 7, 10, 11] {
            assert!(table.place(index, Slot::new(HASH, &[3], 3)));
        }
        assert_eq!(table.find(HASH, top_hash(HASH), &[3]), Search::Absent);
    }

    #[test]
    fn test_disabled_table_has_no_candidates() {
        let table = TwoChoiceTable::<u8>::new(0, 0, [1, 2]);
        assert_eq!(table.vacancy(HASH), None);
        assert_eq!(table.find(HASH, 0, b"k"), Search::Exhausted);
        let mut table = TwoChoiceTable::<u8>::new(4, 2, [1, 2]);
        assert!(table.vacancy(HASH).is_some());
        if let Some(index) = table.vacancy(HASH) {
            assert!(table.place(index, Slot::new(HASH, b"k", 1)));
            if let Some(slot) = table.slot_mut(index) {
                slot.value = 2;
            }
            assert_eq!(table.slot(index).map(|slot| slot.value), Some(2));
        }
    }
}
