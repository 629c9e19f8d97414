//! Slot storage shared by the bank chain and both overflow tables

use crate::hasher::top_hash;

/// A stored key-value pair together with the fingerprint of its key hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slot<V> {
    /// High byte of the key hash, compared before the key itself
    pub(crate) top_hash: u8,
    /// Owned copy of the key bytes
    pub(crate) key: Box<[u8]>,
    /// The stored value, replaced in place by `set`
    pub(crate) value: V,
}

impl<V> Slot<V> {
    /// Creates a slot for `key`, fingerprinted with `hash`
    pub(crate) fn new(hash: u32, key: &[u8], value: V) -> Self {
        Self { top_hash: top_hash(hash), key: key.into(), value }
    }

    /// Returns true if this slot holds `key`, checking the fingerprint first
    #[inline]
    pub(crate) fn holds(&self, fingerprint: u8, key: &[u8]) -> bool {
        self.top_hash == fingerprint && *self.key == *key
    }
}

/// Allocates `len` empty slots
pub(crate) fn empty_slots<V>(len: usize) -> Vec<Option<Slot<V>>> {
    let mut slots = Vec::with_capacity(len);
    slots.resize_with(len, || None);
    slots
}

/// What a single probe observed at a candidate index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    /// The slot is free
    Vacant,
    /// The slot holds the key being looked up
    Hit,
    /// The slot holds some other key
    Miss,
}

/// Classifies the slot at `index` for a lookup of `key`; out of range counts as a miss
#[inline]
pub(crate) fn probe<V>(
    slots: &[Option<Slot<V>>],
    index: usize,
    fingerprint: u8,
    key: &[u8],
) -> Probe {
    match slots.get(index) {
        Some(None) => Probe::Vacant,
        Some(Some(slot)) if slot.holds(fingerprint, key) => Probe::Hit,
        Some(Some(_)) | None => Probe::Miss,
    }
}

/// Outcome of a lookup within one probing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Search<L> {
    /// The key is stored at this location
    Found(L),
    /// An empty slot on the key's path: nothing past it was placed for this key
    Absent,
    /// The stage holds no match; later stages may
    Exhausted,
}

impl<L> Search<L> {
    /// Converts the location of a hit
    pub(crate) fn map<M>(self, f: impl FnOnce(L) -> M) -> Search<M> {
        match self {
            Self::Found(location) => Search::Found(f(location)),
            Self::Absent => Search::Absent,
            Self::Exhausted => Search::Exhausted,
        }
    }
}

/// Returns true if the slot at `index` exists and is free
#[inline]
pub(crate) fn is_vacant<V>(slots: &[Option<Slot<V>>], index: usize) -> bool {
    matches!(slots.get(index), Some(None))
}
