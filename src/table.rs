//! Table core shared by both engines: capacity accounting, hashing and the fallback order
//! from the bank chain to the overflow tables

use crate::{
    bank::{BankChain, BankSlot},
    config::Seeds,
    error::InsertError,
    hasher::{KeyHasher, top_hash},
    overflow::{Overflow, OverflowSlot},
    sizing::OverflowLayout,
    slot::{Search, Slot},
};

/// Placement policy of the bank chain
pub(crate) trait Prober {
    /// First free slot the policy offers to `hash`, if any
    fn vacancy<V>(&self, banks: &BankChain<V>, hash: u32) -> Option<BankSlot>;

    /// Replays the insert path of `hash` looking for `key`
    fn find<V>(
        &self,
        banks: &BankChain<V>,
        hash: u32,
        fingerprint: u8,
        key: &[u8],
    ) -> Search<BankSlot>;
}

/// Where an entry lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    /// In a bank of the chain
    Primary(BankSlot),
    /// In one of the overflow tables
    Overflow(OverflowSlot),
}

/// Bank chain plus overflow tables behind a single insert/lookup interface
#[derive(Debug)]
pub(crate) struct Table<P, V, H> {
    /// Bank placement policy
    prober: P,
    /// Primary region
    banks: BankChain<V>,
    /// Secondary region, used once the chain has no room for a key
    overflow: Overflow<V>,
    /// Key hash function
    hasher: H,
    /// Declared capacity
    capacity: usize,
    /// Successful inserts so far
    len: usize,
}

impl<P: Prober, V, H: KeyHasher> Table<P, V, H> {
    /// Allocates every bank and overflow slot up front
    pub(crate) fn new(
        prober: P,
        bank_sizes: &[usize],
        overflow: &OverflowLayout,
        hasher: H,
        capacity: usize,
        seeds: &mut Seeds,
    ) -> Self {
        Self {
            prober,
            banks: BankChain::new(bank_sizes, seeds),
            overflow: Overflow::new(overflow, seeds),
            hasher,
            capacity,
            len: 0,
        }
    }

    /// Number of stored entries
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Declared capacity
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true once `len` has reached the declared capacity
    pub(crate) const fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Looks `key` up along the path inserts take: bank chain, then overflow
    fn locate(&self, hash: u32, key: &[u8]) -> Option<Location> {
        let fingerprint = top_hash(hash);
        match self.prober.find(&self.banks, hash, fingerprint, key) {
            Search::Found(at) => Some(Location::Primary(at)),
            Search::Absent => None,
            Search::Exhausted => match self.overflow.find(hash, fingerprint, key) {
                Search::Found(at) => Some(Location::Overflow(at)),
                Search::Absent | Search::Exhausted => None,
            },
        }
    }

    /// First free slot for `hash` across every stage
    fn vacancy(&self, hash: u32) -> Option<Location> {
        if let Some(at) = self.prober.vacancy(&self.banks, hash) {
            return Some(Location::Primary(at));
        }
        tracing::trace!(hash, "bank chain exhausted, falling back to overflow");
        self.overflow.vacancy(hash).map(Location::Overflow)
    }

    /// The entry at `at`
    fn slot(&self, at: Location) -> Option<&Slot<V>> {
        match at {
            Location::Primary(at) => self.banks.slot(at),
            Location::Overflow(at) => self.overflow.slot(at),
        }
    }

    /// The entry at `at`, mutably
    fn slot_mut(&mut self, at: Location) -> Option<&mut Slot<V>> {
        match at {
            Location::Primary(at) => self.banks.slot_mut(at),
            Location::Overflow(at) => self.overflow.slot_mut(at),
        }
    }

    /// Places a new entry for an already hashed key
    fn insert_hashed(&mut self, hash: u32, key: &[u8], value: V) -> Result<(), InsertError> {
        let slot = Slot::new(hash, key, value);
        let placed = match self.vacancy(hash) {
            Some(Location::Primary(at)) => self.banks.place(at, slot),
            Some(Location::Overflow(at)) => self.overflow.place(at, slot),
            None => false,
        };
        if !placed {
            tracing::debug!(hash, len = self.len, capacity = self.capacity, "probe exhausted");
            return Err(InsertError::ProbeExhausted);
        }
        self.len = self.len.saturating_add(1);
        Ok(())
    }

    /// Adds an entry without checking whether `key` is already present
    pub(crate) fn insert(&mut self, key: &[u8], value: V) -> Result<(), InsertError> {
        if self.is_full() {
            return Err(InsertError::CapacityExhausted { capacity: self.capacity });
        }
        let hash = self.hasher.hash_key(key);
        self.insert_hashed(hash, key, value)
    }

    /// Replaces the value of `key` in place, or inserts it; true if the key was present
    pub(crate) fn set(&mut self, key: &[u8], value: V) -> Result<bool, InsertError> {
        let hash = self.hasher.hash_key(key);
        if let Some(slot) = self.locate(hash, key).and_then(|at| self.slot_mut(at)) {
            slot.value = value;
            return Ok(true);
        }
        if self.is_full() {
            return Err(InsertError::CapacityExhausted { capacity: self.capacity });
        }
        self.insert_hashed(hash, key, value).map(|()| false)
    }

    /// The value stored for `key`
    pub(crate) fn get(&self, key: &[u8]) -> Option<&V> {
        let hash = self.hasher.hash_key(key);
        let at = self.locate(hash, key)?;
        self.slot(at).map(|slot| &slot.value)
    }

    /// The value stored for `key`, mutably
    pub(crate) fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let hash = self.hasher.hash_key(key);
        let at = self.locate(hash, key)?;
        self.slot_mut(at).map(|slot| &mut slot.value)
    }
}
