//! Bank chain: every bank of a table as an offset/length view into one flat slot arena

use crate::{
    config::Seeds,
    slot::{Slot, empty_slots},
};

/// Descriptor of one bank inside the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bank {
    /// Index of the first slot of this bank in the arena
    offset: usize,
    /// Number of slots of this bank
    len: usize,
    /// Occupied slots
    inserts: usize,
    /// Fixed seed of the bank's probe sequences
    seed: u32,
}

impl Bank {
    /// Number of slots
    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Fixed probe seed
    #[inline]
    pub(crate) const fn seed(&self) -> u32 {
        self.seed
    }

    /// Fraction of free slots, 0..=1; a bank without slots counts as entirely free
    #[inline]
    #[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
    pub(crate) fn free_fraction(&self) -> f64 {
        if self.len == 0 {
            1.0
        } else {
            self.len.saturating_sub(self.inserts) as f64 / self.len as f64
        }
    }

    /// Returns true when every slot is taken
    #[inline]
    pub(crate) const fn is_full(&self) -> bool {
        self.inserts >= self.len
    }
}

/// Position of a slot in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BankSlot {
    /// Bank index, 0 being the head
    pub(crate) bank: usize,
    /// Slot index within the bank
    pub(crate) index: usize,
}

/// The primary region of a table: banks laid out head to tail in one allocation
#[derive(Debug)]
pub(crate) struct BankChain<V> {
    /// Bank descriptors, head first
    banks: Vec<Bank>,
    /// Slots of every bank, back to back
    slots: Vec<Option<Slot<V>>>,
}

impl<V> BankChain<V> {
    /// Allocates the banks described by `sizes`, drawing one probe seed per bank
    pub(crate) fn new(sizes: &[usize], seeds: &mut Seeds) -> Self {
        let mut offset = 0usize;
        let banks = sizes
            .iter()
            .map(|&len| {
                let bank = Bank { offset, len, inserts: 0, seed: seeds.next_u32() };
                offset = offset.saturating_add(len);
                bank
            })
            .collect();

        Self { banks, slots: empty_slots(offset) }
    }

    /// Number of banks
    #[inline]
    pub(crate) fn bank_count(&self) -> usize {
        self.banks.len()
    }

    /// Descriptor of bank `bank`
    #[inline]
    pub(crate) fn bank(&self, bank: usize) -> Option<&Bank> {
        self.banks.get(bank)
    }

    /// Slots of bank `bank`; empty for an unknown bank
    pub(crate) fn bank_slots(&self, bank: usize) -> &[Option<Slot<V>>] {
        self.banks
            .get(bank)
            .and_then(|b| self.slots.get(b.offset..b.offset.saturating_add(b.len)))
            .unwrap_or_default()
    }

    /// Arena index of `at`, if it lies inside its bank
    fn arena_index(&self, at: BankSlot) -> Option<usize> {
        let bank = self.banks.get(at.bank)?;
        (at.index < bank.len).then(|| bank.offset.saturating_add(at.index))
    }

    /// The occupied slot at `at`
    pub(crate) fn slot(&self, at: BankSlot) -> Option<&Slot<V>> {
        self.slots.get(self.arena_index(at)?)?.as_ref()
    }

    /// The occupied slot at `at`, mutably
    pub(crate) fn slot_mut(&mut self, at: BankSlot) -> Option<&mut Slot<V>> {
        let index = self.arena_index(at)?;
        self.slots.get_mut(index)?.as_mut()
    }

    /// Stores `slot` at the free position `at` and counts it against its bank.
    ///
    /// Returns false, leaving the chain untouched, if `at` is out of range or already taken.
    pub(crate) fn place(&mut self, at: BankSlot, slot: Slot<V>) -> bool {
        let Some(index) = self.arena_index(at) else {
            return false;
        };
        match (self.slots.get_mut(index), self.banks.get_mut(at.bank)) {
            (Some(entry @ None), Some(bank)) => {
                *entry = Some(slot);
                bank.inserts = bank.inserts.saturating_add(1);
                true
            }
            _ => false,
        }
    }
}
