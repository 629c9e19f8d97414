//! The two overflow stages that follow the bank chain: uniform probing, then two-choice buckets

mod two_choice;
mod uniform;

use crate::{
    config::Seeds,
    sizing::OverflowLayout,
    slot::{Search, Slot},
};
use two_choice::TwoChoiceTable;
use uniform::UniformTable;

/// Position of a slot in one of the overflow tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OverflowSlot {
    /// Index into the uniform-probing table
    Uniform(usize),
    /// Index into the two-choice table
    TwoChoice(usize),
}

/// Both overflow tables of one hash table, tried in order
#[derive(Debug)]
pub(crate) struct Overflow<V> {
    /// First stage
    uniform: UniformTable<V>,
    /// Second stage; has no slots when the layout disables it
    two_choice: TwoChoiceTable<V>,
}

impl<V> Overflow<V> {
    /// Allocates both tables as described by `layout`, drawing their seeds from `seeds`
    pub(crate) fn new(layout: &OverflowLayout, seeds: &mut Seeds) -> Self {
        let uniform = UniformTable::new(
            layout.uniform_slots,
            layout.uniform_probes,
            layout.uniform_exhaustive,
            seeds.next_u32(),
        );
        let two_choice = TwoChoiceTable::new(
            layout.two_choice_slots,
            layout.two_choice_bucket,
            [seeds.next_u32(), seeds.next_u32()],
        );
        Self { uniform, two_choice }
    }

    /// First free slot for `hash`, uniform table first
    pub(crate) fn vacancy(&self, hash: u32) -> Option<OverflowSlot> {
        if let Some(index) = self.uniform.vacancy(hash) {
            return Some(OverflowSlot::Uniform(index));
        }
        tracing::trace!(hash, "overflow-uniform exhausted, falling back to two-choice");
        self.two_choice.vacancy(hash).map(OverflowSlot::TwoChoice)
    }

    /// Looks `key` up in the same order `vacancy` hands out slots
    pub(crate) fn find(&self, hash: u32, fingerprint: u8, key: &[u8]) -> Search<OverflowSlot> {
        match self.uniform.find(hash, fingerprint, key) {
            Search::Exhausted => {
                self.two_choice.find(hash, fingerprint, key).map(OverflowSlot::TwoChoice)
            }
            other => other.map(OverflowSlot::Uniform),
        }
    }

    /// Stores `slot` at the free position `at`
    pub(crate) fn place(&mut self, at: OverflowSlot, slot: Slot<V>) -> bool {
        match at {
            OverflowSlot::Uniform(index) => self.uniform.place(index, slot),
            OverflowSlot::TwoChoice(index) => self.two_choice.place(index, slot),
        }
    }

    /// The occupied slot at `at`
    pub(crate) fn slot(&self, at: OverflowSlot) -> Option<&Slot<V>> {
        match at {
            OverflowSlot::Uniform(index) => self.uniform.slot(index),
            OverflowSlot::TwoChoice(index) => self.two_choice.slot(index),
        }
    }

    /// The occupied slot at `at`, mutably
    pub(crate) fn slot_mut(&mut self, at: OverflowSlot) -> Option<&mut Slot<V>> {
        match at {
            OverflowSlot::Uniform(index) => self.uniform.slot_mut(index),
            OverflowSlot::TwoChoice(index) => self.two_choice.slot_mut(index),
        }
    }
}
