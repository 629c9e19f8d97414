//! Elastic hashing: banks are used in consecutive pairs, and how hard each bank of a pair is
//! probed depends on how full the pair currently is.

use crate::{
    bank::{Bank, BankChain, BankSlot},
    config::{ConfigError, ElasticConfig, Seeds},
    error::InsertError,
    hasher::{KeyHasher, SeededHasher},
    probe::{ProbeSequence, reduce},
    sizing::ElasticLayout,
    slot::{Probe, Search, Slot, is_vacant, probe},
    table::{Prober, Table},
};

/// Which banks an insert may use, and how many candidates it may try in each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    /// Probe one bank for as many candidates as it has slots
    Single(usize),
    /// Probe `first` for `limited` candidates, then `second` fully
    Pair {
        /// Bank `A_i`
        first: usize,
        /// Candidates tried in `first`
        limited: usize,
        /// Bank `A_i+1`
        second: usize,
    },
}

/// Fullness-adaptive dual-bank policy of elastic hashing
#[derive(Debug)]
pub(crate) struct ElasticProber {
    /// Free fraction at or below which the first bank of a pair is skipped, `δ/2`
    first_floor: f64,
    /// Free fraction at or below which the second bank of a pair is skipped
    second_floor: f64,
    /// Scale `c` of the limited probe count
    fill_factor: f64,
    /// `log2(1/δ)`, the cap of the limited probe count before scaling
    log_inverse_delta: f64,
}

impl ElasticProber {
    /// Derives the thresholds from a validated configuration
    #[allow(clippy::arithmetic_side_effects)]
    fn new(config: &ElasticConfig) -> Self {
        Self {
            first_floor: config.delta / 2.0,
            second_floor: 1.0 - config.bank2_occupation,
            fill_factor: config.fill_factor,
            log_inverse_delta: (1.0 / config.delta).log2(),
        }
    }

    /// Candidates tried in the first bank of a pair: `c·min(log2(1/ε1)², log2(1/δ))`,
    /// at most the bank size
    #[allow(
        clippy::arithmetic_side_effects,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn limited_probes(&self, bank: &Bank) -> usize {
        let log_free = (1.0 / bank.free_fraction()).log2();
        let scaled = self.fill_factor * (log_free * log_free).min(self.log_inverse_delta);
        (scaled.floor().max(0.0) as usize).min(bank.len())
    }

    /// Index of the second bank of the pair `hash` belongs to; 0 means bank 0 alone
    fn pair<V>(banks: &BankChain<V>, hash: u32) -> Option<usize> {
        let count = banks.bank_count();
        (count > 0).then(|| reduce(u64::from(hash), count))
    }

    /// Applies the decision table to the current fullness of the pair of `hash`
    fn plan<V>(&self, banks: &BankChain<V>, hash: u32) -> Option<Plan> {
        let second = Self::pair(banks, hash)?;
        let free2 = banks.bank(second).map_or(1.0, Bank::free_fraction);
        let Some(first) = second.checked_sub(1) else {
            return (free2 > self.second_floor).then_some(Plan::Single(0));
        };
        let first_bank = banks.bank(first)?;
        let free1 = first_bank.free_fraction();

        let first_spent = free1 <= self.first_floor;
        let second_spent = free2 <= self.second_floor;
        match (first_spent, second_spent) {
            (true, true) => None,
            (true, false) => Some(Plan::Single(second)),
            (false, true) => Some(Plan::Single(first)),
            (false, false) => {
                Some(Plan::Pair { first, limited: self.limited_probes(first_bank), second })
            }
        }
    }
}

/// Full-length probe sequence of `bank` for `hash`
fn sequence<V>(banks: &BankChain<V>, bank: usize, hash: u32) -> ProbeSequence {
    let (seed, len) = banks.bank(bank).map_or((0, 0), |b| (b.seed(), b.len()));
    ProbeSequence::new(hash ^ seed, hash, len, len, false)
}

/// First free candidate of `bank` among `candidates`
fn first_vacant<V>(
    banks: &BankChain<V>,
    bank: usize,
    mut candidates: impl Iterator<Item = usize>,
) -> Option<BankSlot> {
    let slots = banks.bank_slots(bank);
    candidates.find(|&index| is_vacant(slots, index)).map(|index| BankSlot { bank, index })
}

/// Walks `candidates` of `bank` until `key`, an empty slot, or the end of the candidates
fn scan<V>(
    slots: &[Option<Slot<V>>],
    candidates: impl Iterator<Item = usize>,
    fingerprint: u8,
    key: &[u8],
) -> Search<usize> {
    for index in candidates {
        match probe(slots, index, fingerprint, key) {
            Probe::Hit => return Search::Found(index),
            Probe::Vacant => return Search::Absent,
            Probe::Miss => {}
        }
    }
    Search::Exhausted
}

impl Prober for ElasticProber {
    fn vacancy<V>(&self, banks: &BankChain<V>, hash: u32) -> Option<BankSlot> {
        match self.plan(banks, hash)? {
            Plan::Single(bank) => first_vacant(banks, bank, sequence(banks, bank, hash)),
            Plan::Pair { first, limited, second } => {
                let limited_path = sequence(banks, first, hash).take(limited);
                first_vacant(banks, first, limited_path).or_else(|| {
                    tracing::trace!(hash, first, limited, "limited probing failed");
                    first_vacant(banks, second, sequence(banks, second, hash))
                })
            }
        }
    }

    fn find<V>(
        &self,
        banks: &BankChain<V>,
        hash: u32,
        fingerprint: u8,
        key: &[u8],
    ) -> Search<BankSlot> {
        let Some(second) = Self::pair(banks, hash) else {
            return Search::Exhausted;
        };
        let found = |bank: usize, search: Search<usize>| match search {
            Search::Found(index) => Some(BankSlot { bank, index }),
            Search::Absent | Search::Exhausted => None,
        };

        let Some(first) = second.checked_sub(1) else {
            let search = scan(banks.bank_slots(0), sequence(banks, 0, hash), fingerprint, key);
            return found(0, search).map_or(Search::Exhausted, Search::Found);
        };
        let limited = banks.bank(first).map_or(0, |bank| self.limited_probes(bank));
        let first_slots = banks.bank_slots(first);
        let mut first_path = sequence(banks, first, hash);

        let prefix = scan(first_slots, first_path.by_ref().take(limited), fingerprint, key);
        if let Some(at) = found(first, prefix) {
            return Search::Found(at);
        }
        let second_path = sequence(banks, second, hash);
        let search = scan(banks.bank_slots(second), second_path, fingerprint, key);
        if let Some(at) = found(second, search) {
            return Search::Found(at);
        }
        // An empty slot in the prefix means no insert went past it into this bank.
        if prefix == Search::Exhausted {
            let rest = scan(first_slots, first_path, fingerprint, key);
            if let Some(at) = found(first, rest) {
                return Search::Found(at);
            }
        }
        // Empty slots here do not rule out overflow: a spent pair sends inserts there early.
        Search::Exhausted
    }
}

/// A fixed-capacity hash table using elastic hashing.
///
/// Keys are byte strings copied into the table; values are stored as they are. Entries are
/// never moved once placed, and there is no removal. The table is not thread-safe: callers
/// sharing it between threads must serialize every operation themselves.
///
/// Elastic tables rely on spare room: inserts may fail with
/// [`InsertError::ProbeExhausted`] well before `capacity` is reached when the table runs
/// close to full.
///
/// ```
/// use bankhash::ElasticTable;
///
/// let mut table = ElasticTable::new(1000, 0.1, 0.75, 200.0)?;
/// for i in 0..100 {
///     table.insert(format!("key{i}"), i)?;
/// }
/// assert_eq!(table.get("key42"), Some(&42));
/// assert_eq!(table.len(), 100);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ElasticTable<V, H = SeededHasher> {
    /// Banks, overflow and bookkeeping
    table: Table<ElasticProber, V, H>,
    /// Sizes the table was built with
    layout: ElasticLayout,
}

impl<V> ElasticTable<V> {
    /// Creates a table for `capacity` entries keeping a `delta` fraction of slots free, with
    /// banks shrinking by `bank_shrink` and the limited probe count scaled by `fill_factor`.
    ///
    /// The second-bank occupation keeps its default of
    /// [`DEFAULT_BANK2_OCCUPATION`](crate::DEFAULT_BANK2_OCCUPATION); set it through
    /// [`ElasticConfig::with_bank2_occupation`] and [`with_config`](Self::with_config).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a parameter lies outside its domain.
    pub fn new(
        capacity: usize,
        delta: f64,
        bank_shrink: f64,
        fill_factor: f64,
    ) -> Result<Self, ConfigError> {
        let config = ElasticConfig::new(capacity)
            .with_delta(delta)
            .with_bank_shrink(bank_shrink)
            .with_fill_factor(fill_factor);
        Self::with_config(config)
    }

    /// Creates a table for `capacity` entries with the default ratios
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_config(ElasticConfig::new(capacity))
    }

    /// Creates a table from a full configuration, hashing keys with a [`SeededHasher`]
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a parameter lies outside its domain.
    pub fn with_config(config: ElasticConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut seeds = Seeds::new(config.seed);
        let hasher = SeededHasher::new(seeds.next_u64());
        Ok(Self::build(&config, hasher, &mut seeds))
    }
}

impl<V, H: KeyHasher> ElasticTable<V, H> {
    /// Creates a table from a full configuration with a custom key hasher
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a parameter lies outside its domain.
    pub fn with_config_and_hasher(
        config: ElasticConfig,
        hasher: H,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(&config, hasher, &mut Seeds::new(config.seed)))
    }

    /// Allocates the table for a validated configuration
    fn build(config: &ElasticConfig, hasher: H, seeds: &mut Seeds) -> Self {
        let layout = ElasticLayout::compute(config);
        tracing::debug!(
            capacity = config.capacity,
            banks = layout.bank_sizes.len(),
            primary_slots = layout.primary_slots(),
            uniform_slots = layout.overflow.uniform_slots,
            two_choice_slots = layout.overflow.two_choice_slots,
            "elastic table allocated"
        );
        let prober = ElasticProber::new(config);
        let capacity = config.capacity;
        let table =
            Table::new(prober, &layout.bank_sizes, &layout.overflow, hasher, capacity, seeds);
        Self { table, layout }
    }

    /// Adds an entry for `key`.
    ///
    /// The key is not looked up first: inserting it twice stores it twice, and lookups then
    /// return whichever copy their probe path reaches first. Use [`set`](Self::set) to update.
    ///
    /// # Errors
    ///
    /// [`InsertError::CapacityExhausted`] when the table holds `capacity` entries already,
    /// [`InsertError::ProbeExhausted`] when no stage has a free slot for this key.
    pub fn insert(&mut self, key: impl AsRef<[u8]>, value: V) -> Result<(), InsertError> {
        self.table.insert(key.as_ref(), value)
    }

    /// Replaces the value of `key` in place, or inserts the key if it is absent.
    ///
    /// Returns `true` if the key was already present.
    ///
    /// # Errors
    ///
    /// Fails like [`insert`](Self::insert) when the key is absent and cannot be added.
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: V) -> Result<bool, InsertError> {
        self.table.set(key.as_ref(), value)
    }

    /// Returns a reference to the value stored for `key`
    #[must_use]
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        self.table.get(key.as_ref())
    }

    /// Returns a mutable reference to the value stored for `key`
    pub fn get_mut(&mut self, key: impl AsRef<[u8]>) -> Option<&mut V> {
        self.table.get_mut(key.as_ref())
    }

    /// Returns true if `key` is stored
    #[must_use]
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries inserted
    #[must_use]
    pub const fn len(&self) -> usize {
        self.table.len()
    }

    /// Declared capacity; inserts beyond it are rejected
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns true if nothing was inserted yet
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the table holds `capacity` entries
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.table.is_full()
    }

    /// Bank and overflow sizes of this table
    #[must_use]
    pub const fn layout(&self) -> &ElasticLayout {
        &self.layout
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hasher::top_hash;
    use proptest::{collection::hash_set, prelude::*};

    /// Two banks of 8 slots; odd hashes select the pair (0, 1), even hashes bank 0 alone
    fn banks() -> BankChain<u32> {
        BankChain::new(&[8, 8], &mut Seeds::new(Some(9)))
    }

    fn fill(banks: &mut BankChain<u32>, bank: usize, slots: std::ops::Range<usize>) {
        for index in slots {
            assert!(banks.place(BankSlot { bank, index }, Slot::new(0, b"filler", 0)));
        }
    }

    fn prober(fill_factor: f64) -> ElasticProber {
        ElasticProber::new(&ElasticConfig::new(100).with_fill_factor(fill_factor))
    }

    #[test]
    fn test_decision_table() {
        let prober = prober(200.0);
        let mut banks = banks();
        // Empty first bank: log2(1/1) = 0, so no limited probes at all.
        assert_eq!(prober.plan(&banks, 1), Some(Plan::Pair { first: 0, limited: 0, second: 1 }));

        fill(&mut banks, 0, 0..4);
        assert_eq!(prober.plan(&banks, 1), Some(Plan::Pair { first: 0, limited: 8, second: 1 }));

        fill(&mut banks, 1, 0..6);
        assert_eq!(prober.plan(&banks, 1), Some(Plan::Single(0)));

        fill(&mut banks, 0, 4..8);
        assert_eq!(prober.plan(&banks, 1), None);
    }

    #[test]
    fn test_spent_first_bank_sends_inserts_to_second() {
        let prober = prober(200.0);
        let mut banks = banks();
        fill(&mut banks, 0, 0..8);
        assert_eq!(prober.plan(&banks, 3), Some(Plan::Single(1)));
        assert!(prober.vacancy(&banks, 3).is_some_and(|at| at.bank == 1));
    }

    #[test]
    fn test_bank_zero_is_used_alone_up_to_occupation() {
        let prober = prober(200.0);
        let mut banks = banks();
        assert_eq!(prober.plan(&banks, 2), Some(Plan::Single(0)));
        fill(&mut banks, 0, 0..5);
        assert_eq!(prober.plan(&banks, 2), Some(Plan::Single(0)));
        fill(&mut banks, 0, 5..6);
        assert_eq!(prober.plan(&banks, 2), None);
        assert_eq!(prober.vacancy(&banks, 2), None);
    }

    #[test]
    fn test_limited_probe_count() {
        let mut banks = banks();
        fill(&mut banks, 0, 0..4);
        let half_full = banks.bank(0).copied().unwrap();
        // c · min(log2(2)², log2(10)) = c · 1
        assert_eq!(prober(1.0).limited_probes(&half_full), 1);
        assert_eq!(prober(3.0).limited_probes(&half_full), 3);
        assert_eq!(prober(200.0).limited_probes(&half_full), 8);
        assert_eq!(prober(0.0).limited_probes(&half_full), 0);

        fill(&mut banks, 0, 4..8);
        let full = banks.bank(0).copied().unwrap();
        // log2(1/0) is infinite, so the log2(1/δ) cap applies: floor(2 · 3.32).
        assert_eq!(prober(2.0).limited_probes(&full), 6);
    }

    #[test]
    fn test_key_in_second_bank_survives_first_bank_filling_up() {
        let prober = prober(200.0);
        let mut banks = banks();
        let hash = 0x4100_0001;
        let at = prober.vacancy(&banks, hash).unwrap();
        assert_eq!(at.bank, 1);
        assert!(banks.place(at, Slot::new(hash, b"key", 7)));

        // The first bank now gets a long limited prefix, partly empty.
        fill(&mut banks, 0, 0..3);
        assert_eq!(prober.find(&banks, hash, top_hash(hash), b"key"), Search::Found(at));
        assert_eq!(prober.find(&banks, hash, top_hash(hash), b"other"), Search::Exhausted);
    }

    #[test]
    fn test_key_in_first_bank_remainder_is_found() {
        let prober = prober(200.0);
        let mut banks = banks();
        fill(&mut banks, 1, 0..6);
        let hash = 0x4100_0003;
        assert_eq!(prober.plan(&banks, hash), Some(Plan::Single(0)));
        let at = prober.vacancy(&banks, hash).unwrap();
        assert!(banks.place(at, Slot::new(hash, b"key", 7)));
        assert_eq!(prober.find(&banks, hash, top_hash(hash), b"key"), Search::Found(at));
    }

    #[test]
    fn test_hundred_slot_scenario() {
        let config = ElasticConfig::new(100).with_delta(0.1).with_fill_factor(200.0).with_seed(7);
        let mut table = ElasticTable::with_config(config).unwrap();
        for i in 0..50 {
            assert_eq!(table.insert(format!("key{i}"), format!("value{i}")), Ok(()));
        }
        assert_eq!(table.get("key0").map(String::as_str), Some("value0"));
        assert_eq!(table.len(), 50);
        assert_eq!(table.capacity(), 100);
        assert_eq!(table.get("nonexistent"), None);
        for i in 0..50 {
            assert!(table.contains_key(format!("key{i}")));
        }
    }

    #[test]
    fn test_with_capacity_uses_default_ratios() {
        let mut table = ElasticTable::with_capacity(1000).unwrap();
        assert_eq!(table.capacity(), 1000);
        assert_eq!(table.layout(), &ElasticLayout::compute(&ElasticConfig::new(1000)));
        assert_eq!(table.insert("key", 1), Ok(()));
        assert_eq!(table.get("key"), Some(&1));
        assert_eq!(ElasticTable::<u8>::with_capacity(0).err(), Some(ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_bank2_occupation_caps_the_head_bank() {
        fn same_hash(_: &[u8]) -> u32 {
            0
        }
        // Every key selects bank 0 alone, which takes keys only while more than 90% of it is
        // free: 3 of its 30 slots. The 6 exhaustive overflow slots take the rest.
        let config = ElasticConfig::new(100).with_bank2_occupation(0.1).with_seed(3);
        let mut table = ElasticTable::with_config_and_hasher(config, same_hash).unwrap();
        assert_eq!(table.layout().bank_sizes.first(), Some(&30));
        assert_eq!(table.layout().overflow.uniform_slots, 6);
        assert!(table.layout().overflow.uniform_exhaustive);

        let outcomes: Vec<_> = (0..10_u32).map(|i| table.insert(i.to_le_bytes(), i)).collect();
        assert!(outcomes.iter().take(9).all(Result::is_ok));
        assert_eq!(outcomes.last(), Some(&Err(InsertError::ProbeExhausted)));
        assert_eq!(table.len(), 9);
        for i in 0..9_u32 {
            assert_eq!(table.get(i.to_le_bytes()), Some(&i));
        }
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert_eq!(ElasticTable::<u8>::new(0, 0.1, 0.75, 1.0).err(), Some(ConfigError::ZeroCapacity));
        assert!(ElasticTable::<u8>::new(10, 0.0, 0.75, 1.0).is_err());
        assert!(ElasticTable::<u8>::new(10, 0.1, 1.0, 1.0).is_err());
        assert!(ElasticTable::<u8>::new(10, 0.1, 0.75, -1.0).is_err());
        let config = ElasticConfig::new(10).with_bank2_occupation(0.0);
        assert!(ElasticTable::<u8>::with_config(config).is_err());
    }

    #[test]
    fn test_capacity_boundary() {
        let config = ElasticConfig::new(10).with_delta(0.5).with_seed(4);
        let mut table = ElasticTable::with_config(config).unwrap();
        let mut stored = Vec::new();
        for i in 0..10_000_u32 {
            if table.is_full() {
                break;
            }
            match table.insert(i.to_le_bytes(), i) {
                Ok(()) => stored.push(i),
                Err(err) => assert_eq!(err, InsertError::ProbeExhausted),
            }
        }
        assert!(table.is_full());
        assert_eq!(table.insert(b"late", 0), Err(InsertError::CapacityExhausted { capacity: 10 }));
        assert_eq!(table.len(), 10);
        for i in stored {
            assert_eq!(table.get(i.to_le_bytes()), Some(&i));
        }
    }

    #[test]
    fn test_set_and_get_mut() {
        let mut table = ElasticTable::new(50, 0.1, 0.75, 200.0).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.set("k", 1), Ok(false));
        assert_eq!(table.set("k", 2), Ok(true));
        if let Some(value) = table.get_mut("k") {
            *value += 40;
        }
        assert_eq!(table.get("k"), Some(&42));
        assert_eq!(table.len(), 1);
        assert!(!table.is_full());
    }

    #[test]
    fn test_layout_matches_allocation() {
        let table = ElasticTable::<u8>::new(1000, 0.1, 0.75, 200.0).unwrap();
        let layout = table.layout();
        // ⌈log2(1038)⌉ banks over the primary slots.
        assert_eq!(layout.bank_sizes.len(), 11);
        assert_eq!(layout.primary_slots(), 1038);
        assert_eq!(layout.total_slots(), 1100);
    }

    proptest! {
        #[test]
        fn prop_inserted_keys_round_trip(
            keys in hash_set(proptest::collection::vec(any::<u8>(), 1..16), 1..300),
            seed in any::<u64>(),
        ) {
            let config = ElasticConfig::new(keys.len() * 2).with_seed(seed);
            let mut table = ElasticTable::with_config(config)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            let mut stored = Vec::new();
            for (i, key) in keys.iter().enumerate() {
                match table.insert(key, i) {
                    Ok(()) => stored.push((key, i)),
                    Err(err) => prop_assert_eq!(err, InsertError::ProbeExhausted),
                }
            }
            prop_assert_eq!(table.len(), stored.len());
            for (key, i) in stored {
                prop_assert_eq!(table.get(key), Some(&i));
            }
        }
    }
}
