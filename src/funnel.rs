//! Funnel hashing: every bank is split into buckets of β slots and a key may only use one
//! bucket per bank, chosen by its hash. Banks are tried head to tail, then the overflow tables.

use crate::{
    bank::{BankChain, BankSlot},
    config::{ConfigError, FunnelConfig, Seeds},
    error::InsertError,
    hasher::{KeyHasher, SeededHasher},
    probe::reduce,
    sizing::FunnelLayout,
    slot::{Probe, Search, is_vacant, probe},
    table::{Prober, Table},
};

/// Bucket-hop policy of funnel hashing
#[derive(Debug)]
pub(crate) struct FunnelProber {
    /// Slots per bucket, β
    bucket: usize,
}

impl FunnelProber {
    /// Slot indices of the bucket `hash` selects in a bank of `len` slots.
    ///
    /// The bucket is `hash mod (len / β)` and is walked circularly from `hash mod β`.
    fn bucket_path(&self, len: usize, hash: u32) -> impl Iterator<Item = usize> + use<> {
        let buckets = len.checked_div(self.bucket).unwrap_or_default();
        let width = if buckets == 0 { 0 } else { self.bucket };
        let (offset, start) = if width == 0 {
            (0, 0)
        } else {
            (reduce(u64::from(hash), buckets).saturating_mul(width), reduce(u64::from(hash), width))
        };
        (start..width).chain(0..start).map(move |j| offset.saturating_add(j))
    }
}

impl Prober for FunnelProber {
    fn vacancy<V>(&self, banks: &BankChain<V>, hash: u32) -> Option<BankSlot> {
        (0..banks.bank_count())
            .filter(|&bank| banks.bank(bank).is_some_and(|b| !b.is_full()))
            .find_map(|bank| {
                let slots = banks.bank_slots(bank);
                self.bucket_path(slots.len(), hash)
                    .find(|&index| is_vacant(slots, index))
                    .map(|index| BankSlot { bank, index })
            })
    }

    fn find<V>(
        &self,
        banks: &BankChain<V>,
        hash: u32,
        fingerprint: u8,
        key: &[u8],
    ) -> Search<BankSlot> {
        for bank in 0..banks.bank_count() {
            let slots = banks.bank_slots(bank);
            for index in self.bucket_path(slots.len(), hash) {
                match probe(slots, index, fingerprint, key) {
                    Probe::Hit => return Search::Found(BankSlot { bank, index }),
                    // The insert would have taken this slot, in this bank or an earlier one.
                    Probe::Vacant => return Search::Absent,
                    Probe::Miss => {}
                }
            }
        }
        Search::Exhausted
    }
}

/// A fixed-capacity hash table using funnel hashing.
///
/// Keys are byte strings copied into the table; values are stored as they are. Entries are
/// never moved once placed, and there is no removal. The table is not thread-safe: callers
/// sharing it between threads must serialize every operation themselves.
///
/// ```
/// use bankhash::FunnelTable;
///
/// let mut table = FunnelTable::new(100, 0.1, 0.75)?;
/// table.insert("apple", 1)?;
/// assert_eq!(table.get("apple"), Some(&1));
/// assert!(table.set("apple", 2)?);
/// assert_eq!(table.get("apple"), Some(&2));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct FunnelTable<V, H = SeededHasher> {
    /// Banks, overflow and bookkeeping
    table: Table<FunnelProber, V, H>,
    /// Sizes the table was built with
    layout: FunnelLayout,
}

impl<V> FunnelTable<V> {
    /// Creates a table for `capacity` entries keeping a `delta` fraction of slots free, with
    /// banks shrinking by `bank_shrink`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a parameter lies outside its domain.
    pub fn new(capacity: usize, delta: f64, bank_shrink: f64) -> Result<Self, ConfigError> {
        let config = FunnelConfig::new(capacity).with_delta(delta).with_bank_shrink(bank_shrink);
        Self::with_config(config)
    }

    /// Creates a table for `capacity` entries with the default ratios
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_config(FunnelConfig::new(capacity))
    }

    /// Creates a table from a full configuration, hashing keys with a [`SeededHasher`]
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a parameter lies outside its domain.
    pub fn with_config(config: FunnelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut seeds = Seeds::new(config.seed);
        let hasher = SeededHasher::new(seeds.next_u64());
        Ok(Self::build(&config, hasher, &mut seeds))
    }
}

impl<V, H: KeyHasher> FunnelTable<V, H> {
    /// Creates a table from a full configuration with a custom key hasher
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a parameter lies outside its domain.
    pub fn with_config_and_hasher(
        config: FunnelConfig,
        hasher: H,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(&config, hasher, &mut Seeds::new(config.seed)))
    }

    /// Allocates the table for a validated configuration
    fn build(config: &FunnelConfig, hasher: H, seeds: &mut Seeds) -> Self {
        let layout = FunnelLayout::compute(config);
        tracing::debug!(
            capacity = config.capacity,
            banks = layout.bank_sizes.len(),
            bucket = layout.bucket_size,
            primary_slots = layout.primary_slots(),
            uniform_slots = layout.overflow.uniform_slots,
            two_choice_slots = layout.overflow.two_choice_slots,
            "funnel table allocated"
        );
        let prober = FunnelProber { bucket: layout.bucket_size };
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
    pub const fn layout(&self) -> &FunnelLayout {
        &self.layout
    }
}
