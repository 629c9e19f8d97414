//! Sizing calculator: derives every bank and overflow size from the construction parameters
//!
//! All functions here are pure. They run once per table, before anything is allocated.

use crate::config::{ElasticConfig, FunnelConfig, MIN_FUNNEL_SHRINK};

/// Funnel banks always number at least this many on top of `4·log2(1/δ)`
pub const MIN_FUNNEL_BANKS: usize = 10;
/// Fewest banks an elastic table is split into, whatever its size
pub const MIN_ELASTIC_BANKS: usize = 2;
/// Two-choice hashing needs at least this many buckets to be worth enabling
pub const MIN_TWO_CHOICE_BUCKETS: usize = 2;

/// `log2(1/δ)`
#[inline]
#[allow(clippy::arithmetic_side_effects)]
fn log2_inverse(delta: f64) -> f64 {
    (1.0 / delta).log2()
}

/// Converts a non-negative float into a slot count, rounding up
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ceil_count(value: f64) -> usize {
    value.ceil().max(0.0) as usize
}

/// Converts a non-negative float into a slot count, rounding down
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_count(value: f64) -> usize {
    value.floor().max(0.0) as usize
}

/// Slots actually allocated for a declared capacity: `n + ⌊δn⌋`
#[allow(clippy::cast_precision_loss)]
fn total_slots(capacity: usize, delta: f64) -> usize {
    capacity.saturating_add(floor_count(capacity as f64 * delta))
}

/// Overflow capacity: midpoint between `⌊δn·shrink⌋` and `⌈δn/2⌉`
#[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
fn overflow_target(capacity: usize, delta: f64, shrink: f64) -> usize {
    let reserved = delta * capacity as f64;
    floor_count(reserved * shrink).saturating_add(ceil_count(reserved * MIN_FUNNEL_SHRINK)) / 2
}

/// Shape of the two overflow tables that follow the banks
#[derive(Debug, Clone, PartialEq)]
pub struct OverflowLayout {
    /// Slots of the uniform-probing overflow table
    pub uniform_slots: usize,
    /// Candidates probed in the uniform table before giving up, unless it is exhaustive
    pub uniform_probes: usize,
    /// Whether the uniform table probes until every slot was visited
    pub uniform_exhaustive: bool,
    /// Slots of the two-choice overflow table, zero when it is disabled
    pub two_choice_slots: usize,
    /// Bucket size of the two-choice table
    pub two_choice_bucket: usize,
    /// `log2(log2(total slots))`
    pub loglogn: f64,
}

impl OverflowLayout {
    /// Splits `overflow_slots` between the two overflow tables of a table with `total` slots.
    ///
    /// The two-choice table takes half, rounded up to whole buckets, unless it would have fewer
    /// than two buckets; then it is disabled and the uniform table takes everything and becomes
    /// the exhaustive last stage.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
    pub fn split(overflow_slots: usize, total: usize) -> Self {
        let loglogn = (total.max(2) as f64).log2().log2();
        let bucket = floor_count(2.0 * loglogn);
        let half = overflow_slots / 2;
        let two_choice_slots = if bucket == 0 || half / bucket < MIN_TWO_CHOICE_BUCKETS {
            0
        } else {
            bucket.saturating_mul(half.div_ceil(bucket))
        };

        Self {
            uniform_slots: overflow_slots.saturating_sub(two_choice_slots),
            uniform_probes: floor_count(loglogn).max(1),
            uniform_exhaustive: two_choice_slots == 0,
            two_choice_slots,
            two_choice_bucket: bucket,
            loglogn,
        }
    }

    /// Total overflow slots
    #[must_use]
    pub const fn slots(&self) -> usize {
        self.uniform_slots.saturating_add(self.two_choice_slots)
    }
}

/// Derived shape of a funnel table
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelLayout {
    /// Number of banks the geometric walk may build, `⌈4·log2(1/δ)⌉ + 10`
    pub max_banks: usize,
    /// Bucket size β, `⌈2·log2(1/δ)⌉`; every bank size is a multiple of it
    pub bucket_size: usize,
    /// Slot counts of the banks, head first
    pub bank_sizes: Vec<usize>,
    /// Overflow tables
    pub overflow: OverflowLayout,
}

impl FunnelLayout {
    /// Computes the layout for an already validated configuration
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
    pub fn compute(config: &FunnelConfig) -> Self {
        let log_inv = log2_inverse(config.delta);
        let max_banks = ceil_count(4.0 * log_inv).saturating_add(MIN_FUNNEL_BANKS);
        let bucket_size = ceil_count(2.0 * log_inv).max(1);

        let total = total_slots(config.capacity, config.delta);
        let mut overflow = overflow_target(config.capacity, config.delta, config.bank_shrink);
        let mut slots = total.saturating_sub(overflow);

        let mut bank_sizes = Vec::new();
        while bank_sizes.len() < max_banks && slots > bucket_size {
            let ideal = slots as f64 * (1.0 - config.bank_shrink);
            let buckets = ceil_count(ideal / bucket_size as f64);
            let size = bucket_size.saturating_mul(buckets.max(1)).min(slots);
            bank_sizes.push(size);
            slots -= size;
        }
        overflow = overflow.saturating_add(slots);

        let overflow = OverflowLayout::split(overflow, total);
        Self { max_banks, bucket_size, bank_sizes, overflow }
    }

    /// Slots held by the banks
    #[must_use]
    pub fn primary_slots(&self) -> usize {
        self.bank_sizes.iter().sum()
    }

    /// Every allocated slot
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.primary_slots().saturating_add(self.overflow.slots())
    }
}

/// Derived shape of an elastic table
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticLayout {
    /// Slot counts of the banks, head first
    pub bank_sizes: Vec<usize>,
    /// Overflow tables
    pub overflow: OverflowLayout,
}

impl ElasticLayout {
    /// Computes the layout for an already validated configuration.
    ///
    /// The primary slots are split into `⌈log2(primary)⌉` banks, so the tail bank is a
    /// shrinking share of the table as it grows.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(config: &ElasticConfig) -> Self {
        let total = total_slots(config.capacity, config.delta);
        let overflow = overflow_target(config.capacity, config.delta, config.bank_shrink);
        let primary = total.saturating_sub(overflow);
        let banks = ceil_count((primary.max(1) as f64).log2()).max(MIN_ELASTIC_BANKS);

        Self {
            bank_sizes: geometric_partition(primary, banks, config.bank_shrink),
            overflow: OverflowLayout::split(overflow, total),
        }
    }

    /// Slots held by the banks
    #[must_use]
    pub fn primary_slots(&self) -> usize {
        self.bank_sizes.iter().sum()
    }

    /// Every allocated slot
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.primary_slots().saturating_add(self.overflow.slots())
    }
}

/// Splits `total` slots into at most `count` banks whose sizes follow `ratio^i`.
///
/// Sizes are differences of floored cumulative ideal sizes, so they sum to exactly `total`.
/// Banks that round down to zero slots are left out.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::arithmetic_side_effects
)]
fn geometric_partition(total: usize, count: usize, ratio: f64) -> Vec<usize> {
    let denominator = 1.0 - ratio.powi(count as i32);
    let mut sizes = Vec::with_capacity(count);
    let mut assigned = 0usize;

    for bank in 1..=count {
        let cumulative = if bank == count {
            total
        } else {
            floor_count(total as f64 * (1.0 - ratio.powi(bank as i32)) / denominator).min(total)
        };
        let size = cumulative.saturating_sub(assigned);
        assigned = assigned.max(cumulative);
        if size > 0 {
            sizes.push(size);
        }
    }

    sizes
}
