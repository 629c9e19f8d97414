//! Construction parameters for both table engines and their validation

use rand::random;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{RngCore, SeedableRng},
};

/// Default fraction of slots kept free
pub const DEFAULT_DELTA: f64 = 0.1;
/// Default bank shrink ratio of funnel tables, 3/4 as in the paper
pub const DEFAULT_FUNNEL_SHRINK: f64 = 0.75;
/// Default size ratio between consecutive elastic banks
pub const DEFAULT_ELASTIC_SHRINK: f64 = 0.75;
/// Default occupation at which a bank stops accepting inserts as the second bank of a pair
pub const DEFAULT_BANK2_OCCUPATION: f64 = 0.75;
/// Default `c` constant of the limited probe count in the first bank of a pair
pub const DEFAULT_FILL_FACTOR: f64 = 200.0;
/// Lowest funnel shrink ratio; also the lower bound of the overflow size formula
pub const MIN_FUNNEL_SHRINK: f64 = 0.5;

/// Rejected construction parameters
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The requested capacity is zero
    #[error("capacity must be positive")]
    ZeroCapacity,
    /// A ratio lies outside its domain
    #[error("{name} = {value} is outside {range}")]
    OutOfRange {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: f64,
        /// Accepted domain, in interval notation
        range: &'static str,
    },
}

/// Checks `value ∈ (0, 1)`
fn open_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value, range: "(0, 1)" })
    }
}

/// Checks that the capacity is positive
const fn positive_capacity(capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 { Err(ConfigError::ZeroCapacity) } else { Ok(()) }
}

/// Parameters of a funnel hashing table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunnelConfig {
    /// Number of entries the table accepts
    pub capacity: usize,
    /// Fraction of slots kept free, in (0, 1)
    pub delta: f64,
    /// Ratio by which every bank shrinks relative to the slots left, in [1/2, 1)
    pub bank_shrink: f64,
    /// Seed for hashing and probe sequences; random when `None`
    pub seed: Option<u64>,
}

impl FunnelConfig {
    /// Creates a configuration with default ratios for `capacity` entries
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { capacity, delta: DEFAULT_DELTA, bank_shrink: DEFAULT_FUNNEL_SHRINK, seed: None }
    }

    /// Sets the free-slot fraction
    #[must_use]
    pub const fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Sets the bank shrink ratio
    #[must_use]
    pub const fn with_bank_shrink(mut self, bank_shrink: f64) -> Self {
        self.bank_shrink = bank_shrink;
        self
    }

    /// Makes the table reproducible by fixing its seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks every parameter against its domain
    ///
    /// # Errors
    ///
    /// Returns the first parameter found outside its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_capacity(self.capacity)?;
        open_unit("delta", self.delta)?;
        if !(self.bank_shrink >= MIN_FUNNEL_SHRINK && self.bank_shrink < 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "bank_shrink",
                value: self.bank_shrink,
                range: "[0.5, 1)",
            });
        }
        Ok(())
    }
}

/// Parameters of an elastic hashing table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticConfig {
    /// Number of entries the table accepts
    pub capacity: usize,
    /// Fraction of slots kept free, in (0, 1)
    pub delta: f64,
    /// Size ratio of every bank to the previous one, in (0, 1)
    pub bank_shrink: f64,
    /// Occupation at which a bank stops taking inserts as the second bank of a pair, in (0, 1)
    pub bank2_occupation: f64,
    /// The `c` constant scaling the limited probe count of the first bank of a pair, `>= 0`
    pub fill_factor: f64,
    /// Seed for hashing and probe sequences; random when `None`
    pub seed: Option<u64>,
}

impl ElasticConfig {
    /// Creates a configuration with default ratios for `capacity` entries
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            delta: DEFAULT_DELTA,
            bank_shrink: DEFAULT_ELASTIC_SHRINK,
            bank2_occupation: DEFAULT_BANK2_OCCUPATION,
            fill_factor: DEFAULT_FILL_FACTOR,
            seed: None,
        }
    }

    /// Sets the free-slot fraction
    #[must_use]
    pub const fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Sets the bank shrink ratio
    #[must_use]
    pub const fn with_bank_shrink(mut self, bank_shrink: f64) -> Self {
        self.bank_shrink = bank_shrink;
        self
    }

    /// Sets the second-bank occupation threshold
    #[must_use]
    pub const fn with_bank2_occupation(mut self, bank2_occupation: f64) -> Self {
        self.bank2_occupation = bank2_occupation;
        self
    }

    /// Sets the limited probe scale `c`
    #[must_use]
    pub const fn with_fill_factor(mut self, fill_factor: f64) -> Self {
        self.fill_factor = fill_factor;
        self
    }

    /// Makes the table reproducible by fixing its seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks every parameter against its domain
    ///
    /// # Errors
    ///
    /// Returns the first parameter found outside its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_capacity(self.capacity)?;
        open_unit("delta", self.delta)?;
        open_unit("bank_shrink", self.bank_shrink)?;
        open_unit("bank2_occupation", self.bank2_occupation)?;
        if !(self.fill_factor.is_finite() && self.fill_factor >= 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "fill_factor",
                value: self.fill_factor,
                range: "[0, inf)",
            });
        }
        Ok(())
    }
}

/// Source of every seed a table draws at construction
#[derive(Debug)]
pub(crate) struct Seeds(ChaCha8Rng);

impl Seeds {
    /// Seeds from the configured value, or from the thread generator when there is none
    pub(crate) fn new(seed: Option<u64>) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(random)))
    }

    /// Next 32-bit seed, used for banks and overflow tables
    pub(crate) fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    /// Next 64-bit seed, used for the default key hasher
    pub(crate) fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
}
