//! # Bankhash
//!
//! Fixed-capacity open-addressing hash tables that never move an entry once it is placed.
//!
//! This crate provides two table engines:
//!
//! - `FunnelTable`: funnel hashing, a chain of shrinking banks where every key may use
//!   exactly one bucket per bank
//! - `ElasticTable`: elastic hashing, banks used in pairs and probed harder or lighter
//!   depending on how full the pair currently is
//!
//! Both put the keys their banks reject into two small overflow tables, one probed along a
//! per-key pseudo-random sequence and one using two-choice buckets. Probe sequences are pure
//! functions of the key hash and fixed table seeds, so a lookup always replays the path of
//! the insert that placed the key.
//!
//! Capacity is fixed at construction and there is no removal. Tables are not thread-safe;
//! callers sharing one between threads must serialize every operation themselves.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bankhash::{FunnelTable, InsertError};
//!
//! // Room for 100 entries, 10% of the slots kept free, banks shrinking by 3/4
//! let mut table = FunnelTable::new(100, 0.1, 0.75)?;
//!
//! for i in 0..50 {
//!     table.insert(format!("key{i}"), format!("value{i}"))?;
//! }
//!
//! assert_eq!(table.get("key0").map(String::as_str), Some("value0"));
//! assert_eq!(table.get("nonexistent"), None);
//! assert_eq!(table.len(), 50);
//!
//! // `set` replaces in place and reports whether the key existed
//! assert!(table.set("key0", "updated".to_string())?);
//! assert_eq!(table.get("key0").map(String::as_str), Some("updated"));
//!
//! // A full table rejects inserts before hashing the key
//! let mut tiny = FunnelTable::new(1, 0.1, 0.75)?;
//! tiny.insert("a", 1)?;
//! assert_eq!(tiny.insert("b", 2), Err(InsertError::CapacityExhausted { capacity: 1 }));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Reproducible Tables
//!
//! ```rust
//! use bankhash::{ElasticConfig, ElasticTable};
//!
//! let config = ElasticConfig::new(1_000).with_delta(0.05).with_seed(42);
//! let mut table = ElasticTable::with_config(config)?;
//! table.insert(b"bytes work too", 7_u64)?;
//! assert_eq!(table.get(b"bytes work too"), Some(&7));
//! assert_eq!(table.layout().total_slots(), 1_050);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Bank chain: descriptors over one flat slot arena
mod bank;
/// Construction parameters and their validation
mod config;
/// Elastic hashing engine
mod elastic;
/// Insert failures
mod error;
/// Funnel hashing engine
mod funnel;
/// Key hashing
mod hasher;
/// Overflow-uniform and overflow-two-choice tables
mod overflow;
/// Deterministic probe sequences
mod probe;
/// Derived bank and overflow sizes
mod sizing;
/// Slot storage and probe classification
mod slot;
/// Table core shared by both engines
mod table;

pub use config::{
    ConfigError, DEFAULT_BANK2_OCCUPATION, DEFAULT_DELTA, DEFAULT_ELASTIC_SHRINK,
    DEFAULT_FILL_FACTOR, DEFAULT_FUNNEL_SHRINK, ElasticConfig, FunnelConfig, MIN_FUNNEL_SHRINK,
};
pub use elastic::ElasticTable;
pub use error::InsertError;
pub use funnel::FunnelTable;
pub use hasher::{KeyHasher, PRIME32, SeededHasher};
pub use sizing::{
    ElasticLayout, FunnelLayout, MIN_ELASTIC_BANKS, MIN_FUNNEL_BANKS, MIN_TWO_CHOICE_BUCKETS,
    OverflowLayout,
};
