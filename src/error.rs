//! Insert failures

/// Why an insert was rejected. The table is left untouched in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    /// The table already holds as many entries as it was built for
    #[error("table is at its capacity of {capacity} entries")]
    CapacityExhausted {
        /// Declared capacity of the table
        capacity: usize,
    },
    /// Every slot the key's hash may occupy is taken, although the table is not full
    #[error("no free slot on the probe path of the key")]
    ProbeExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            InsertError::CapacityExhausted { capacity: 100 }.to_string(),
            "table is at its capacity of 100 entries"
        );
        assert_eq!(InsertError::ProbeExhausted.to_string(), "no free slot on the probe path of the key");
    }
}
