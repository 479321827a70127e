//! Unique identifiers for operator instances

use serde::{Deserialize, Serialize};

/// Unique identifier for an operator instance.
///
/// Guids are assigned monotonically by the [`Model`] catalog when an operator
/// is created. They are used purely for identity comparisons and deterministic
/// enumeration order; they never carry semantic meaning and never contribute
/// to structural graph digests.
///
/// [`Model`]: https://docs.rs/rewire-graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Guid(u64);

impl Guid {
    /// Create a guid from a raw counter value
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw counter value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_ordering_follows_raw_value() {
        let a = Guid::from_raw(1);
        let b = Guid::from_raw(2);
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_guid_roundtrip() {
        let guid = Guid::from_raw(42);
        assert_eq!(guid.raw(), 42);
        assert_eq!(guid.to_string(), "42");
    }

    #[test]
    fn test_guid_serialize() {
        let guid = Guid::from_raw(7);
        let json = serde_json::to_string(&guid).unwrap();
        assert_eq!(json, "7");

        let deserialized: Guid = serde_json::from_str(&json).unwrap();
        assert_eq!(guid, deserialized);
    }
}
