//! Schema versioning for exported graph files

use serde::{Deserialize, Serialize};

/// Schema version for the `.rdag` file format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version - breaking changes
    pub major: u32,
    /// Minor version - backwards-compatible additions
    pub minor: u32,
}

impl SchemaVersion {
    /// Current schema version
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    /// Create a new version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Check if this version is compatible with the expected major version
    pub fn is_compatible(&self, expected_major: u32) -> bool {
        self.major == expected_major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_compatible() {
        let v = SchemaVersion::new(1, 5);
        assert!(v.is_compatible(1));
        assert!(!v.is_compatible(2));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(SchemaVersion::new(2, 3).to_string(), "2.3");
    }
}
