//! Content hashes.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Newtype for a package content hash (hex MD5 as stored alongside each record).
///
/// Comparison is exact: the hash doubles as a conditional-cache validator, and
/// clients echo back whatever string they were given, so case is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Create a new `ContentHash` without validation (for store/deserialized data).
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Compute the hex MD5 of `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self(hex::encode(Md5::digest(data)))
    }

    /// Whether `data` hashes to this value (hex compared case-insensitively).
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::compute(data).0.eq_ignore_ascii_case(&self.0)
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
