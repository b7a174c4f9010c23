//! Conditional-cache evaluation against `If-None-Match` validators.
//!
//! Freshness is plain content-hash membership. There is no version counter:
//! two builds with identical bytes look the same to a device.

use ota_schema::{ContentHash, PackageRecord};

/// Whether a device still needs a record's binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The device does not hold this build.
    Fresh,
    /// The device already holds this build.
    Cached,
}

impl Freshness {
    /// Per-app status code recorded in the manifest.
    pub fn status_code(self) -> u16 {
        match self {
            Self::Fresh => 200,
            Self::Cached => 304,
        }
    }
}

/// Content hashes a device reports holding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators(Vec<String>);

impl Validators {
    /// Parse an `If-None-Match` header value.
    ///
    /// Items are comma separated. Surrounding whitespace, quotes and a weak
    /// `W/` prefix are stripped; case is kept.
    pub fn parse(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Self::default();
        };

        Self(
            header
                .split(',')
                .map(|item| {
                    let item = item.trim();
                    let item = item.strip_prefix("W/").unwrap_or(item);
                    item.trim_matches('"').to_string()
                })
                .filter(|item| !item.is_empty())
                .collect(),
        )
    }

    /// Whether `hash` is among the validators.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.0.iter().any(|v| v == hash.as_str())
    }

    /// Classify one record.
    pub fn classify(&self, record: &PackageRecord) -> Freshness {
        if self.contains(&record.md5) {
            Freshness::Cached
        } else {
            Freshness::Fresh
        }
    }

    /// Whether the device sent no validators at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
