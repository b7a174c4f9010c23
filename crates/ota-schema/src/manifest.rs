//! The metadata manifest returned to devices and packed into bundles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::PackageRecord;

/// Archive entry name of the manifest inside a bundle.
pub const MANIFEST_ENTRY_NAME: &str = "package_details.json";

/// Per-app summary returned to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Version of the current build in the requested ring
    #[serde(rename = "latestVersion")]
    pub latest_version: String,

    /// Blob-store locator of that build
    pub url: String,

    /// 200 if the device lacks this build, 304 if it already holds it
    pub status_code: u16,
}

/// Manifest of every matched app, keyed by app id.
///
/// Backed by a `BTreeMap` so serialization is stable across identical
/// requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageManifest(BTreeMap<String, PackageMetadata>);

impl PackageManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `record` with the given status.
    ///
    /// A later record for the same app replaces the earlier one.
    pub fn record(&mut self, record: &PackageRecord, status_code: u16) {
        self.0.insert(
            record.app.clone(),
            PackageMetadata {
                latest_version: record.version.clone(),
                url: record.url.clone(),
                status_code,
            },
        );
    }

    /// Look up an app's entry.
    pub fn get(&self, app: &str) -> Option<&PackageMetadata> {
        self.0.get(app)
    }

    /// Iterate entries in app order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PackageMetadata)> {
        self.0.iter()
    }

    /// Serialize to the JSON written to clients and into bundles.
    ///
    /// # Errors
    ///
    /// Returns an error only if serialization itself fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
