//! Package records as held by the record store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::hash::ContentHash;

/// One deployable build of an app in a given environment ring.
///
/// This is the row shape held by the record store. The engine only reads
/// records; exactly one record is current per `(app, env)` and the store is
/// responsible for that uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    /// App id (e.g. `os_armv8`, `scoreboard`)
    pub app: String,

    /// Deployment ring (e.g. `beta`, `prod`)
    pub env: String,

    /// App-defined version string; ordering is not interpreted here
    pub version: String,

    /// Opaque build identifier
    pub ident: String,

    /// Blob-store locator (e.g. `s3://bucket/os_armv8_2.0.0`)
    pub url: String,

    /// Hex MD5 of the binary, used as the conditional-cache validator
    pub md5: ContentHash,

    /// Architecture the build targets, for OS images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_arch: Option<String>,

    /// Device capabilities this build applies to (attribute name -> required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_attr: Option<BTreeMap<String, bool>>,
}

impl PackageRecord {
    /// Name of the archive entry holding this record's binary.
    pub fn entry_name(&self) -> String {
        format!("{}_{}", self.app, self.version)
    }

    /// Whether the record declares `name` as a true device attribute.
    ///
    /// Names compare exactly, as the record store compares document paths.
    pub fn has_attr(&self, name: &str) -> bool {
        self.device_attr
            .as_ref()
            .and_then(|attrs| attrs.get(name))
            .copied()
            .unwrap_or(false)
    }
}
