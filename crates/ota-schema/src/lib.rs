//! Shared types and wire format for the OTA package service.
//!
//! Everything here is plain data: records as the store holds them, the
//! selectors a device sends, and the manifest it gets back.

pub mod arch;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod record;
pub mod selector;

// Re-exports
pub use arch::*;
pub use error::SchemaError;
pub use hash::*;
pub use manifest::{MANIFEST_ENTRY_NAME, PackageManifest, PackageMetadata};
pub use record::PackageRecord;
pub use selector::{PayloadType, Selector, SelectorSet};
