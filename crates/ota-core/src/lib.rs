//! Package resolution and bundling engine for OTA update delivery.
//!
//! A device sends selectors (`cpuArch`, `os`, `payloadType`, `attr*`, `app*`)
//! and the content hashes it already holds. The [`Engine`] turns the selectors
//! into a [`query::Filter`], runs it against a [`store::RecordStore`], and either
//! bundles the fresh binaries from a [`blob::BlobStore`] into a gzip tar or
//! answers with the JSON manifest alone. Runtime adapters (the HTTP server,
//! the [`edge`] handler) only translate requests and responses.

pub mod blob;
pub mod bundle;
pub mod cache;
pub mod config;
pub mod edge;
pub mod engine;
pub mod error;
pub mod query;
pub mod request;
pub mod response;
pub mod store;

pub use bundle::Outcome;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::ResolveError;
pub use request::CanonicalRequest;
pub use response::{Body, Response};
