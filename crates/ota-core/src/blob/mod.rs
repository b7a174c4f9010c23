//! Blob store seam: fetch a binary by the locator stored in its record.
//!
//! Locators are URLs. `s3://bucket/key` goes to S3, `http(s)://` to a plain
//! HTTP GET. [`RoutingBlobStore`] dispatches between the configured backends.

#[cfg(feature = "network")]
pub mod http;
#[cfg(feature = "aws")]
pub mod s3;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[cfg(feature = "network")]
pub use http::HttpBlobStore;
#[cfg(feature = "aws")]
pub use s3::S3BlobStore;

/// Failures fetching a binary.
#[derive(Error, Debug)]
pub enum BlobError {
    /// No backend handles this locator's scheme.
    #[error("unsupported locator: {0}")]
    Unsupported(String),

    /// The locator has a known scheme but is malformed.
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// The backend has no object at this locator.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The fetch did not finish in time.
    #[error("timed out fetching {0}")]
    Timeout(String),

    /// The fetched bytes do not hash to the record's content hash.
    #[error("content hash mismatch for {locator}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Locator fetched
        locator: String,
        /// Hash from the record
        expected: String,
        /// Hash of the bytes received
        actual: String,
    },

    /// Any other backend failure.
    #[error("failed to fetch {locator}: {source:#}")]
    Backend {
        /// Locator fetched
        locator: String,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
}

/// Parsed blob locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlobLocator {
    /// Object in an S3 bucket
    S3 {
        /// Bucket named in the locator
        bucket: String,
        /// Object key
        key: String,
    },
    /// Plain HTTP(S) URL
    Http(String),
}

impl BlobLocator {
    /// Parse a record's `url` field.
    pub fn parse(url: &str) -> Result<Self, BlobError> {
        if let Some(rest) = url.strip_prefix("s3://") {
            return match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }),
                _ => Err(BlobError::InvalidLocator(url.to_string())),
            };
        }

        if url.starts_with("https://") || url.starts_with("http://") {
            return Ok(Self::Http(url.to_string()));
        }

        Err(BlobError::Unsupported(url.to_string()))
    }
}

impl std::fmt::Display for BlobLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            Self::Http(url) => write!(f, "{url}"),
        }
    }
}

/// Read access to binaries.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the full object at `locator`.
    async fn fetch(&self, locator: &BlobLocator) -> Result<Bytes, BlobError>;
}

/// Dispatches by locator scheme to whichever backends are configured.
#[derive(Clone, Default)]
pub struct RoutingBlobStore {
    s3: Option<Arc<dyn BlobStore>>,
    http: Option<Arc<dyn BlobStore>>,
}

impl std::fmt::Debug for RoutingBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingBlobStore")
            .field("s3", &self.s3.is_some())
            .field("http", &self.http.is_some())
            .finish()
    }
}

impl RoutingBlobStore {
    /// Create a router with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `s3://` locators to `store`.
    pub fn with_s3(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.s3 = Some(store);
        self
    }

    /// Route `http(s)://` locators to `store`.
    pub fn with_http(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.http = Some(store);
        self
    }
}

#[async_trait]
impl BlobStore for RoutingBlobStore {
    async fn fetch(&self, locator: &BlobLocator) -> Result<Bytes, BlobError> {
        let backend = match locator {
            BlobLocator::S3 { .. } => self.s3.as_ref(),
            BlobLocator::Http(_) => self.http.as_ref(),
        };
        match backend {
            Some(store) => store.fetch(locator).await,
            None => Err(BlobError::Unsupported(locator.to_string())),
        }
    }
}

/// Blob store over an in-memory map keyed by locator string.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, Bytes>,
    fetches: AtomicUsize,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object under `locator`.
    pub fn insert(&mut self, locator: impl Into<String>, data: impl Into<Bytes>) {
        self.blobs.insert(locator.into(), data.into());
    }

    /// Number of fetches served or attempted so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn fetch(&self, locator: &BlobLocator) -> Result<Bytes, BlobError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let key = locator.to_string();
        self.blobs
            .get(&key)
            .cloned()
            .ok_or(BlobError::NotFound(key))
    }
}
