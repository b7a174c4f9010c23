//! Record store seam.
//!
//! The engine only needs one operation: run a [`Filter`] and get back decoded
//! [`PackageRecord`]s in store order. Adapters turn backend rows into records
//! at this boundary so nothing downstream handles loosely typed maps.

#[cfg(feature = "aws")]
pub mod dynamo;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ota_schema::PackageRecord;
use thiserror::Error;

use crate::query::Filter;

#[cfg(feature = "aws")]
pub use dynamo::DynamoRecordStore;

/// A row that could not be turned into a [`PackageRecord`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A required attribute is absent.
    #[error("missing attribute '{0}'")]
    Missing(&'static str),

    /// An attribute has the wrong type.
    #[error("attribute '{field}' should be {expected}")]
    WrongType {
        /// Attribute name
        field: &'static str,
        /// Expected type, for the message
        expected: &'static str,
    },
}

/// Failures talking to the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected or failed the query.
    #[error("query failed: {0:#}")]
    Backend(#[source] anyhow::Error),

    /// The filter cannot be expressed for this backend.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A returned row is malformed.
    #[error("malformed record: {0}")]
    Decode(#[from] DecodeError),

    /// The query did not finish in time.
    #[error("query timed out")]
    Timeout,
}

/// Read-only access to package records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return every record matching `filter`, in store order.
    async fn query(&self, filter: &Filter) -> Result<Vec<PackageRecord>, StoreError>;
}

/// Record store over an in-memory list, evaluating filters locally.
///
/// Counts queries so callers can assert when the store was never reached.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Vec<PackageRecord>,
    queries: AtomicUsize,
}

impl MemoryRecordStore {
    /// Create a store holding `records`.
    pub fn new(records: Vec<PackageRecord>) -> Self {
        Self {
            records,
            queries: AtomicUsize::new(0),
        }
    }

    /// Number of queries served so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<PackageRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
