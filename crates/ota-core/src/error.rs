//! Error taxonomy for one pipeline invocation.

use thiserror::Error;

use crate::blob::BlobError;
use crate::store::StoreError;

/// Why a request could not produce a payload.
///
/// Client-facing variants carry the message sent back to the device.
/// Internal variants are logged in full and masked in the response.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Missing or malformed selector (400)
    #[error("{0}")]
    Validation(String),

    /// Operation not available in this execution environment (405)
    #[error("{0}")]
    Unsupported(String),

    /// The record store returned no candidates (404)
    #[error("No deployment package found")]
    NotFound,

    /// Record store failure (500)
    #[error("Record store failure: {0}")]
    Store(#[from] StoreError),

    /// Blob store failure (500)
    #[error("Blob store failure: {0}")]
    Blob(#[from] BlobError),

    /// Failure writing the archive or manifest (500)
    #[error("Failed to encode payload: {0}")]
    Encode(String),
}

impl ResolveError {
    /// Create a validation error.
    pub fn validation(msg: impl std::fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound => 404,
            Self::Unsupported(_) => 405,
            Self::Store(_) | Self::Blob(_) | Self::Encode(_) => 500,
        }
    }

    /// Whether the error comes from a collaborator failure rather than the request.
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
