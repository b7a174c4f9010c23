//! Construction errors.

/// Errors constructing schema values from untrusted strings.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The architecture is empty.
    #[error("Unknown architecture: {0}")]
    InvalidArch(String),

    /// The payload type is neither `fullPayload` nor `metadataOnly`.
    #[error("Unknown payloadType: {0}")]
    UnknownPayloadType(String),
}
