//! S3 blob backend.

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use bytes::Bytes;
use tracing::{debug, instrument, warn};

use super::{BlobError, BlobLocator, BlobStore};

/// Fetches `s3://` locators from the configured binaries bucket.
///
/// The bucket named inside a locator is informational: objects are always
/// read from the bucket this store was built with.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: s3::Client,
    bucket: String,
}

impl S3BlobStore {
    /// Wrap an already-configured client.
    pub fn new(client: s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from shared AWS configuration.
    pub fn from_config(config: &aws_config::SdkConfig, bucket: impl Into<String>) -> Self {
        Self::new(s3::Client::new(config), bucket)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn fetch(&self, locator: &BlobLocator) -> Result<Bytes, BlobError> {
        let BlobLocator::S3 { bucket, key } = locator else {
            return Err(BlobError::Unsupported(locator.to_string()));
        };
        if *bucket != self.bucket {
            warn!(locator_bucket = %bucket, "locator names a different bucket");
        }

        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(s3::operation::get_object::GetObjectError::is_no_such_key)
                {
                    return Err(BlobError::NotFound(locator.to_string()));
                }
                return Err(BlobError::Backend {
                    locator: locator.to_string(),
                    source: anyhow::Error::new(err).context("Failed to get object from S3"),
                });
            }
        };

        let data = resp
            .body
            .collect()
            .await
            .context("Failed to read object body from S3")
            .map_err(|source| BlobError::Backend {
                locator: locator.to_string(),
                source,
            })?
            .into_bytes();

        debug!(%key, size = data.len(), "fetched object");
        Ok(data)
    }
}
