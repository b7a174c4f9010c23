//! Backend names for the edge engine.
//!
//! Resolved once at cold start and moved into the [`Engine`](crate::Engine);
//! nothing here is cached in process-wide state.

#[cfg(feature = "aws")]
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::EngineConfig;
#[cfg(feature = "aws")]
use crate::{
    blob::{RoutingBlobStore, S3BlobStore},
    engine::Engine,
    store::DynamoRecordStore,
};

/// Parameter holding the record-store table name.
pub const TABLE_PARAMETER: &str = "/cf-ota-lambda/APP_LOOKUP_TABLE";

/// Parameter holding the binaries bucket name.
pub const BUCKET_PARAMETER: &str = "/cf-ota-lambda/APP_BINARIES_BUCKET";

/// Named string parameters, e.g. a parameter store.
#[async_trait]
pub trait ParameterSource: Send + Sync {
    /// Current value of `name`.
    async fn get(&self, name: &str) -> Result<String>;
}

/// Table and bucket the edge engine reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSettings {
    /// Record-store table
    pub table: String,
    /// Binaries bucket
    pub bucket: String,
}

impl EdgeSettings {
    /// Read [`TABLE_PARAMETER`] and [`BUCKET_PARAMETER`] from `source`.
    pub async fn load(source: &dyn ParameterSource) -> Result<Self> {
        let table = source.get(TABLE_PARAMETER).await?;
        let bucket = source.get(BUCKET_PARAMETER).await?;
        tracing::info!(%table, %bucket, "edge settings loaded");
        Ok(Self { table, bucket })
    }

    /// Engine configuration for edge runtimes, where full bundles are refused.
    pub fn engine_config() -> EngineConfig {
        EngineConfig {
            size_constrained: true,
            ..EngineConfig::default()
        }
    }

    /// Build the edge engine over `DynamoDB` and S3.
    #[cfg(feature = "aws")]
    pub fn build_engine(&self, sdk_config: &aws_config::SdkConfig) -> Engine {
        let records = DynamoRecordStore::from_config(sdk_config, &self.table);
        let blobs = RoutingBlobStore::new()
            .with_s3(Arc::new(S3BlobStore::from_config(sdk_config, &self.bucket)));
        Engine::new(Self::engine_config(), Arc::new(records), Arc::new(blobs))
    }
}
