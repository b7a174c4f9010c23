//! SSM Parameter Store source.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::types::Parameter;

use super::settings::{EdgeSettings, ParameterSource};
use crate::engine::Engine;

/// Reads parameters with `GetParameter`.
#[derive(Debug, Clone)]
pub struct SsmParameterSource {
    client: Client,
}

impl SsmParameterSource {
    /// Wrap an already-configured client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from shared AWS configuration.
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl ParameterSource for SsmParameterSource {
    async fn get(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .send()
            .await
            .with_context(|| format!("failed to read parameter {name}"))?;

        output
            .parameter()
            .and_then(Parameter::value)
            .map(str::to_string)
            .with_context(|| format!("parameter {name} has no value"))
    }
}

/// Resolve the edge settings from SSM and build the engine over them.
pub async fn build_edge_engine(sdk_config: &aws_config::SdkConfig) -> Result<Engine> {
    let settings = EdgeSettings::load(&SsmParameterSource::from_config(sdk_config)).await?;
    Ok(settings.build_engine(sdk_config))
}
