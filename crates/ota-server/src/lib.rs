//! Container front end for the OTA package engine.
//!
//! Serves `GET /package` through [`ota_core::Engine`] and answers `GET /` for
//! load-balancer health checks.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::header::IF_NONE_MATCH;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::Parser;
use ota_core::blob::{HttpBlobStore, RoutingBlobStore, S3BlobStore};
use ota_core::store::DynamoRecordStore;
use ota_core::{CanonicalRequest, Engine, EngineConfig};
use tower_http::trace::TraceLayer;

/// Body of the health-check route.
pub const HEALTH_BODY: &str = "Hello World";

/// Command-line and environment configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "ota-server", version, about = "Serve OTA update packages over HTTP")]
pub struct Cli {
    /// Record-store table holding package records
    #[arg(long, env = "APP_LOOKUP_TABLE")]
    pub table: String,

    /// Bucket holding package binaries
    #[arg(long, env = "APP_BINARIES_BUCKET")]
    pub bucket: String,

    /// Address to listen on
    #[arg(long, env = "OTA_LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// AWS region; the SDK default chain applies when unset
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

impl Cli {
    /// Build the engine over DynamoDB, S3 and plain HTTP backends.
    pub async fn build_engine(&self) -> Result<Engine> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        let blobs = RoutingBlobStore::new()
            .with_s3(Arc::new(S3BlobStore::from_config(&sdk_config, &self.bucket)))
            .with_http(Arc::new(HttpBlobStore::new(http)));
        let records = DynamoRecordStore::from_config(&sdk_config, &self.table);

        let config = EngineConfig::from_env();
        tracing::info!(
            table = %self.table,
            bucket = %self.bucket,
            size_constrained = config.size_constrained,
            fetch_concurrency = config.fetch_concurrency,
            "engine configured"
        );

        Ok(Engine::new(config, Arc::new(records), Arc::new(blobs)))
    }
}

/// Routes of the container adapter.
pub fn router(engine: Engine) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/package", get(package))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    engine: Engine,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;

    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}

async fn health() -> &'static str {
    HEALTH_BODY
}

async fn package(
    State(engine): State<Engine>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let if_none_match = headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    let request = CanonicalRequest::from_query(query.as_deref().unwrap_or_default(), if_none_match);

    into_http(engine.handle(&request).await)
}

/// Translate an engine response into an axum response.
pub fn into_http(resp: ota_core::Response) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in resp.headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "dropping invalid header"),
        }
    }

    (status, headers, Body::from(resp.body.into_bytes())).into_response()
}
