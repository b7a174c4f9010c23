//! The resolution pipeline: selectors → query → records → payload → response.

use std::sync::Arc;

use tracing::{Instrument, debug, error, info_span, warn};

use crate::blob::BlobStore;
use crate::bundle::{BundleAssembler, Outcome};
use crate::cache::Validators;
use crate::config::EngineConfig;
use crate::error::ResolveError;
use crate::query::build_query;
use crate::request::CanonicalRequest;
use crate::response::{self, Response};
use crate::store::{RecordStore, StoreError};

/// Stateless request handler sharing read-only configuration and store handles.
///
/// Cheap to clone; one instance serves every request of a process.
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine over the given stores.
    pub fn new(
        config: EngineConfig,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            records,
            blobs,
        }
    }

    /// Run the pipeline and shape the response.
    ///
    /// Internal failures are logged here with their cause; the response
    /// carries only the generic 500 body.
    pub async fn handle(&self, request: &CanonicalRequest) -> Response {
        let selectors = request.selectors();
        let span = info_span!(
            "package_request",
            cpu_arch = selectors.cpu_arch.as_deref().unwrap_or("-"),
            env = %selectors.env,
            payload_type = %selectors.payload_type,
            selectors = selectors.extra.len(),
        );

        async {
            let result = self.resolve(request).await;
            match &result {
                Ok(Outcome::NotModified) => debug!(status = 304, "not modified"),
                Ok(_) => debug!(status = 200, "payload ready"),
                Err(err) if err.is_internal() => error!(error = %err, "request failed"),
                Err(err) => warn!(status = err.status_code(), error = %err, "request rejected"),
            }
            response::from_result(result)
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline without shaping the result.
    pub async fn resolve(&self, request: &CanonicalRequest) -> Result<Outcome, ResolveError> {
        let query = build_query(&request.selectors(), self.config.size_constrained)?;
        let validators = Validators::parse(request.if_none_match());

        let records = tokio::time::timeout(self.config.store_timeout, self.records.query(&query.filter))
            .await
            .map_err(|_| StoreError::Timeout)??;

        if records.is_empty() {
            return Err(ResolveError::NotFound);
        }
        debug!(records = records.len(), validators = validators.len(), "candidates found");

        BundleAssembler::new(self.blobs.as_ref(), &self.config)
            .assemble(&records, query.payload_type, &validators)
            .await
    }
}
