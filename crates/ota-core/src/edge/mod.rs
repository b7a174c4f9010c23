//! CloudFront edge-function adapter.
//!
//! Translates a viewer/origin-request event into a [`CanonicalRequest`] and a
//! [`Response`] back into the generated-response object CloudFront expects.
//! Edge runtimes cap response size, so engines serving this adapter should
//! run with [`EngineConfig::size_constrained`](crate::EngineConfig) set.
//!
//! Edge functions have no environment variables, so the table and bucket
//! names come from a [`ParameterSource`] via [`EdgeSettings::load`].

pub mod settings;
#[cfg(feature = "aws")]
pub mod ssm;

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::ResolveError;
use crate::request::CanonicalRequest;
use crate::response::{self, Body, Response};

pub use settings::{BUCKET_PARAMETER, EdgeSettings, ParameterSource, TABLE_PARAMETER};
#[cfg(feature = "aws")]
pub use ssm::{SsmParameterSource, build_edge_engine};

/// Lambda@Edge request event.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeEvent {
    /// Event records; CloudFront always sends exactly one
    #[serde(rename = "Records", default)]
    pub records: Vec<EdgeRecord>,
}

/// One event record.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeRecord {
    /// CloudFront payload
    pub cf: CfPayload,
}

/// CloudFront section of a record.
#[derive(Debug, Clone, Deserialize)]
pub struct CfPayload {
    /// The viewer request
    pub request: CfRequest,
}

/// Request as CloudFront presents it.
#[derive(Debug, Clone, Deserialize)]
pub struct CfRequest {
    /// Raw query string without the leading `?`
    #[serde(default)]
    pub querystring: String,
    /// Headers keyed by lower-cased name
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<CfHeader>>,
}

/// One header value in CloudFront's representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfHeader {
    /// Header name as sent
    pub key: String,
    /// Header value
    pub value: String,
}

/// Generated response returned to CloudFront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeResponse {
    /// Status code as a string
    pub status: String,
    /// Headers keyed by lower-cased name
    pub headers: BTreeMap<String, Vec<CfHeader>>,
    /// Body, base64 encoded for binary payloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `text` or `base64`
    #[serde(rename = "bodyEncoding", skip_serializing_if = "Option::is_none")]
    pub body_encoding: Option<String>,
}

impl EdgeEvent {
    /// Extract the canonical request.
    pub fn to_request(&self) -> Result<CanonicalRequest, ResolveError> {
        let Some(record) = self.records.first() else {
            return Err(ResolveError::validation("Malformed edge event"));
        };
        let request = &record.cf.request;

        if request.querystring.is_empty() {
            return Err(ResolveError::validation("No query params provided"));
        }

        let if_none_match = request
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("if-none-match"))
            .and_then(|(_, values)| values.first())
            .map(|h| h.value.as_str());

        Ok(CanonicalRequest::from_query(&request.querystring, if_none_match))
    }
}

impl From<Response> for EdgeResponse {
    fn from(resp: Response) -> Self {
        let headers = resp
            .headers
            .into_iter()
            .map(|(key, value)| {
                (
                    key.to_ascii_lowercase(),
                    vec![CfHeader {
                        key: key.to_string(),
                        value,
                    }],
                )
            })
            .collect();

        let (body, body_encoding) = match resp.body {
            Body::Empty => (None, None),
            Body::Text(text) => (Some(text), Some("text".to_string())),
            Body::Bytes(bytes) => (Some(STANDARD.encode(bytes)), Some("base64".to_string())),
        };

        Self {
            status: resp.status.to_string(),
            headers,
            body,
            body_encoding,
        }
    }
}

/// Serve one edge event.
pub async fn handle_edge_event(engine: &Engine, event: &EdgeEvent) -> EdgeResponse {
    let resp = match event.to_request() {
        Ok(request) => engine.handle(&request).await,
        Err(err) => {
            tracing::warn!(error = %err, "rejecting edge event");
            response::from_error(&err)
        }
    };
    resp.into()
}
