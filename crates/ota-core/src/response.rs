//! Transport-agnostic response shaping.
//!
//! Runtime adapters translate [`Response`] into their own types; nothing here
//! depends on an HTTP framework.

use serde_json::json;

use crate::bundle::Outcome;
use crate::error::ResolveError;

/// `Cache-Control` for every response except masked internal errors.
pub const CACHE_CONTROL: &str = "max-age=100";
/// `Cache-Control` for masked internal errors.
pub const INTERNAL_ERROR_CACHE_CONTROL: &str = "max-age=1";
/// Body message of masked internal errors.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";
/// Download name of bundle responses.
pub const BUNDLE_FILENAME: &str = "ota-package.tar.gz";

/// What the body carries, for header selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// `application/json`
    Json,
    /// Gzip tar bundle
    Tar,
}

/// Response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// No body (304)
    Empty,
    /// UTF-8 text, always JSON here
    Text(String),
    /// Binary archive
    Bytes(Vec<u8>),
}

impl Body {
    /// Body length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Text(s) => s.len(),
            Self::Bytes(b) => b.len(),
        }
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw body bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Text(s) => s.into_bytes(),
            Self::Bytes(b) => b,
        }
    }
}

/// Status, headers and body of a finished request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Header name/value pairs, names in canonical case
    pub headers: Vec<(&'static str, String)>,
    /// Body
    pub body: Body,
}

impl Response {
    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 200 response carrying `body` of the given kind.
pub fn success(kind: PayloadKind, body: Body) -> Response {
    let mut headers = vec![("Cache-Control", CACHE_CONTROL.to_string())];
    match kind {
        PayloadKind::Json => headers.push(("Content-Type", "application/json".to_string())),
        PayloadKind::Tar => {
            headers.push(("Content-Type", "application/x-gzip".to_string()));
            headers.push(("Content-Encoding", "gzip".to_string()));
            headers.push((
                "Content-Disposition",
                format!("attachment; filename=\"{BUNDLE_FILENAME}\""),
            ));
        }
    }
    Response {
        status: 200,
        headers,
        body,
    }
}

/// 304 response with no body.
pub fn not_modified() -> Response {
    Response {
        status: 304,
        headers: vec![("Cache-Control", CACHE_CONTROL.to_string())],
        body: Body::Empty,
    }
}

/// JSON error response `{"error": message}`.
pub fn error(status: u16, message: &str) -> Response {
    error_with_cache(status, message, CACHE_CONTROL)
}

/// Masked 500 response.
pub fn internal_error() -> Response {
    error_with_cache(500, INTERNAL_ERROR_MESSAGE, INTERNAL_ERROR_CACHE_CONTROL)
}

fn error_with_cache(status: u16, message: &str, cache_control: &str) -> Response {
    Response {
        status,
        headers: vec![
            ("Cache-Control", cache_control.to_string()),
            ("Content-Type", "application/json".to_string()),
        ],
        body: Body::Text(json!({ "error": message }).to_string()),
    }
}

/// Shape a failed pipeline run. Internal failures are masked.
pub fn from_error(err: &ResolveError) -> Response {
    if err.is_internal() {
        internal_error()
    } else {
        error(err.status_code(), &err.to_string())
    }
}

/// Shape a pipeline result.
pub fn from_result(result: Result<Outcome, ResolveError>) -> Response {
    match result {
        Ok(Outcome::Bundle(archive)) => success(PayloadKind::Tar, Body::Bytes(archive)),
        Ok(Outcome::Manifest(json)) => success(PayloadKind::Json, Body::Text(json)),
        Ok(Outcome::NotModified) => not_modified(),
        Err(err) => from_error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobError;

    #[test]
    fn bundle_headers() {
        let resp = from_result(Ok(Outcome::Bundle(vec![1, 2, 3])));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("content-type"), Some("application/x-gzip"));
        assert_eq!(resp.header("Content-Encoding"), Some("gzip"));
        assert_eq!(
            resp.header("Content-Disposition"),
            Some("attachment; filename=\"ota-package.tar.gz\"")
        );
        assert_eq!(resp.header("Cache-Control"), Some("max-age=100"));
        assert_eq!(resp.body.len(), 3);
    }

    #[test]
    fn manifest_headers() {
        let resp = from_result(Ok(Outcome::Manifest("{}".into())));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
        assert_eq!(resp.header("Content-Encoding"), None);
        assert_eq!(resp.body, Body::Text("{}".into()));
    }

    #[test]
    fn not_modified_has_empty_body() {
        let resp = from_result(Ok(Outcome::NotModified));
        assert_eq!(resp.status, 304);
        assert!(resp.body.is_empty());
        assert_eq!(resp.header("Cache-Control"), Some("max-age=100"));
    }

    #[test]
    fn client_errors_keep_message() {
        let resp = from_result(Err(ResolveError::validation("Missing cpuArch query param")));
        assert_eq!(resp.status, 400);
        assert_eq!(resp.header("Cache-Control"), Some("max-age=100"));
        assert_eq!(
            resp.body,
            Body::Text(r#"{"error":"Missing cpuArch query param"}"#.into())
        );

        let resp = from_result(Err(ResolveError::NotFound));
        assert_eq!(resp.status, 404);
        assert_eq!(
            resp.body,
            Body::Text(r#"{"error":"No deployment package found"}"#.into())
        );
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = ResolveError::Blob(BlobError::NotFound("s3://secret-bucket/key".into()));
        let resp = from_result(Err(err));
        assert_eq!(resp.status, 500);
        assert_eq!(resp.header("Cache-Control"), Some("max-age=1"));
        let body = String::from_utf8(resp.body.into_bytes()).unwrap();
        assert_eq!(body, r#"{"error":"Internal Server Error"}"#);
        assert!(!body.contains("secret-bucket"));
    }
}
