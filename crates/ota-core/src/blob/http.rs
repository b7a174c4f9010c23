//! HTTP(S) blob backend.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use super::{BlobError, BlobLocator, BlobStore};

/// User Agent string sent with blob fetches
pub const USER_AGENT: &str = concat!("ota-core/", env!("CARGO_PKG_VERSION"));

/// Fetches `http(s)://` locators with a plain GET.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
}

impl HttpBlobStore {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[instrument(skip(self))]
    async fn fetch(&self, locator: &BlobLocator) -> Result<Bytes, BlobError> {
        let BlobLocator::Http(url) = locator else {
            return Err(BlobError::Unsupported(locator.to_string()));
        };
        let backend = |source: reqwest::Error| BlobError::Backend {
            locator: url.clone(),
            source: source.into(),
        };

        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(backend)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(url.clone()));
        }

        let data = resp
            .error_for_status()
            .map_err(backend)?
            .bytes()
            .await
            .map_err(backend)?;

        debug!(size = data.len(), "fetched blob");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn fetches_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/blobs/scoreboard_2.0.0")
            .with_status(200)
            .with_body("scoreboard-binary")
            .create_async()
            .await;

        let store = HttpBlobStore::new(Client::new());
        let locator = BlobLocator::parse(&format!("{}/blobs/scoreboard_2.0.0", server.url())).unwrap();
        let data = store.fetch(&locator).await.unwrap();
        assert_eq!(&data[..], b"scoreboard-binary");
    }

    #[tokio::test]
    async fn maps_status_errors() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/broken")
            .with_status(503)
            .create_async()
            .await;

        let store = HttpBlobStore::new(Client::new());

        let err = store
            .fetch(&BlobLocator::Http(format!("{}/missing", server.url())))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));

        let err = store
            .fetch(&BlobLocator::Http(format!("{}/broken", server.url())))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Backend { .. }));
    }
}
