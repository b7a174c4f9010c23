//! Bundle assembly: turn matched records into the payload a device receives.
//!
//! For full payloads every fresh binary is fetched and packed into a gzip tar
//! archive as `<app>_<version>`, followed by `package_details.json`. For
//! metadata-only requests just the manifest is emitted. In both modes, if no
//! record is fresh the result is [`Outcome::NotModified`].

use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures::{StreamExt, TryStreamExt, stream};
use ota_schema::{MANIFEST_ENTRY_NAME, PackageManifest, PackageRecord, PayloadType};
use tracing::{debug, info, warn};

use crate::blob::{BlobError, BlobLocator, BlobStore};
use crate::cache::{Freshness, Validators};
use crate::config::EngineConfig;
use crate::error::ResolveError;

/// Successful result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Gzip tar archive of fresh binaries plus the manifest
    Bundle(Vec<u8>),
    /// Manifest JSON (metadata-only requests)
    Manifest(String),
    /// Every candidate is already held by the device
    NotModified,
}

/// Builds the payload for a set of matched records.
pub struct BundleAssembler<'a> {
    blobs: &'a dyn BlobStore,
    config: &'a EngineConfig,
}

impl std::fmt::Debug for BundleAssembler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleAssembler")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> BundleAssembler<'a> {
    /// Create an assembler fetching from `blobs`.
    pub fn new(blobs: &'a dyn BlobStore, config: &'a EngineConfig) -> Self {
        Self { blobs, config }
    }

    /// Assemble the payload for `records`, in store-return order.
    pub async fn assemble(
        &self,
        records: &[PackageRecord],
        payload_type: PayloadType,
        validators: &Validators,
    ) -> Result<Outcome, ResolveError> {
        match payload_type {
            PayloadType::FullPayload => self.full_payload(records, validators).await,
            PayloadType::MetadataOnly => metadata_only(records, validators),
        }
    }

    async fn full_payload(
        &self,
        records: &[PackageRecord],
        validators: &Validators,
    ) -> Result<Outcome, ResolveError> {
        let mut manifest = PackageManifest::new();
        let mut pending = Vec::new();

        for record in records {
            let freshness = validators.classify(record);
            manifest.record(record, freshness.status_code());
            if freshness == Freshness::Cached {
                continue;
            }

            match BlobLocator::parse(&record.url) {
                Ok(locator) => pending.push((record, locator)),
                Err(BlobError::Unsupported(url)) => {
                    warn!(app = %record.app, %url, "unsupported locator, binary omitted from bundle");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if pending.is_empty() {
            debug!(records = records.len(), "no fresh binaries");
            return Ok(Outcome::NotModified);
        }

        let fetches: Vec<_> = pending
            .into_iter()
            .map(|(record, locator)| self.fetch_binary(record, locator))
            .collect();
        let binaries: Vec<(String, Bytes)> = stream::iter(fetches)
            .buffered(self.config.fetch_concurrency.max(1))
            .try_collect()
            .await?;

        let archive = write_archive(&binaries, &manifest.to_json()?)?;
        info!(
            binaries = binaries.len(),
            records = records.len(),
            size = archive.len(),
            "bundle assembled"
        );
        Ok(Outcome::Bundle(archive))
    }

    async fn fetch_binary(
        &self,
        record: &PackageRecord,
        locator: BlobLocator,
    ) -> Result<(String, Bytes), BlobError> {
        let data = tokio::time::timeout(self.config.fetch_timeout, self.blobs.fetch(&locator))
            .await
            .map_err(|_| BlobError::Timeout(locator.to_string()))??;

        if self.config.verify_content_hash && !record.md5.matches(&data) {
            return Err(BlobError::HashMismatch {
                locator: locator.to_string(),
                expected: record.md5.to_string(),
                actual: ota_schema::ContentHash::compute(&data).to_string(),
            });
        }

        debug!(app = %record.app, version = %record.version, size = data.len(), "binary fetched");
        Ok((record.entry_name(), data))
    }
}

fn metadata_only(records: &[PackageRecord], validators: &Validators) -> Result<Outcome, ResolveError> {
    let mut manifest = PackageManifest::new();
    let mut fresh = 0usize;

    for record in records {
        let freshness = validators.classify(record);
        if freshness == Freshness::Fresh {
            fresh += 1;
        }
        manifest.record(record, freshness.status_code());
    }

    if fresh == 0 {
        debug!(records = records.len(), "no fresh records");
        return Ok(Outcome::NotModified);
    }
    Ok(Outcome::Manifest(manifest.to_json()?))
}

/// Pack `binaries` and the manifest into a gzip tar archive.
///
/// Entries get a fixed mode and mtime so identical inputs produce identical
/// archives. The manifest is always the last entry.
pub fn write_archive(binaries: &[(String, Bytes)], manifest_json: &str) -> std::io::Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, data) in binaries {
        append_entry(&mut builder, name, data)?;
    }
    append_entry(&mut builder, MANIFEST_ENTRY_NAME, manifest_json.as_bytes())?;

    builder.into_inner()?.finish()
}

fn append_entry<W: Write>(builder: &mut tar::Builder<W>, name: &str, data: &[u8]) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    builder.append_data(&mut header, name, data)
}
