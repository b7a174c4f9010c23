//! End-to-end resolution over the demo catalogue.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use ota_core::blob::MemoryBlobStore;
use ota_core::store::MemoryRecordStore;
use ota_core::{Body, CanonicalRequest, Engine, EngineConfig, Response};
use ota_schema::{ContentHash, MANIFEST_ENTRY_NAME, PackageManifest, PackageRecord};

const BUCKET: &str = "app-binaries";

/// Engine over the demo catalogue: OS images for two architectures and a few
/// attribute-targeted apps, each in a beta and a prod ring.
struct TestContext {
    engine: Engine,
    records: Arc<MemoryRecordStore>,
    blobs: Arc<MemoryBlobStore>,
    catalogue: Vec<PackageRecord>,
}

impl TestContext {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        let rows: [(&str, &str, &str, &str, Option<&str>, &[(&str, bool)]); 9] = [
            ("os_armv8", "beta", "2.0.0", "alx_2.0.0", Some("armv8"), &[]),
            ("os_armv8", "prod", "1.1.0", "alx_1.1.0", Some("armv8"), &[]),
            ("os_armv7", "beta", "2.0.0", "als_2.0.0", Some("armv7"), &[]),
            ("os_armv7", "prod", "1.0.0", "als_1.0.0", Some("armv7"), &[]),
            ("scoreboard", "beta", "2.0.0", "ab_2.0.0", None, &[("gamer", true)]),
            ("scoreboard", "prod", "1.0.0", "ab_1.0.0", None, &[("gamer", true)]),
            ("videoStreamer", "beta", "0.1.2", "a_0.1.2", None, &[("camera", true)]),
            (
                "videoStreamer",
                "prod",
                "0.0.1",
                "a_0.0.1",
                None,
                &[("camera", true), ("gamer", true)],
            ),
            ("modemFW", "prod", "1.0", "b_1.0", None, &[("cellular", true)]),
        ];

        let mut blobs = MemoryBlobStore::new();
        let mut catalogue = Vec::new();
        for (app, env, version, ident, cpu_arch, attrs) in rows {
            let data = format!("{app}-{env}-{version}").into_bytes();
            let url = format!("s3://{BUCKET}/{app}_{version}");
            let record = PackageRecord {
                app: app.to_string(),
                env: env.to_string(),
                version: version.to_string(),
                ident: ident.to_string(),
                url: url.clone(),
                md5: ContentHash::compute(&data),
                cpu_arch: cpu_arch.map(str::to_string),
                device_attr: (!attrs.is_empty()).then(|| {
                    attrs
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), *v))
                        .collect::<BTreeMap<_, _>>()
                }),
            };
            blobs.insert(url, data);
            catalogue.push(record);
        }

        let records = Arc::new(MemoryRecordStore::new(catalogue.clone()));
        let blobs = Arc::new(blobs);
        let engine = Engine::new(config, records.clone(), blobs.clone());

        Self {
            engine,
            records,
            blobs,
            catalogue,
        }
    }

    fn hash(&self, app: &str, env: &str) -> String {
        self.catalogue
            .iter()
            .find(|r| r.app == app && r.env == env)
            .map(|r| r.md5.to_string())
            .expect("record in catalogue")
    }

    async fn get(&self, query: &str, if_none_match: Option<&str>) -> Response {
        self.engine
            .handle(&CanonicalRequest::from_query(query, if_none_match))
            .await
    }
}

fn unpack(resp: Response) -> Vec<(String, Vec<u8>)> {
    let archive = match resp.body {
        Body::Bytes(archive) => archive,
        other => panic!("expected binary body, got {other:?}"),
    };
    let mut archive = tar::Archive::new(GzDecoder::new(archive.as_slice()));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (name, data)
        })
        .collect()
}

fn manifest(resp: &Response) -> PackageManifest {
    let Body::Text(json) = &resp.body else {
        panic!("expected JSON body, got {:?}", resp.body);
    };
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn test_one_fresh_one_cached_bundle() {
    let ctx = TestContext::new();
    let held = ctx.hash("scoreboard", "beta");

    let resp = ctx
        .get("cpuArch=armv8&os=beta&attrGamer=beta", Some(held.as_str()))
        .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Type"), Some("application/x-gzip"));

    let entries = unpack(resp);
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["os_armv8_2.0.0", MANIFEST_ENTRY_NAME]);
    assert_eq!(entries[0].1, b"os_armv8-beta-2.0.0");

    let manifest: PackageManifest = serde_json::from_slice(&entries[1].1).unwrap();
    assert_eq!(manifest.iter().count(), 2);
    assert_eq!(manifest.get("os_armv8").unwrap().status_code, 200);
    assert_eq!(manifest.get("os_armv8").unwrap().latest_version, "2.0.0");
    assert_eq!(manifest.get("scoreboard").unwrap().status_code, 304);
    assert_eq!(ctx.blobs.fetches(), 1);
}

#[tokio::test]
async fn test_all_cached_is_not_modified_on_both_paths() {
    let ctx = TestContext::new();
    let held = format!(
        "\"{}\", W/\"{}\"",
        ctx.hash("os_armv7", "prod"),
        ctx.hash("videoStreamer", "prod")
    );

    for query in [
        "cpuArch=armv7&attrCamera=prod",
        "cpuArch=armv7&attrCamera=prod&payloadType=metadataOnly",
    ] {
        let resp = ctx.get(query, Some(held.as_str())).await;
        assert_eq!(resp.status, 304, "query: {query}");
        assert!(resp.body.is_empty());
        assert_eq!(resp.header("Cache-Control"), Some("max-age=100"));
    }
    assert_eq!(ctx.blobs.fetches(), 0);
}

#[tokio::test]
async fn test_metadata_is_idempotent() {
    let ctx = TestContext::new();
    let query = "cpuArch=armv8&attrGamer=prod&attrCellular=prod&payloadType=metadataOnly";

    let first = ctx.get(query, None).await;
    let second = ctx.get(query, None).await;
    assert_eq!(first.status, 200);
    assert_eq!(first.body, second.body);

    let manifest = manifest(&first);
    let apps: Vec<&str> = manifest.iter().map(|(app, _)| app.as_str()).collect();
    assert_eq!(apps, ["modemFW", "os_armv8", "scoreboard", "videoStreamer"]);
    assert_eq!(manifest.get("os_armv8").unwrap().latest_version, "1.1.0");
    assert_eq!(ctx.blobs.fetches(), 0);
}

#[tokio::test]
async fn test_app_selector() {
    let ctx = TestContext::new();

    let resp = ctx
        .get("cpuArch=armv7&os=beta&scoreboard=prod&payloadType=metadataOnly", None)
        .await;
    let manifest = manifest(&resp);
    assert_eq!(manifest.iter().count(), 2);
    assert_eq!(manifest.get("os_armv7").unwrap().latest_version, "2.0.0");
    assert_eq!(manifest.get("scoreboard").unwrap().latest_version, "1.0.0");
}

#[tokio::test]
async fn test_rejections_never_reach_the_store() {
    let ctx = TestContext::with_config(EngineConfig {
        size_constrained: true,
        ..EngineConfig::default()
    });

    let resp = ctx.get("cpuArch=armv8&os=beta", None).await;
    assert_eq!(resp.status, 405);

    let resp = ctx.get("os=beta&payloadType=metadataOnly", None).await;
    assert_eq!(resp.status, 400);

    let resp = ctx
        .get("cpuArch=armv8&attrGa-mer=beta&payloadType=metadataOnly", None)
        .await;
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body,
        Body::Text(r#"{"error":"Invalid device attribute selector: attrga-mer"}"#.into())
    );

    assert_eq!(ctx.records.queries(), 0);
}

#[tokio::test]
async fn test_unknown_architecture_is_not_found() {
    let ctx = TestContext::new();

    let resp = ctx.get("cpuArch=riscv64&payloadType=metadataOnly", None).await;
    assert_eq!(resp.status, 404);
    assert_eq!(
        resp.body,
        Body::Text(r#"{"error":"No deployment package found"}"#.into())
    );
}

#[tokio::test]
async fn test_full_payload_is_idempotent() {
    let ctx = TestContext::new();
    let query = "cpuArch=armv7&attrGamer=beta&attrCellular=prod";

    let first = unpack(ctx.get(query, None).await);
    let second = unpack(ctx.get(query, None).await);
    assert_eq!(first, second);

    let names: Vec<&str> = first.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        [
            "os_armv7_1.0.0",
            "scoreboard_2.0.0",
            "modemFW_1.0",
            MANIFEST_ENTRY_NAME
        ]
    );
}

#[tokio::test]
async fn test_missing_blob_is_masked() {
    let ctx = TestContext::new();
    let engine = Engine::new(
        EngineConfig::default(),
        ctx.records.clone(),
        Arc::new(MemoryBlobStore::new()),
    );

    let resp = engine
        .handle(&CanonicalRequest::from_query("cpuArch=armv8&os=beta", None))
        .await;
    assert_eq!(resp.status, 500);
    assert_eq!(resp.header("Cache-Control"), Some("max-age=1"));
    assert_eq!(
        resp.body,
        Body::Text(r#"{"error":"Internal Server Error"}"#.into())
    );
    let Body::Text(body) = &resp.body else {
        unreachable!()
    };
    assert!(!body.contains("s3://"));
    assert!(!body.contains(BUCKET));
}

#[tokio::test]
async fn test_vendor_arch_and_ring_names() {
    let data = b"android-image".to_vec();
    let record = PackageRecord {
        app: "os_arm64-v8a".to_string(),
        env: "eu:beta".to_string(),
        version: "3.0.0".to_string(),
        ident: "and_3.0.0".to_string(),
        url: format!("s3://{BUCKET}/os_arm64-v8a_3.0.0"),
        md5: ContentHash::compute(&data),
        cpu_arch: Some("arm64-v8a".to_string()),
        device_attr: None,
    };
    let mut blobs = MemoryBlobStore::new();
    blobs.insert(record.url.clone(), data);
    let engine = Engine::new(
        EngineConfig::default(),
        Arc::new(MemoryRecordStore::new(vec![record])),
        Arc::new(blobs),
    );

    let resp = engine
        .handle(&CanonicalRequest::from_query(
            "cpuArch=ARM64-v8a&os=eu%3Abeta&payloadType=metadataOnly",
            None,
        ))
        .await;
    assert_eq!(resp.status, 200);
    let manifest = manifest(&resp);
    assert_eq!(manifest.get("os_arm64-v8a").unwrap().latest_version, "3.0.0");

    let resp = engine
        .handle(&CanonicalRequest::from_query("cpuArch=arm64-v8a&os=eu:beta", None))
        .await;
    assert_eq!(resp.status, 200);
    let entries = unpack(resp);
    assert_eq!(entries[0], ("os_arm64-v8a_3.0.0".to_string(), b"android-image".to_vec()));
}
