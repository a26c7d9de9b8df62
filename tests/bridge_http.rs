//! Metadata bridge against mocked pinning services and gateways.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use certificate_bridge::metadata::{
    canonicalize, BridgeConfig, CertificateFields, DocumentTemplate, HttpGateway,
    LocalContentStore, MetadataBridge, NftStorageProvider, PinataProvider, StoreSource,
};
use certificate_bridge::CertificateError;

fn fields() -> CertificateFields {
    CertificateFields {
        course_name: "Zero Knowledge Proofs".into(),
        issuer_name: "Example University".into(),
        student_name: Some("Grace".into()),
        completion_date: Utc.with_ymd_and_hms(2024, 9, 30, 0, 0, 0).unwrap(),
        expiration_date: None,
        token_id: None,
    }
}

fn config() -> BridgeConfig {
    BridgeConfig {
        gateway_timeout: Duration::from_millis(250),
        provider_timeout: Duration::from_millis(250),
        ..BridgeConfig::default()
    }
}

fn gateway(server: &MockServer, prefix: &str) -> Arc<HttpGateway> {
    Arc::new(
        HttpGateway::new(
            reqwest::Client::new(),
            format!("{}/{}/ipfs/{{cid}}", server.uri(), prefix),
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn upload_falls_through_to_second_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/nft/upload"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pinata/pinning/pinJSONToIPFS"))
        .and(header("pinata_api_key", "key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "IpfsHash": "QmPinnedByPinata",
                "PinSize": 512,
                "Timestamp": "2024-09-30T00:00:00Z"
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let bridge = MetadataBridge::new(config(), LocalContentStore::in_memory())
        .with_provider(Arc::new(NftStorageProvider::new(
            client.clone(),
            format!("{}/nft", server.uri()),
            Some("token".into()),
        )))
        .with_provider(Arc::new(PinataProvider::new(
            client,
            format!("{}/pinata", server.uri()),
            Some("key".into()),
            Some("secret".into()),
        )));

    let stored = bridge.store(&fields()).await.unwrap();
    assert_eq!(stored.pointer, "ipfs://QmPinnedByPinata");
    assert_eq!(stored.source, StoreSource::Provider("pinata".into()));
    assert_eq!(stored.failures.len(), 1);
    assert_eq!(stored.failures[0].endpoint, "nft.storage");
    assert!(stored.failures[0].reason.contains("503"));

    // Served from the local copy, no gateway configured
    assert_eq!(bridge.resolve(&stored.pointer).await.unwrap(), stored.document);
}

#[tokio::test]
async fn slow_provider_times_out_and_falls_back_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"value": {"cid": "bafytoolate"}}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let bridge = MetadataBridge::new(config(), LocalContentStore::in_memory()).with_provider(
        Arc::new(NftStorageProvider::new(
            reqwest::Client::new(),
            server.uri(),
            Some("token".into()),
        )),
    );

    let stored = bridge.store(&fields()).await.unwrap();
    assert_eq!(stored.source, StoreSource::LocalFallback);
    assert!(stored.failures[0].reason.contains("timed out"));
    assert_eq!(bridge.stats().fallback_uploads, 1);
}

#[tokio::test]
async fn gateways_tried_in_order_with_timeout() {
    let server = MockServer::start().await;
    let document = canonicalize(&fields(), &DocumentTemplate::default()).unwrap();

    Mock::given(method("GET"))
        .and(path("/broken/ipfs/bafyremote/metadata.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow/ipfs/bafyremote/metadata.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&document)
                .set_delay(Duration::from_secs(5)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/good/ipfs/bafyremote/metadata.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&document))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = MetadataBridge::new(config(), LocalContentStore::in_memory())
        .with_gateway(gateway(&server, "broken"))
        .with_gateway(gateway(&server, "slow"))
        .with_gateway(gateway(&server, "good"));

    let pointer = "ipfs://bafyremote/metadata.json";
    assert_eq!(bridge.resolve(pointer).await.unwrap(), document);
    // Cached: the mocks' expect(1) would fail on a second network fetch
    assert_eq!(bridge.resolve(pointer).await.unwrap(), document);

    let stats = bridge.stats();
    assert_eq!(stats.gateway_failures, 2);
    assert_eq!(stats.gateway_fetches, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test]
async fn all_gateways_failing_is_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let bridge = MetadataBridge::new(config(), LocalContentStore::in_memory())
        .with_gateway(gateway(&server, "a"))
        .with_gateway(gateway(&server, "b"));

    let err = bridge.resolve("ipfs://bafymissing").await.unwrap_err();
    assert!(err.is_not_found());
    let CertificateError::GatewayExhausted { attempts, .. } = err else {
        panic!("expected GatewayExhausted");
    };
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.reason.contains("404")));
}

#[tokio::test]
async fn disk_store_survives_new_bridge() {
    let dir = TempDir::new().unwrap();

    let pointer = {
        let bridge = MetadataBridge::new(config(), LocalContentStore::open(dir.path()).await.unwrap());
        bridge.store(&fields()).await.unwrap().pointer
    };

    let bridge = MetadataBridge::new(config(), LocalContentStore::open(dir.path()).await.unwrap());
    let resolved = bridge.resolve(&pointer).await.unwrap();
    assert_eq!(
        resolved,
        canonicalize(&fields(), &DocumentTemplate::default()).unwrap()
    );
    assert_eq!(bridge.stats().cache_hits, 1);
}

#[tokio::test]
async fn unwritable_fallback_is_provider_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = LocalContentStore::open(dir.path().join("store")).await.unwrap();
    // Remove the directory out from under the store
    std::fs::remove_dir_all(dir.path().join("store")).unwrap();

    let bridge = MetadataBridge::new(config(), store);
    let err = bridge.store(&fields()).await.unwrap_err();
    assert!(matches!(err, CertificateError::ProviderUnavailable { .. }));
}
