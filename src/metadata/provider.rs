//! Pinning providers for the upload path
//!
//! Each provider wraps one pinning service and its authentication scheme.
//! Providers are tried in configured order by the bridge; adding or removing
//! one is a configuration change.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::document::MetadataDocument;

pub const DEFAULT_NFT_STORAGE_URL: &str = "https://api.nft.storage";
pub const DEFAULT_PINATA_URL: &str = "https://api.pinata.cloud";

/// Failure of a single provider or gateway attempt.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Credentials missing; the attempt was skipped
    #[error("not configured")]
    NotConfigured,

    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A pinning service that accepts JSON and returns a content pointer.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Name used in logs, stats and failure records.
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    /// Pin a document and return its `ipfs://` pointer. `bytes` is the
    /// canonical serialization of `document`.
    async fn pin_json(&self, document: &MetadataDocument, bytes: &[u8]) -> Result<String, ContentError>;
}

async fn reject(response: reqwest::Response) -> ContentError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ContentError::Rejected { status, body }
}

fn ipfs_pointer(cid: &str) -> Result<String, ContentError> {
    let cid = cid.trim();
    if cid.is_empty() {
        return Err(ContentError::InvalidResponse("empty CID".into()));
    }
    Ok(format!("ipfs://{cid}"))
}

// ============================================================================
// NFT.Storage
// ============================================================================

/// NFT.Storage: bearer token auth, raw JSON body, CID at `value.cid`.
pub struct NftStorageProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NftStorageResponse {
    value: NftStorageValue,
}

#[derive(Debug, Deserialize)]
struct NftStorageValue {
    cid: String,
}

impl NftStorageProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ContentProvider for NftStorageProvider {
    fn name(&self) -> &str {
        "nft.storage"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn pin_json(&self, _document: &MetadataDocument, bytes: &[u8]) -> Result<String, ContentError> {
        let api_key = self.api_key.as_ref().ok_or(ContentError::NotConfigured)?;

        let response = self
            .client
            .post(self.upload_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let parsed: NftStorageResponse = response
            .json()
            .await
            .map_err(|e| ContentError::InvalidResponse(e.to_string()))?;
        ipfs_pointer(&parsed.value.cid)
    }
}

// ============================================================================
// Pinata
// ============================================================================

/// Pinata: key/secret header pair, `pinJSONToIPFS` envelope, CID at `IpfsHash`.
pub struct PinataProvider {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinataRequest<'a> {
    pinata_content: &'a MetadataDocument,
    pinata_metadata: PinataMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct PinataMetadata<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct PinataResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataProvider {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        secret_api_key: Option<String>,
    ) -> Self {
        let credentials = match (api_key, secret_api_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Some((key, secret)),
            _ => None,
        };
        Self {
            client,
            base_url: base_url.into(),
            credentials,
        }
    }

    fn pin_url(&self) -> String {
        format!("{}/pinning/pinJSONToIPFS", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ContentProvider for PinataProvider {
    fn name(&self) -> &str {
        "pinata"
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn pin_json(&self, document: &MetadataDocument, _bytes: &[u8]) -> Result<String, ContentError> {
        let (key, secret) = self.credentials.as_ref().ok_or(ContentError::NotConfigured)?;

        let body = PinataRequest {
            pinata_content: document,
            pinata_metadata: PinataMetadata {
                name: &document.name,
            },
        };

        let response = self
            .client
            .post(self.pin_url())
            .header("pinata_api_key", key)
            .header("pinata_secret_api_key", secret)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let parsed: PinataResponse = response
            .json()
            .await
            .map_err(|e| ContentError::InvalidResponse(e.to_string()))?;
        ipfs_pointer(&parsed.ipfs_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::document::{canonical_bytes, canonicalize, CertificateFields, DocumentTemplate};
    use chrono::Utc;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn document() -> MetadataDocument {
        let fields = CertificateFields {
            course_name: "Distributed Systems".into(),
            issuer_name: "Example University".into(),
            student_name: None,
            completion_date: Utc::now(),
            expiration_date: None,
            token_id: None,
        };
        canonicalize(&fields, &DocumentTemplate::default()).unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_providers_skip() {
        let nft = NftStorageProvider::new(Client::new(), DEFAULT_NFT_STORAGE_URL, Some(String::new()));
        let pinata = PinataProvider::new(Client::new(), DEFAULT_PINATA_URL, Some("key".into()), None);
        assert!(!nft.is_configured());
        assert!(!pinata.is_configured());

        let doc = document();
        assert!(matches!(
            nft.pin_json(&doc, b"{}").await,
            Err(ContentError::NotConfigured)
        ));
        assert!(matches!(
            pinata.pin_json(&doc, b"{}").await,
            Err(ContentError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_nft_storage_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true, "value": {"cid": "bafyNft"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = NftStorageProvider::new(Client::new(), server.uri(), Some("secret-token".into()));
        let doc = document();
        let pointer = provider
            .pin_json(&doc, &canonical_bytes(&doc).unwrap())
            .await
            .unwrap();
        assert_eq!(pointer, "ipfs://bafyNft");
    }

    #[tokio::test]
    async fn test_pinata_envelope_and_headers() {
        let server = MockServer::start().await;
        let doc = document();
        Mock::given(method("POST"))
            .and(path("/pinning/pinJSONToIPFS"))
            .and(header("pinata_api_key", "k"))
            .and(header("pinata_secret_api_key", "s"))
            .and(body_json(serde_json::json!({
                "pinataContent": doc,
                "pinataMetadata": {"name": "Certificate: Distributed Systems"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"IpfsHash": "QmPinata"})),
            )
            .mount(&server)
            .await;

        let provider = PinataProvider::new(Client::new(), server.uri(), Some("k".into()), Some("s".into()));
        let pointer = provider.pin_json(&doc, b"").await.unwrap();
        assert_eq!(pointer, "ipfs://QmPinata");
    }

    #[tokio::test]
    async fn test_rejection_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = NftStorageProvider::new(Client::new(), server.uri(), Some("nope".into()));
        match provider.pin_json(&document(), b"{}").await {
            Err(ContentError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
