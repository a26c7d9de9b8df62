//! Retrieval gateways for the fetch path

use async_trait::async_trait;
use reqwest::Client;

use super::provider::ContentError;
use crate::types::{CertificateError, Result};

pub const CID_PLACEHOLDER: &str = "{cid}";

/// Public gateways tried in order when no list is configured.
pub const DEFAULT_GATEWAYS: [&str; 3] = [
    "https://ipfs.io/ipfs/{cid}",
    "https://gateway.pinata.cloud/ipfs/{cid}",
    "https://cloudflare-ipfs.com/ipfs/{cid}",
];

/// An endpoint that maps a content path to its raw bytes.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the content at `path` (a CID with optional sub-path).
    async fn fetch(&self, path: &str) -> std::result::Result<Vec<u8>, ContentError>;
}

/// HTTP gateway addressed by a URL template containing `{cid}`.
pub struct HttpGateway {
    client: Client,
    template: String,
}

impl HttpGateway {
    pub fn new(client: Client, template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(CID_PLACEHOLDER) {
            return Err(CertificateError::InvalidPointer(format!(
                "gateway template is missing {CID_PLACEHOLDER}: {template}"
            )));
        }
        Ok(Self { client, template })
    }

    pub fn url_for(&self, path: &str) -> String {
        self.template.replace(CID_PLACEHOLDER, path)
    }
}

#[async_trait]
impl ContentGateway for HttpGateway {
    fn name(&self) -> &str {
        &self.template
    }

    async fn fetch(&self, path: &str) -> std::result::Result<Vec<u8>, ContentError> {
        let response = self.client.get(self.url_for(path)).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Rejected { status, body });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
