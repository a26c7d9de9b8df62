//! Configuration for the certificate bridge
//!
//! CLI arguments and environment variable handling using clap. A `.env`
//! file is loaded by the binary before parsing.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::metadata::gateway::CID_PLACEHOLDER;
use crate::metadata::provider::{DEFAULT_NFT_STORAGE_URL, DEFAULT_PINATA_URL};
use crate::metadata::{
    BridgeConfig, CertificateFields, DocumentTemplate, HttpGateway, LocalContentStore,
    MetadataBridge, NftStorageProvider, PinataProvider, DEFAULT_GATEWAYS,
};
use crate::metadata::document::{DEFAULT_CERTIFICATE_IMAGE, DEFAULT_VERIFY_BASE_URL};
use crate::types::{Result, TokenId};

/// Certificate registry and metadata resolution bridge
#[derive(Parser, Debug, Clone)]
#[command(name = "certificate-bridge")]
#[command(about = "Issue, store and resolve course completion certificates")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Content storage configuration
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Role check cache TTL in seconds
    #[arg(long, env = "ROLE_CACHE_TTL_SECS", default_value = "60")]
    pub role_cache_ttl_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Pinning providers, retrieval gateways and the local content store
#[derive(Parser, Debug, Clone)]
pub struct StorageArgs {
    /// NFT.Storage API key (provider skipped when unset)
    #[arg(long, env = "NFT_STORAGE_KEY")]
    pub nft_storage_key: Option<String>,

    #[arg(long, env = "NFT_STORAGE_URL", default_value = DEFAULT_NFT_STORAGE_URL)]
    pub nft_storage_url: String,

    /// Pinata API key (requires PINATA_SECRET_API_KEY)
    #[arg(long, env = "PINATA_API_KEY")]
    pub pinata_api_key: Option<String>,

    #[arg(long, env = "PINATA_SECRET_API_KEY")]
    pub pinata_secret_api_key: Option<String>,

    #[arg(long, env = "PINATA_URL", default_value = DEFAULT_PINATA_URL)]
    pub pinata_url: String,

    /// Comma-separated gateway URL templates containing {cid}
    #[arg(long, env = "IPFS_GATEWAYS", value_delimiter = ',')]
    pub ipfs_gateways: Vec<String>,

    /// Per-attempt gateway timeout in milliseconds
    #[arg(long, env = "GATEWAY_TIMEOUT_MS", default_value = "10000")]
    pub gateway_timeout_ms: u64,

    /// Per-attempt provider upload timeout in milliseconds
    #[arg(long, env = "PROVIDER_TIMEOUT_MS", default_value = "30000")]
    pub provider_timeout_ms: u64,

    /// Directory for persisting locally stored documents (memory only when unset)
    #[arg(long, env = "METADATA_CACHE_DIR")]
    pub metadata_cache_dir: Option<PathBuf>,

    /// Certificate artwork pointer stamped into every document
    #[arg(long, env = "CERTIFICATE_IMAGE", default_value = DEFAULT_CERTIFICATE_IMAGE)]
    pub certificate_image: String,

    /// Verification page base URL
    #[arg(long, env = "VERIFY_BASE_URL", default_value = DEFAULT_VERIFY_BASE_URL)]
    pub verify_base_url: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Canonicalize and upload a certificate document, printing its pointer
    Store(CertificateArgs),

    /// Resolve a metadata pointer and print the document
    Resolve {
        /// Pointer such as ipfs://<cid>
        pointer: String,
    },

    /// Deploy an in-memory registry, issue certificates and print the issuer report
    Demo {
        /// Number of certificates to issue
        #[arg(long, default_value = "3")]
        certificates: u8,

        #[command(flatten)]
        certificate: CertificateArgs,
    },
}

/// Certificate fields as entered on the command line
#[derive(Parser, Debug, Clone)]
pub struct CertificateArgs {
    #[arg(long, default_value = "Blockchain 101")]
    pub course: String,

    #[arg(long, default_value = "Example University")]
    pub issuer: String,

    #[arg(long)]
    pub student: Option<String>,

    /// Completion date (YYYY-MM-DD or RFC 3339); defaults to now
    #[arg(long, value_parser = parse_date)]
    pub completed: Option<DateTime<Utc>>,

    /// Expiration date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date)]
    pub expires: Option<DateTime<Utc>>,

    #[arg(long)]
    pub token_id: Option<TokenId>,
}

impl CertificateArgs {
    pub fn to_fields(&self) -> CertificateFields {
        CertificateFields {
            course_name: self.course.clone(),
            issuer_name: self.issuer.clone(),
            student_name: self.student.clone(),
            completion_date: self.completed.unwrap_or_else(Utc::now),
            expiration_date: self.expires,
            token_id: self.token_id,
        }
    }
}

/// Accept a calendar date (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid date '{raw}': {e}"))
}

impl StorageArgs {
    /// Configured gateways, or the public defaults when none are set.
    pub fn gateway_list(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .ipfs_gateways
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        if configured.is_empty() {
            DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect()
        } else {
            configured
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            gateway_timeout: Duration::from_millis(self.gateway_timeout_ms),
            provider_timeout: Duration::from_millis(self.provider_timeout_ms),
            template: DocumentTemplate {
                image: self.certificate_image.clone(),
                verify_base_url: self.verify_base_url.clone(),
            },
        }
    }

    /// Assemble the bridge: NFT.Storage then Pinata, gateways in configured
    /// order, local store on disk when a directory is set.
    pub async fn build_bridge(&self) -> Result<MetadataBridge> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("certificate-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        let local = match &self.metadata_cache_dir {
            Some(dir) => LocalContentStore::open(dir).await?,
            None => LocalContentStore::in_memory(),
        };

        let mut bridge = MetadataBridge::new(self.bridge_config(), local)
            .with_provider(Arc::new(NftStorageProvider::new(
                client.clone(),
                self.nft_storage_url.clone(),
                self.nft_storage_key.clone(),
            )))
            .with_provider(Arc::new(PinataProvider::new(
                client.clone(),
                self.pinata_url.clone(),
                self.pinata_api_key.clone(),
                self.pinata_secret_api_key.clone(),
            )));

        for template in self.gateway_list() {
            bridge = bridge.with_gateway(Arc::new(HttpGateway::new(client.clone(), template)?));
        }

        Ok(bridge)
    }
}

impl Args {
    pub fn role_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.role_cache_ttl_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        let storage = &self.storage;

        if storage.gateway_timeout_ms == 0 {
            return Err("GATEWAY_TIMEOUT_MS must be greater than zero".to_string());
        }
        if storage.provider_timeout_ms == 0 {
            return Err("PROVIDER_TIMEOUT_MS must be greater than zero".to_string());
        }
        if self.role_cache_ttl_secs == 0 {
            return Err("ROLE_CACHE_TTL_SECS must be greater than zero".to_string());
        }

        for gateway in storage.gateway_list() {
            if !gateway.starts_with("http://") && !gateway.starts_with("https://") {
                return Err(format!("Gateway must be an http(s) URL: {gateway}"));
            }
            if !gateway.contains(CID_PLACEHOLDER) {
                return Err(format!("Gateway template is missing {CID_PLACEHOLDER}: {gateway}"));
            }
        }

        let has_key = storage.pinata_api_key.as_deref().is_some_and(|k| !k.is_empty());
        let has_secret = storage
            .pinata_secret_api_key
            .as_deref()
            .is_some_and(|k| !k.is_empty());
        if has_key != has_secret {
            return Err(
                "PINATA_API_KEY and PINATA_SECRET_API_KEY must be set together".to_string(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["certificate-bridge"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["resolve", "ipfs://bafyabc"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.role_cache_ttl(), Duration::from_secs(60));
        assert_eq!(args.storage.gateway_list().len(), 3);

        let config = args.storage.bridge_config();
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.template, DocumentTemplate::default());
        assert!(matches!(args.command, Command::Resolve { ref pointer } if pointer == "ipfs://bafyabc"));
    }

    #[test]
    fn test_gateway_list_parsing() {
        let args = parse(&[
            "--ipfs-gateways",
            "http://localhost:8080/ipfs/{cid}, https://dweb.link/ipfs/{cid}",
            "resolve",
            "ipfs://x",
        ]);
        assert_eq!(
            args.storage.gateway_list(),
            vec![
                "http://localhost:8080/ipfs/{cid}".to_string(),
                "https://dweb.link/ipfs/{cid}".to_string(),
            ]
        );
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let args = parse(&["--gateway-timeout-ms", "0", "resolve", "ipfs://x"]);
        assert!(args.validate().unwrap_err().contains("GATEWAY_TIMEOUT_MS"));

        let args = parse(&["--ipfs-gateways", "https://ipfs.io/ipfs/", "resolve", "ipfs://x"]);
        assert!(args.validate().unwrap_err().contains("{cid}"));

        let args = parse(&["--pinata-api-key", "k", "resolve", "ipfs://x"]);
        assert!(args.validate().unwrap_err().contains("PINATA"));
    }

    #[test]
    fn test_store_fields() {
        let args = parse(&[
            "store",
            "--course",
            "Rust",
            "--issuer",
            "Ferris Academy",
            "--completed",
            "2024-01-15",
            "--expires",
            "2026-01-15T00:00:00Z",
        ]);
        let Command::Store(cert) = args.command else {
            panic!("expected store command");
        };
        let fields = cert.to_fields();
        assert_eq!(fields.course_name, "Rust");
        assert_eq!(fields.completion_date.timestamp(), 1_705_276_800);
        assert!(fields.expiration_date.is_some());
        assert!(fields.student_name.is_none());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("15/01/2024").is_err());
    }
}
