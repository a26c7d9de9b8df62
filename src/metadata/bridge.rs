//! Metadata Bridge - ordered provider/gateway fallback with a local cache
//!
//! ## Upload (`store`)
//!
//! 1. Canonicalize the certificate into a [`MetadataDocument`]
//! 2. Try each configured pinning provider in order; first success wins
//! 3. If every provider fails, content-address the canonical bytes and keep
//!    the document in the local store. Only a local persistence failure
//!    surfaces as `ProviderUnavailable`.
//!
//! ## Fetch (`resolve`)
//!
//! 1. Local store hit returns immediately
//! 2. Otherwise try each gateway in order, each attempt bounded by the
//!    gateway timeout; first success wins and is cached
//! 3. All gateways failed: `GatewayExhausted`
//!
//! Attempts never retry. Every failure is recorded as an [`AttemptFailure`].

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::document::{canonical_bytes, canonicalize, CertificateFields, DocumentTemplate, MetadataDocument};
use super::gateway::ContentGateway;
use super::local::{content_path, content_pointer, LocalContentStore};
use super::provider::{ContentError, ContentProvider};
use crate::types::{AttemptFailure, CertificateError, Result};

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bound on a single gateway fetch (default: 10s)
    pub gateway_timeout: Duration,
    /// Bound on a single provider upload (default: 30s)
    pub provider_timeout: Duration,
    pub template: DocumentTemplate,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            template: DocumentTemplate::default(),
        }
    }
}

// ============================================================================
// Results and stats
// ============================================================================

/// Where a stored document ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum StoreSource {
    Provider(String),
    LocalFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredMetadata {
    pub pointer: String,
    pub document: MetadataDocument,
    pub source: StoreSource,
    /// Provider attempts that failed before `source` succeeded
    pub failures: Vec<AttemptFailure>,
}

impl StoredMetadata {
    pub fn is_fallback(&self) -> bool {
        self.source == StoreSource::LocalFallback
    }
}

#[derive(Debug, Default)]
struct BridgeStats {
    provider_uploads: DashMap<String, AtomicU64>,
    fallback_uploads: AtomicU64,
    cache_hits: AtomicU64,
    gateway_fetches: AtomicU64,
    gateway_failures: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStatsSnapshot {
    pub provider_uploads: BTreeMap<String, u64>,
    pub fallback_uploads: u64,
    pub cache_hits: u64,
    pub gateway_fetches: u64,
    pub gateway_failures: u64,
}

// ============================================================================
// Bridge
// ============================================================================

pub struct MetadataBridge {
    providers: Vec<Arc<dyn ContentProvider>>,
    gateways: Vec<Arc<dyn ContentGateway>>,
    local: LocalContentStore,
    config: BridgeConfig,
    stats: BridgeStats,
}

impl MetadataBridge {
    /// Bridge with no providers or gateways: uploads fall back locally and
    /// only locally stored pointers resolve.
    pub fn new(config: BridgeConfig, local: LocalContentStore) -> Self {
        Self {
            providers: Vec::new(),
            gateways: Vec::new(),
            local,
            config,
            stats: BridgeStats::default(),
        }
    }

    /// Append a provider to the upload order.
    pub fn with_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Append a gateway to the fetch order.
    pub fn with_gateway(mut self, gateway: Arc<dyn ContentGateway>) -> Self {
        self.gateways.push(gateway);
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn local(&self) -> &LocalContentStore {
        &self.local
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn gateway_names(&self) -> Vec<String> {
        self.gateways.iter().map(|g| g.name().to_string()).collect()
    }

    /// Canonicalize and upload a certificate document.
    pub async fn store(&self, fields: &CertificateFields) -> Result<StoredMetadata> {
        let document = canonicalize(fields, &self.config.template)?;
        self.store_document(document).await
    }

    /// Upload an already-canonical document.
    pub async fn store_document(&self, document: MetadataDocument) -> Result<StoredMetadata> {
        let bytes = canonical_bytes(&document)?;
        let mut failures = Vec::new();

        for provider in &self.providers {
            let name = provider.name();
            if !provider.is_configured() {
                debug!(provider = name, "Skipping unconfigured provider");
                failures.push(AttemptFailure::new(name, ContentError::NotConfigured.to_string()));
                continue;
            }

            let attempt = timeout(self.config.provider_timeout, provider.pin_json(&document, &bytes))
                .await
                .unwrap_or(Err(ContentError::Timeout(self.config.provider_timeout)));

            match attempt {
                Ok(pointer) => {
                    // Cache so resolve does not round-trip through a gateway
                    if let Err(e) = self.local.put(&pointer, &document).await {
                        warn!(provider = name, pointer = %pointer, error = %e, "Failed to cache pinned document");
                    }
                    self.stats
                        .provider_uploads
                        .entry(name.to_string())
                        .or_default()
                        .fetch_add(1, Ordering::Relaxed);
                    info!(provider = name, pointer = %pointer, "Pinned certificate metadata");
                    return Ok(StoredMetadata {
                        pointer,
                        document,
                        source: StoreSource::Provider(name.to_string()),
                        failures,
                    });
                }
                Err(e) => {
                    warn!(provider = name, error = %e, "Provider upload failed");
                    failures.push(AttemptFailure::new(name, e.to_string()));
                }
            }
        }

        let pointer = content_pointer(&bytes);
        if let Err(e) = self.local.put(&pointer, &document).await {
            return Err(CertificateError::ProviderUnavailable {
                reason: format!("local fallback could not persist: {e}"),
                attempts: failures,
            });
        }

        self.stats.fallback_uploads.fetch_add(1, Ordering::Relaxed);
        info!(
            pointer = %pointer,
            failed_providers = failures.len(),
            "Stored certificate metadata in local content store"
        );

        Ok(StoredMetadata {
            pointer,
            document,
            source: StoreSource::LocalFallback,
            failures,
        })
    }

    /// Resolve a pointer to its document. Never touches the ledger.
    pub async fn resolve(&self, pointer: &str) -> Result<MetadataDocument> {
        let path = content_path(pointer)?;

        match self.local.get(pointer).await {
            Ok(Some(document)) => {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(pointer, "Metadata cache hit");
                return Ok(document);
            }
            Ok(None) => debug!(pointer, "Metadata cache miss"),
            Err(e) => warn!(pointer, error = %e, "Local content store read failed"),
        }

        if self.gateways.is_empty() {
            return Err(CertificateError::MetadataNotFound(pointer.to_string()));
        }

        let mut attempts = Vec::new();
        for gateway in &self.gateways {
            let name = gateway.name();
            let fetched = timeout(self.config.gateway_timeout, gateway.fetch(&path))
                .await
                .unwrap_or(Err(ContentError::Timeout(self.config.gateway_timeout)))
                .and_then(|bytes| {
                    serde_json::from_slice::<MetadataDocument>(&bytes)
                        .map_err(|e| ContentError::InvalidResponse(e.to_string()))
                });

            match fetched {
                Ok(document) => {
                    self.stats.gateway_fetches.fetch_add(1, Ordering::Relaxed);
                    if let Err(e) = self.local.put(pointer, &document).await {
                        warn!(pointer, error = %e, "Failed to cache fetched document");
                    }
                    info!(pointer, gateway = name, "Resolved certificate metadata");
                    return Ok(document);
                }
                Err(e) => {
                    self.stats.gateway_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(pointer, gateway = name, error = %e, "Gateway fetch failed");
                    attempts.push(AttemptFailure::new(name, e.to_string()));
                }
            }
        }

        Err(CertificateError::GatewayExhausted {
            pointer: pointer.to_string(),
            attempts,
        })
    }

    pub fn stats(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            provider_uploads: self
                .stats
                .provider_uploads
                .iter()
                .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
                .collect(),
            fallback_uploads: self.stats.fallback_uploads.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            gateway_fetches: self.stats.gateway_fetches.load(Ordering::Relaxed),
            gateway_failures: self.stats.gateway_failures.load(Ordering::Relaxed),
        }
    }
}
