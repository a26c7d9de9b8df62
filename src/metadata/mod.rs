//! Off-ledger certificate metadata
//!
//! Documents are canonicalized in [`document`], uploaded through ordered
//! [`provider`]s, fetched through ordered [`gateway`]s and cached in the
//! [`local`] content store. [`bridge::MetadataBridge`] composes them.

pub mod bridge;
pub mod document;
pub mod gateway;
pub mod local;
pub mod provider;

pub use bridge::{
    BridgeConfig, BridgeStatsSnapshot, MetadataBridge, StoreSource, StoredMetadata,
    DEFAULT_GATEWAY_TIMEOUT, DEFAULT_PROVIDER_TIMEOUT,
};
pub use document::{
    canonical_bytes, canonicalize, Attribute, AttributeValue, CertificateFields, DocumentTemplate,
    MetadataDocument,
};
pub use gateway::{ContentGateway, HttpGateway, DEFAULT_GATEWAYS};
pub use local::{content_path, content_pointer, LocalContentStore};
pub use provider::{ContentError, ContentProvider, NftStorageProvider, PinataProvider};
