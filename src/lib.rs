//! Certificate Bridge - course completion certificates on a ledger
//!
//! A registry maps sequential certificate ids to an owner and an immutable
//! pointer to an off-ledger metadata document, guarded by administrator and
//! issuer roles. The metadata bridge stores and resolves those documents
//! through ordered pinning providers and retrieval gateways.
//!
//! ## Components
//!
//! - **Registry**: issue/read state machine with ledger events
//! - **Auth**: permission store and TTL-bounded permission cache
//! - **Metadata**: document canonicalization, providers, gateways, local store
//! - **Services**: issuer reports, issue workflow, verification

pub mod auth;
pub mod cache;
pub mod config;
pub mod metadata;
pub mod registry;
pub mod services;
pub mod types;

pub use config::Args;
pub use types::{Address, CertificateError, Result, Role, TokenId};
