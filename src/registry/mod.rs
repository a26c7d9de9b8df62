//! Certificate registry
//!
//! Sequential ids mapped to an owner and an immutable metadata pointer,
//! guarded by the administrator/issuer permission model.
//!
//! ## Operations
//!
//! - `issue_certificate(caller, recipient, pointer)` -> `(id, receipt)`
//! - `owner_of(id)`, `token_uri(id)` -> pure reads, `TokenNotFound` otherwise
//! - `grant_role` / `revoke_role` -> administrator only
//! - issuance and transfer event streams, filterable by indexed arguments

pub mod events;
pub mod ledger;
pub mod state;

pub use events::{
    IssuanceFilter, IssuanceRecord, LedgerEvent, RoleRecord, TransferFilter, TransferRecord,
    TxReceipt,
};
pub use ledger::{IssueReceipt, LedgerReader, Registry};
pub use state::{CertificateToken, RegistryState};

/// Collection name reported by the registry.
pub const REGISTRY_NAME: &str = "LinkedIn Proof Certificate";

/// Collection symbol reported by the registry.
pub const REGISTRY_SYMBOL: &str = "CERT";
