//! Role-based access control
//!
//! - **PermissionStore**: authoritative administrator/issuer sets
//! - **RoleQuery**: read seam over whatever holds the authoritative sets
//! - **PermissionCache**: TTL-bounded snapshots of role checks

pub mod cache;
pub mod roles;

use async_trait::async_trait;

use crate::types::{Address, Result, Role};

pub use cache::{PermissionCache, RoleCheck, DEFAULT_ROLE_CACHE_TTL};
pub use roles::{PermissionStore, RoleChange};

/// Answers role membership queries against the ledger.
#[async_trait]
pub trait RoleQuery: Send + Sync {
    async fn has_role(&self, role: Role, account: &Address) -> Result<bool>;
}
