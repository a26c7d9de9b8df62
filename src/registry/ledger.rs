//! Async ledger facade over the registry state machine
//!
//! [`Registry`] serializes every mutation through a single write lock, which
//! stands in for the total ordering the ledger provides. Reads run
//! concurrently. [`LedgerReader`] is the read seam consumed by the aggregator
//! and verifier, so they can run against any backing ledger.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::events::{IssuanceFilter, IssuanceRecord, LedgerEvent, TransferFilter, TransferRecord, TxReceipt};
use super::state::{CertificateToken, RegistryState};
use super::{REGISTRY_NAME, REGISTRY_SYMBOL};
use crate::auth::RoleQuery;
use crate::types::{Address, Result, Role, TokenId};

/// Read-only view of the certificate ledger.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Current owner. Fails with `TokenNotFound` for ids that do not resolve.
    async fn owner_of(&self, id: TokenId) -> Result<Address>;

    /// Metadata pointer (`tokenURI`).
    async fn token_uri(&self, id: TokenId) -> Result<String>;

    /// Issuance history in ledger order.
    async fn issuance_events(&self, filter: &IssuanceFilter) -> Result<Vec<IssuanceRecord>>;

    /// Ownership transfers in ledger order.
    async fn transfer_events(&self, filter: &TransferFilter) -> Result<Vec<TransferRecord>>;
}

/// Result of a successful `issueCertificate` transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReceipt {
    pub token_id: TokenId,
    pub receipt: TxReceipt,
}

/// In-process certificate registry.
pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    /// Deploy a registry; `deployer` holds both roles.
    pub fn deploy(deployer: Address) -> Self {
        info!(%deployer, "Deploying certificate registry");
        Self {
            state: RwLock::new(RegistryState::deploy(deployer)),
        }
    }

    pub fn name(&self) -> &'static str {
        REGISTRY_NAME
    }

    pub fn symbol(&self) -> &'static str {
        REGISTRY_SYMBOL
    }

    pub async fn issue_certificate(
        &self,
        caller: &Address,
        recipient: &Address,
        pointer: &str,
    ) -> Result<IssueReceipt> {
        let mut state = self.state.write().await;
        match state.issue(caller, recipient, pointer) {
            Ok((token_id, receipt)) => {
                info!(
                    token_id,
                    %recipient,
                    issuer = %caller,
                    pointer,
                    block = receipt.block_number,
                    "Certificate issued"
                );
                Ok(IssueReceipt { token_id, receipt })
            }
            Err(e) => {
                warn!(issuer = %caller, %recipient, error = %e, "Certificate issue rejected");
                Err(e)
            }
        }
    }

    pub async fn grant_role(
        &self,
        role: Role,
        account: &Address,
        caller: &Address,
    ) -> Result<Option<TxReceipt>> {
        let receipt = self.state.write().await.grant_role(role, account, caller)?;
        if receipt.is_some() {
            info!(%role, %account, sender = %caller, "Role granted");
        }
        Ok(receipt)
    }

    pub async fn revoke_role(
        &self,
        role: Role,
        account: &Address,
        caller: &Address,
    ) -> Result<Option<TxReceipt>> {
        let receipt = self.state.write().await.revoke_role(role, account, caller)?;
        if receipt.is_some() {
            info!(%role, %account, sender = %caller, "Role revoked");
        }
        Ok(receipt)
    }

    pub async fn certificate(&self, id: TokenId) -> Result<CertificateToken> {
        self.state.read().await.token(id).cloned()
    }

    pub async fn current_token_id(&self) -> TokenId {
        self.state.read().await.current_token_id()
    }

    pub async fn block_number(&self) -> u64 {
        self.state.read().await.block_number()
    }

    pub async fn role_members(&self, role: Role) -> Vec<Address> {
        self.state.read().await.role_members(role)
    }

    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.state.read().await.events().to_vec()
    }
}

#[async_trait]
impl LedgerReader for Registry {
    async fn owner_of(&self, id: TokenId) -> Result<Address> {
        self.state.read().await.owner_of(id)
    }

    async fn token_uri(&self, id: TokenId) -> Result<String> {
        self.state.read().await.token_uri(id)
    }

    async fn issuance_events(&self, filter: &IssuanceFilter) -> Result<Vec<IssuanceRecord>> {
        Ok(self.state.read().await.issuance_events(filter))
    }

    async fn transfer_events(&self, filter: &TransferFilter) -> Result<Vec<TransferRecord>> {
        Ok(self.state.read().await.transfer_events(filter))
    }
}

#[async_trait]
impl RoleQuery for Registry {
    async fn has_role(&self, role: Role, account: &Address) -> Result<bool> {
        Ok(self.state.read().await.has_role(role, account))
    }
}
