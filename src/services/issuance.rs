//! Issue workflow: validate, pre-authorize, upload metadata, mint
//!
//! The role pre-check goes through the permission cache so a caller without
//! issuer rights fails before any upload. The registry re-checks the role
//! authoritatively when minting, so a stale cached grant can at worst cost
//! one wasted upload.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::PermissionCache;
use crate::metadata::{CertificateFields, MetadataBridge, StoredMetadata};
use crate::registry::{Registry, TxReceipt};
use crate::types::{Address, CertificateError, Result, Role, TokenId};

#[derive(Debug, Clone, Serialize)]
pub struct IssuedCertificateReceipt {
    pub token_id: TokenId,
    pub recipient: Address,
    pub receipt: TxReceipt,
    pub metadata: StoredMetadata,
}

pub struct CertificateIssuer {
    registry: Arc<Registry>,
    permissions: Arc<PermissionCache>,
    bridge: Arc<MetadataBridge>,
}

/// Parse a user-supplied recipient. Malformed and zero addresses are both
/// `InvalidRecipient`.
pub fn parse_recipient(raw: &str) -> Result<Address> {
    let address: Address = raw
        .parse()
        .map_err(|e: CertificateError| CertificateError::InvalidRecipient(e.to_string()))?;
    if address.is_zero() {
        return Err(CertificateError::InvalidRecipient(
            "Cannot mint to zero address".into(),
        ));
    }
    Ok(address)
}

impl CertificateIssuer {
    pub fn new(
        registry: Arc<Registry>,
        permissions: Arc<PermissionCache>,
        bridge: Arc<MetadataBridge>,
    ) -> Self {
        Self {
            registry,
            permissions,
            bridge,
        }
    }

    async fn preauthorize(&self, caller: &Address) -> Result<()> {
        if !self.permissions.check(Role::Minter, caller).await? {
            warn!(%caller, "Issue rejected by cached role check");
            return Err(CertificateError::AccessDenied {
                role: Role::Minter,
                account: *caller,
            });
        }
        Ok(())
    }

    /// Full workflow for a certificate described by `fields`.
    pub async fn issue(
        &self,
        caller: &Address,
        recipient: &str,
        fields: &CertificateFields,
    ) -> Result<IssuedCertificateReceipt> {
        let recipient = parse_recipient(recipient)?;
        self.preauthorize(caller).await?;

        let metadata = self.bridge.store(fields).await?;
        let issued = self
            .registry
            .issue_certificate(caller, &recipient, &metadata.pointer)
            .await?;

        info!(
            token_id = issued.token_id,
            %recipient,
            pointer = %metadata.pointer,
            tx_hash = %issued.receipt.tx_hash,
            "Issued certificate"
        );

        Ok(IssuedCertificateReceipt {
            token_id: issued.token_id,
            recipient,
            receipt: issued.receipt,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DEFAULT_ROLE_CACHE_TTL;
    use crate::metadata::{BridgeConfig, LocalContentStore};
    use crate::registry::LedgerReader;
    use chrono::Utc;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn fields() -> CertificateFields {
        CertificateFields {
            course_name: "Blockchain 101".into(),
            issuer_name: "Example University".into(),
            student_name: None,
            completion_date: Utc::now(),
            expiration_date: None,
            token_id: None,
        }
    }

    fn issuer() -> (Arc<Registry>, Arc<MetadataBridge>, CertificateIssuer) {
        let registry = Arc::new(Registry::deploy(addr(1)));
        let permissions = Arc::new(PermissionCache::new(registry.clone(), DEFAULT_ROLE_CACHE_TTL));
        let bridge = Arc::new(MetadataBridge::new(
            BridgeConfig::default(),
            LocalContentStore::in_memory(),
        ));
        let issuer = CertificateIssuer::new(registry.clone(), permissions, bridge.clone());
        (registry, bridge, issuer)
    }

    #[test]
    fn test_parse_recipient() {
        assert!(parse_recipient("0x00000000000000000000000000000000000000aa").is_ok());
        assert!(matches!(
            parse_recipient("0x0000000000000000000000000000000000000000"),
            Err(CertificateError::InvalidRecipient(_))
        ));
        assert!(matches!(
            parse_recipient("not-an-address"),
            Err(CertificateError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn test_issue_workflow() {
        let (registry, bridge, issuer) = issuer();
        let recipient = addr(9).to_string();

        let issued = issuer.issue(&addr(1), &recipient, &fields()).await.unwrap();
        assert_eq!(issued.token_id, 1);
        assert_eq!(registry.owner_of(1).await.unwrap(), addr(9));
        assert_eq!(registry.token_uri(1).await.unwrap(), issued.metadata.pointer);
        assert_eq!(
            bridge.resolve(&issued.metadata.pointer).await.unwrap(),
            issued.metadata.document
        );
    }

    #[tokio::test]
    async fn test_unauthorized_caller_uploads_nothing() {
        let (registry, bridge, issuer) = issuer();

        let err = issuer
            .issue(&addr(5), &addr(9).to_string(), &fields())
            .await
            .unwrap_err();
        assert!(matches!(err, CertificateError::AccessDenied { .. }));
        assert!(bridge.local().is_empty());
        assert_eq!(registry.current_token_id().await, 0);
    }

    #[tokio::test]
    async fn test_bad_recipient_fails_first() {
        let (_, bridge, issuer) = issuer();
        let err = issuer.issue(&addr(1), "0x1234", &fields()).await.unwrap_err();
        assert!(matches!(err, CertificateError::InvalidRecipient(_)));
        assert!(bridge.local().is_empty());
    }
}
