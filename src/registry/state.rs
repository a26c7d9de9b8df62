//! Registry state machine
//!
//! Token ids move `Unassigned -> Minted` and never back. Every mutating
//! operation validates all of its preconditions before touching state, so a
//! failed call leaves the registry exactly as it was.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::events::{
    IssuanceFilter, IssuanceRecord, LedgerEvent, RoleRecord, TransferFilter, TransferRecord,
    TxReceipt,
};
use crate::auth::{PermissionStore, RoleChange};
use crate::types::{Address, CertificateError, Result, Role, TokenId};

/// A minted certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateToken {
    pub id: TokenId,
    pub owner: Address,
    /// Immutable once minted
    pub pointer: String,
    pub issuer: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryState {
    permissions: PermissionStore,
    tokens: BTreeMap<TokenId, CertificateToken>,
    last_token_id: TokenId,
    block_number: u64,
    events: Vec<LedgerEvent>,
}

impl RegistryState {
    /// Deploy a fresh registry. The deployer becomes administrator and issuer.
    pub fn deploy(deployer: Address) -> Self {
        let mut state = Self {
            permissions: PermissionStore::bootstrap(deployer),
            tokens: BTreeMap::new(),
            last_token_id: 0,
            block_number: 0,
            events: Vec::new(),
        };

        let deployer_hex = deployer.to_string();
        let receipt = state.next_receipt("deploy", &[deployer_hex.as_str()]);
        for role in Role::ALL {
            state.events.push(LedgerEvent::RoleGranted(RoleRecord {
                role,
                account: deployer,
                sender: deployer,
                block_number: receipt.block_number,
                tx_hash: receipt.tx_hash.clone(),
            }));
        }
        state
    }

    fn next_receipt(&mut self, kind: &str, payload: &[&str]) -> TxReceipt {
        self.block_number += 1;
        TxReceipt::derive(self.block_number, kind, payload)
    }

    /// Mint the next certificate to `recipient`.
    pub fn issue(
        &mut self,
        caller: &Address,
        recipient: &Address,
        pointer: &str,
    ) -> Result<(TokenId, TxReceipt)> {
        self.permissions.require(Role::Minter, caller)?;
        if recipient.is_zero() {
            return Err(CertificateError::InvalidRecipient(
                "Cannot mint to zero address".to_string(),
            ));
        }
        if pointer.trim().is_empty() {
            return Err(CertificateError::EmptyPointer);
        }

        let token_id = self.last_token_id + 1;
        let (recipient_hex, caller_hex) = (recipient.to_string(), caller.to_string());
        let receipt = self.next_receipt(
            "issueCertificate",
            &[recipient_hex.as_str(), pointer, caller_hex.as_str()],
        );

        self.last_token_id = token_id;
        self.tokens.insert(
            token_id,
            CertificateToken {
                id: token_id,
                owner: *recipient,
                pointer: pointer.to_string(),
                issuer: *caller,
            },
        );
        self.events.push(LedgerEvent::Transfer(TransferRecord {
            from: Address::ZERO,
            to: *recipient,
            token_id,
            block_number: receipt.block_number,
            tx_hash: receipt.tx_hash.clone(),
        }));
        self.events
            .push(LedgerEvent::CertificateIssued(IssuanceRecord {
                token_id,
                recipient: *recipient,
                issuer: *caller,
                pointer: pointer.to_string(),
                block_number: receipt.block_number,
                tx_hash: receipt.tx_hash.clone(),
            }));

        Ok((token_id, receipt))
    }

    /// Grant `role` to `account`. Granting a held role is a no-op (no receipt).
    pub fn grant_role(
        &mut self,
        role: Role,
        account: &Address,
        caller: &Address,
    ) -> Result<Option<TxReceipt>> {
        if self.permissions.check_grant(role, account, caller)? == RoleChange::Unchanged {
            return Ok(None);
        }
        let (account_hex, caller_hex) = (account.to_string(), caller.to_string());
        let receipt = self.next_receipt(
            "grantRole",
            &[role.identifier(), account_hex.as_str(), caller_hex.as_str()],
        );
        self.permissions.grant(role, *account, caller)?;
        self.events.push(LedgerEvent::RoleGranted(RoleRecord {
            role,
            account: *account,
            sender: *caller,
            block_number: receipt.block_number,
            tx_hash: receipt.tx_hash.clone(),
        }));
        Ok(Some(receipt))
    }

    /// Revoke `role` from `account`. Revoking an absent role is a no-op.
    pub fn revoke_role(
        &mut self,
        role: Role,
        account: &Address,
        caller: &Address,
    ) -> Result<Option<TxReceipt>> {
        if self.permissions.check_revoke(role, account, caller)? == RoleChange::Unchanged {
            return Ok(None);
        }
        let (account_hex, caller_hex) = (account.to_string(), caller.to_string());
        let receipt = self.next_receipt(
            "revokeRole",
            &[role.identifier(), account_hex.as_str(), caller_hex.as_str()],
        );
        self.permissions.revoke(role, account, caller)?;
        self.events.push(LedgerEvent::RoleRevoked(RoleRecord {
            role,
            account: *account,
            sender: *caller,
            block_number: receipt.block_number,
            tx_hash: receipt.tx_hash.clone(),
        }));
        Ok(Some(receipt))
    }

    pub fn token(&self, id: TokenId) -> Result<&CertificateToken> {
        self.tokens
            .get(&id)
            .ok_or(CertificateError::TokenNotFound(id))
    }

    pub fn owner_of(&self, id: TokenId) -> Result<Address> {
        self.token(id).map(|t| t.owner)
    }

    pub fn token_uri(&self, id: TokenId) -> Result<String> {
        self.token(id).map(|t| t.pointer.clone())
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.permissions.has_role(role, account)
    }

    pub fn role_members(&self, role: Role) -> Vec<Address> {
        self.permissions.members(role)
    }

    /// Highest id assigned so far; 0 before the first issue.
    pub fn current_token_id(&self) -> TokenId {
        self.last_token_id
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn issuance_events(&self, filter: &IssuanceFilter) -> Vec<IssuanceRecord> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::CertificateIssued(record) if filter.matches(record) => {
                    Some(record.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn transfer_events(&self, filter: &TransferFilter) -> Vec<TransferRecord> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::Transfer(record) if filter.matches(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }
}
