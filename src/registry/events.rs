//! Ledger event records and filters

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Address, Role, TokenId};

/// Handle to the transaction that applied a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
}

impl TxReceipt {
    /// Derive a receipt for the transaction at `block_number`.
    ///
    /// The hash commits to the block height, the operation kind and its
    /// arguments, so distinct transactions never share a hash.
    pub fn derive(block_number: u64, kind: &str, payload: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(block_number.to_be_bytes());
        hasher.update(kind.as_bytes());
        for part in payload {
            hasher.update([0u8]);
            hasher.update(part.as_bytes());
        }
        Self {
            tx_hash: format!("0x{}", hex::encode(hasher.finalize())),
            block_number,
        }
    }
}

/// `CertificateIssued(tokenId, recipient, issuer, tokenURI)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRecord {
    pub token_id: TokenId,
    pub recipient: Address,
    pub issuer: Address,
    pub pointer: String,
    pub block_number: u64,
    pub tx_hash: String,
}

/// `Transfer(from, to, tokenId)`. Mints come from the zero address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub token_id: TokenId,
    pub block_number: u64,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub role: Role,
    pub account: Address,
    pub sender: Address,
    pub block_number: u64,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum LedgerEvent {
    CertificateIssued(IssuanceRecord),
    Transfer(TransferRecord),
    RoleGranted(RoleRecord),
    RoleRevoked(RoleRecord),
}

impl LedgerEvent {
    pub fn block_number(&self) -> u64 {
        match self {
            LedgerEvent::CertificateIssued(r) => r.block_number,
            LedgerEvent::Transfer(r) => r.block_number,
            LedgerEvent::RoleGranted(r) | LedgerEvent::RoleRevoked(r) => r.block_number,
        }
    }
}

/// Indexed-argument filter over issuance events. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuanceFilter {
    pub recipient: Option<Address>,
    pub issuer: Option<Address>,
}

impl IssuanceFilter {
    pub fn by_issuer(issuer: Address) -> Self {
        Self {
            issuer: Some(issuer),
            ..Default::default()
        }
    }

    pub fn by_recipient(recipient: Address) -> Self {
        Self {
            recipient: Some(recipient),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &IssuanceRecord) -> bool {
        self.recipient.map_or(true, |r| r == record.recipient)
            && self.issuer.map_or(true, |i| i == record.issuer)
    }
}

/// Indexed-argument filter over transfer events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferFilter {
    pub from: Option<Address>,
    pub to: Option<Address>,
}

impl TransferFilter {
    pub fn to(owner: Address) -> Self {
        Self {
            to: Some(owner),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &TransferRecord) -> bool {
        self.from.map_or(true, |f| f == record.from) && self.to.map_or(true, |t| t == record.to)
    }
}
