//! Shared types for the certificate bridge
//!
//! Ledger identities (addresses, token ids, roles) and the crate-wide error
//! taxonomy. Every component reports failures through [`CertificateError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Identities
// ============================================================================

/// Sequential certificate identifier. Ids start at 1 and are never reused.
pub type TokenId = u64;

/// A 20-byte ledger account address.
///
/// Parsed from and rendered as `0x`-prefixed lowercase hex, so two spellings
/// of the same account (checksummed or not) compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address. Never a valid certificate recipient.
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = CertificateError;

    fn from_str(s: &str) -> Result<Self> {
        let hex_part = s
            .trim()
            .strip_prefix("0x")
            .or_else(|| s.trim().strip_prefix("0X"))
            .ok_or_else(|| CertificateError::InvalidAddress(format!("missing 0x prefix: {s}")))?;

        if hex_part.len() != 40 {
            return Err(CertificateError::InvalidAddress(format!(
                "expected 40 hex chars, got {}",
                hex_part.len()
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|e| CertificateError::InvalidAddress(format!("{s}: {e}")))?;

        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = CertificateError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Permission roles recognised by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// May grant and revoke roles
    Admin,
    /// May issue certificates
    Minter,
}

/// `DEFAULT_ADMIN_ROLE`: the all-zero role identifier.
pub const ADMIN_ROLE: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// `MINTER_ROLE`: keccak256("MINTER_ROLE").
pub const MINTER_ROLE: &str = "0x9f2df0fed2c77648de5860a4cc508cd0818c85b8b8a1ab4ceeef8d981c8956a6";

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Minter];

    /// The 32-byte role identifier used by the ledger contract.
    pub fn identifier(&self) -> &'static str {
        match self {
            Role::Admin => ADMIN_ROLE,
            Role::Minter => MINTER_ROLE,
        }
    }

    /// Resolve a role from its ledger identifier or its symbolic name.
    pub fn from_identifier(id: &str) -> Option<Role> {
        let id = id.trim();
        Role::ALL.into_iter().find(|role| {
            role.identifier().eq_ignore_ascii_case(id) || role.to_string().eq_ignore_ascii_case(id)
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Minter => write!(f, "MINTER"),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// One failed attempt against a pinning provider or retrieval gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    /// Provider name or gateway URL
    pub endpoint: String,
    /// Human-readable failure reason
    pub reason: String,
}

impl AttemptFailure {
    pub fn new(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.reason)
    }
}

/// Error taxonomy for registry, bridge, cache and aggregation failures.
///
/// None of these are fatal to the process; each is recoverable at the call
/// boundary.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// Caller lacks the role required by the operation
    #[error("Access denied: {account} is missing role {role}")]
    AccessDenied { role: Role, account: Address },

    /// Recipient is the zero address or malformed
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Metadata pointer was empty
    #[error("Token URI cannot be empty")]
    EmptyPointer,

    /// Token id was never assigned
    #[error("Token not found: {0}")]
    TokenNotFound(TokenId),

    /// Metadata pointer could not be resolved
    #[error("Metadata not found: {0}")]
    MetadataNotFound(String),

    /// Every upload provider failed and the local fallback could not persist
    #[error("No content provider available: {reason}")]
    ProviderUnavailable {
        reason: String,
        attempts: Vec<AttemptFailure>,
    },

    /// Every retrieval gateway failed or timed out
    #[error("All retrieval gateways failed for {pointer} ({} attempts)", .attempts.len())]
    GatewayExhausted {
        pointer: String,
        attempts: Vec<AttemptFailure>,
    },

    /// Informational: a role check was answered from cache and may lag the
    /// ledger by up to the cache TTL
    #[error("Authorization for {account} as {role} is cache-derived ({age_ms}ms old)")]
    StaleAuthorization {
        role: Role,
        account: Address,
        age_ms: u64,
    },

    /// Revoke would leave the registry without an administrator
    #[error("Cannot revoke the last administrator: {0}")]
    LastAdministrator(Address),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid content pointer: {0}")]
    InvalidPointer(String),

    #[error("Invalid certificate fields: {0}")]
    InvalidFields(String),

    /// Backing ledger could not answer
    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CertificateError {
    /// True for every "does not resolve" outcome, token or metadata.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CertificateError::TokenNotFound(_)
                | CertificateError::MetadataNotFound(_)
                | CertificateError::GatewayExhausted { .. }
        )
    }

    /// True for registry precondition failures. These never mutate state.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CertificateError::AccessDenied { .. }
                | CertificateError::InvalidRecipient(_)
                | CertificateError::EmptyPointer
                | CertificateError::LastAdministrator(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CertificateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_normalizes_case() {
        let upper: Address = "0xAbCdEf0123456789aBcDeF0123456789ABCDEF01".parse().unwrap();
        let lower: Address = "0xabcdef0123456789abcdef0123456789abcdef01".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_address_parse_rejects_malformed() {
        assert!("abcdef0123456789abcdef0123456789abcdef01".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzzcdef0123456789abcdef0123456789abcdef01".parse::<Address>().is_err());
    }

    #[test]
    fn test_zero_address() {
        let zero: Address = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero, Address::ZERO);
    }

    #[test]
    fn test_address_serde_roundtrip_as_string() {
        let addr: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000aa\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_role_identifiers() {
        assert_eq!(Role::from_identifier(ADMIN_ROLE), Some(Role::Admin));
        assert_eq!(Role::from_identifier(MINTER_ROLE), Some(Role::Minter));
        assert_eq!(Role::from_identifier("minter"), Some(Role::Minter));
        assert_eq!(Role::from_identifier("0x1234"), None);
    }

    #[test]
    fn test_error_classification() {
        assert!(CertificateError::TokenNotFound(7).is_not_found());
        assert!(CertificateError::GatewayExhausted {
            pointer: "ipfs://x".into(),
            attempts: vec![]
        }
        .is_not_found());
        assert!(CertificateError::EmptyPointer.is_precondition());
        assert!(!CertificateError::EmptyPointer.is_not_found());
    }

    #[test]
    fn test_gateway_exhausted_display_counts_attempts() {
        let err = CertificateError::GatewayExhausted {
            pointer: "ipfs://bafy".into(),
            attempts: vec![
                AttemptFailure::new("a", "timeout"),
                AttemptFailure::new("b", "HTTP 404"),
            ],
        };
        assert!(err.to_string().contains("2 attempts"));
    }
}
