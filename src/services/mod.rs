//! Services layer
//!
//! Workflows that coordinate the registry, permission cache and metadata
//! bridge.
//!
//! ## Services
//!
//! - **EventAggregator**: issuer reports and per-course statistics
//! - **CertificateIssuer**: validate, pre-authorize, upload, mint
//! - **CertificateVerifier**: ledger reads joined with resolved metadata

pub mod aggregator;
pub mod issuance;
pub mod verifier;

pub use aggregator::{
    CourseAggregate, EventAggregator, IssuedCertificate, IssuerReport, LookupFailure,
    OwnedCertificate,
};
pub use issuance::{parse_recipient, CertificateIssuer, IssuedCertificateReceipt};
pub use verifier::{CertificateVerifier, CourseMetadata, VerifiedCertificate};
