//! Certificate verification
//!
//! Joins ledger reads with resolved metadata. Bulk lookups resolve
//! documents concurrently and drop items whose metadata cannot be fetched.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::aggregator::{EventAggregator, IssuerReport};
use crate::metadata::{MetadataBridge, MetadataDocument};
use crate::registry::LedgerReader;
use crate::types::{Address, Result, TokenId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedCertificate {
    pub token_id: TokenId,
    pub owner: Address,
    pub pointer: String,
    pub metadata: MetadataDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseMetadata {
    pub pointer: String,
    pub document: MetadataDocument,
}

pub struct CertificateVerifier {
    ledger: Arc<dyn LedgerReader>,
    bridge: Arc<MetadataBridge>,
    aggregator: EventAggregator,
}

impl CertificateVerifier {
    pub fn new(ledger: Arc<dyn LedgerReader>, bridge: Arc<MetadataBridge>) -> Self {
        Self {
            aggregator: EventAggregator::new(ledger.clone()),
            ledger,
            bridge,
        }
    }

    /// Owner, pointer and metadata of a single token. Any failure is
    /// surfaced; an unknown id is `TokenNotFound`.
    pub async fn verify_token(&self, token_id: TokenId) -> Result<VerifiedCertificate> {
        let owner = self.ledger.owner_of(token_id).await?;
        let pointer = self.ledger.token_uri(token_id).await?;
        let metadata = self.bridge.resolve(&pointer).await?;

        info!(token_id, %owner, pointer = %pointer, "Verified certificate");
        Ok(VerifiedCertificate {
            token_id,
            owner,
            pointer,
            metadata,
        })
    }

    /// Every certificate `owner` holds, with metadata.
    pub async fn certificates_of(&self, owner: &Address) -> Result<Vec<VerifiedCertificate>> {
        let owned = self.aggregator.certificates_by_owner(owner).await?;

        let resolved = join_all(owned.into_iter().map(|cert| async move {
            match self.bridge.resolve(&cert.pointer).await {
                Ok(metadata) => Some(VerifiedCertificate {
                    token_id: cert.token_id,
                    owner: *owner,
                    pointer: cert.pointer,
                    metadata,
                }),
                Err(e) => {
                    warn!(token_id = cert.token_id, pointer = %cert.pointer, error = %e, "Dropping certificate with unresolvable metadata");
                    None
                }
            }
        }))
        .await;

        Ok(resolved.into_iter().flatten().collect())
    }

    /// Metadata for each course in a report, in report order. Courses whose
    /// metadata cannot be resolved are omitted.
    pub async fn resolve_course_metadata(&self, report: &IssuerReport) -> Vec<CourseMetadata> {
        let resolved = join_all(report.courses.iter().map(|course| async move {
            match self.bridge.resolve(&course.pointer).await {
                Ok(document) => Some(CourseMetadata {
                    pointer: course.pointer.clone(),
                    document,
                }),
                Err(e) => {
                    warn!(pointer = %course.pointer, error = %e, "Course metadata unavailable");
                    None
                }
            }
        }))
        .await;

        resolved.into_iter().flatten().collect()
    }
}
