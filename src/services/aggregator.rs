//! Event Aggregator
//!
//! Composes ledger reads into dashboard-shaped reports. Every call is a
//! fresh scan; nothing is retained between calls. Per-token lookup failures
//! are collected next to the results and never abort the batch.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::registry::{IssuanceFilter, LedgerReader, TransferFilter};
use crate::types::{Address, Result, TokenId};

/// One issuance record classified against current ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCertificate {
    pub token_id: TokenId,
    pub recipient: Address,
    /// Present only for active tokens
    pub current_owner: Option<Address>,
    pub pointer: String,
    pub active: bool,
    pub block_number: u64,
    pub tx_hash: String,
}

/// Active certificates sharing one metadata pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseAggregate {
    pub pointer: String,
    pub count: usize,
    pub first_seen_block: u64,
    pub last_seen_block: u64,
    /// In issuance order
    pub token_ids: Vec<TokenId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    pub token_id: TokenId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuerReport {
    pub issuer: Address,
    /// Every issuance by `issuer`, in ledger order
    pub certificates: Vec<IssuedCertificate>,
    /// One entry per distinct pointer of an active certificate, in first-seen order
    pub courses: Vec<CourseAggregate>,
    pub lookup_failures: Vec<LookupFailure>,
}

impl IssuerReport {
    pub fn unique_courses(&self) -> usize {
        self.courses.len()
    }

    pub fn total_active(&self) -> usize {
        self.certificates.iter().filter(|c| c.active).count()
    }

    pub fn active(&self) -> impl Iterator<Item = &IssuedCertificate> {
        self.certificates.iter().filter(|c| c.active)
    }

    pub fn inactive(&self) -> impl Iterator<Item = &IssuedCertificate> {
        self.certificates.iter().filter(|c| !c.active)
    }

    pub fn course(&self, pointer: &str) -> Option<&CourseAggregate> {
        self.courses.iter().find(|c| c.pointer == pointer)
    }
}

/// A certificate currently held by an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedCertificate {
    pub token_id: TokenId,
    pub pointer: String,
}

pub struct EventAggregator {
    ledger: Arc<dyn LedgerReader>,
}

impl EventAggregator {
    pub fn new(ledger: Arc<dyn LedgerReader>) -> Self {
        Self { ledger }
    }

    /// Classify every certificate issued by `issuer` and group the active
    /// ones by metadata pointer. Only a failed event query is an error.
    pub async fn report_for_issuer(&self, issuer: &Address) -> Result<IssuerReport> {
        let records = self
            .ledger
            .issuance_events(&IssuanceFilter::by_issuer(*issuer))
            .await?;

        let mut certificates = Vec::with_capacity(records.len());
        let mut courses: Vec<CourseAggregate> = Vec::new();
        let mut course_index: HashMap<String, usize> = HashMap::new();
        let mut lookup_failures = Vec::new();

        for record in records {
            let current_owner = match self.ledger.owner_of(record.token_id).await {
                Ok(owner) => Some(owner),
                Err(e) => {
                    warn!(token_id = record.token_id, error = %e, "Ownership lookup failed, marking inactive");
                    lookup_failures.push(LookupFailure {
                        token_id: record.token_id,
                        reason: e.to_string(),
                    });
                    None
                }
            };
            let active = current_owner.is_some();

            if active {
                let idx = *course_index.entry(record.pointer.clone()).or_insert_with(|| {
                    courses.push(CourseAggregate {
                        pointer: record.pointer.clone(),
                        count: 0,
                        first_seen_block: record.block_number,
                        last_seen_block: record.block_number,
                        token_ids: Vec::new(),
                    });
                    courses.len() - 1
                });
                let course = &mut courses[idx];
                course.count += 1;
                course.first_seen_block = course.first_seen_block.min(record.block_number);
                course.last_seen_block = course.last_seen_block.max(record.block_number);
                course.token_ids.push(record.token_id);
            }

            certificates.push(IssuedCertificate {
                token_id: record.token_id,
                recipient: record.recipient,
                current_owner,
                pointer: record.pointer,
                active,
                block_number: record.block_number,
                tx_hash: record.tx_hash,
            });
        }

        info!(
            %issuer,
            certificates = certificates.len(),
            courses = courses.len(),
            failures = lookup_failures.len(),
            "Built issuer report"
        );

        Ok(IssuerReport {
            issuer: *issuer,
            certificates,
            courses,
            lookup_failures,
        })
    }

    /// Certificates transferred to `owner` that it still holds.
    pub async fn certificates_by_owner(&self, owner: &Address) -> Result<Vec<OwnedCertificate>> {
        let transfers = self.ledger.transfer_events(&TransferFilter::to(*owner)).await?;

        let mut seen = BTreeSet::new();
        let mut owned = Vec::new();
        for transfer in transfers {
            if !seen.insert(transfer.token_id) {
                continue;
            }

            let held = match self.ledger.owner_of(transfer.token_id).await {
                Ok(current) => current == *owner,
                Err(e) => {
                    debug!(token_id = transfer.token_id, error = %e, "Skipping unresolvable token");
                    false
                }
            };
            if !held {
                continue;
            }

            match self.ledger.token_uri(transfer.token_id).await {
                Ok(pointer) => owned.push(OwnedCertificate {
                    token_id: transfer.token_id,
                    pointer,
                }),
                Err(e) => warn!(token_id = transfer.token_id, error = %e, "Pointer lookup failed"),
            }
        }

        Ok(owned)
    }
}
