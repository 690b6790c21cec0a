//! Reconciler
//!
//! One cycle compares the freshly resolved public address of each tracked
//! record type with the content last known for that record, and pushes an
//! update through the provider only when they differ.
//!
//! ## Per-record flow
//!
//! 1. Resolve the public address of the record's family
//! 2. Equal to last known content → nothing to do, no provider call
//! 3. Otherwise re-read the record from the provider
//! 4. Patch it unless the provider already holds the new address
//! 5. Only then remember the new address as last known content
//!
//! A and AAAA are independent: a failure on one never stops the other, and
//! the [`CycleReport`] keeps both outcomes.
//!
//! There is no compare-and-swap on the provider side. An out-of-band edit
//! landing between the re-read and the patch is overwritten.

use tracing::{debug, info, warn};

use crate::error::{CycleFailures, Error, Result};
use crate::records::{ManagedRecordSet, RecordType, TrackedRecord};
use crate::traits::{AddressResolver, DnsProvider};

/// What happened to one record during a cycle
#[derive(Debug)]
pub enum RecordOutcome {
    /// Resolved address equals the last known content; no provider call made
    Unchanged {
        content: String,
    },
    /// The provider already held the resolved address; no write issued
    AlreadyCurrent {
        content: String,
    },
    /// The record was patched
    Updated {
        previous: String,
        current: String,
    },
    /// Resolution or a provider call failed; state left untouched
    Failed(Error),
}

impl RecordOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RecordOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            RecordOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Per-record-type outcome of one reconciliation cycle
///
/// A type that is not tracked has no outcome.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub ipv4: Option<RecordOutcome>,
    pub ipv6: Option<RecordOutcome>,
}

impl CycleReport {
    pub fn outcome(&self, record_type: RecordType) -> Option<&RecordOutcome> {
        match record_type {
            RecordType::A => self.ipv4.as_ref(),
            RecordType::Aaaa => self.ipv6.as_ref(),
        }
    }

    /// Outcomes of the tracked types, A first
    pub fn outcomes(&self) -> impl Iterator<Item = (RecordType, &RecordOutcome)> {
        RecordType::ALL
            .into_iter()
            .filter_map(move |record_type| self.outcome(record_type).map(|o| (record_type, o)))
    }

    /// The error recorded for `record_type` in this cycle
    pub fn error(&self, record_type: RecordType) -> Option<&Error> {
        self.outcome(record_type).and_then(RecordOutcome::error)
    }

    pub fn is_success(&self) -> bool {
        self.outcomes().all(|(_, outcome)| !outcome.is_failure())
    }

    /// Number of records patched in this cycle
    pub fn updates(&self) -> usize {
        self.outcomes()
            .filter(|(_, outcome)| matches!(outcome, RecordOutcome::Updated { .. }))
            .count()
    }

    /// Number of record types that failed in this cycle
    pub fn failures(&self) -> usize {
        self.outcomes()
            .filter(|(_, outcome)| outcome.is_failure())
            .count()
    }

    /// Collapse into a result carrying every failure of the cycle
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let mut failures = CycleFailures::default();
        for (record_type, outcome) in [(RecordType::A, self.ipv4), (RecordType::Aaaa, self.ipv6)] {
            if let Some(RecordOutcome::Failed(err)) = outcome {
                failures.push(record_type, err);
            }
        }
        Err(Error::Cycle(failures))
    }

    fn set(&mut self, record_type: RecordType, outcome: RecordOutcome) {
        match record_type {
            RecordType::A => self.ipv4 = Some(outcome),
            RecordType::Aaaa => self.ipv6 = Some(outcome),
        }
    }
}

/// Pushes resolved public addresses to the provider
pub struct Reconciler {
    provider: Box<dyn DnsProvider>,
    resolver: Box<dyn AddressResolver>,
}

impl Reconciler {
    pub fn new(provider: Box<dyn DnsProvider>, resolver: Box<dyn AddressResolver>) -> Self {
        Self { provider, resolver }
    }

    /// Run one reconciliation cycle over every tracked record of `set`
    pub async fn reconcile(&self, set: &mut ManagedRecordSet) -> CycleReport {
        let mut report = CycleReport::default();
        let zone_id = set.zone_id.as_str();

        for (record_type, slot) in [
            (RecordType::A, &mut set.ipv4),
            (RecordType::Aaaa, &mut set.ipv6),
        ] {
            let Some(record) = slot.as_mut() else {
                continue;
            };
            let outcome = self.reconcile_record(zone_id, record_type, record).await;
            report.set(record_type, outcome);
        }

        report
    }

    async fn reconcile_record(
        &self,
        zone_id: &str,
        record_type: RecordType,
        record: &mut TrackedRecord,
    ) -> RecordOutcome {
        let version = record_type.ip_version();
        let address = match self.resolver.resolve(version).await {
            Ok(address) => address,
            Err(e) => {
                warn!("Failed to resolve public {} address: {}", version, e);
                return RecordOutcome::Failed(e.into());
            }
        };

        if address == record.last_known_content() {
            debug!(
                "{} record {} already points at {}, skipping",
                record_type,
                record.id(),
                address
            );
            return RecordOutcome::Unchanged { content: address };
        }

        match self.push(zone_id, record_type, record.id(), &address).await {
            Ok(true) => {
                let previous = record.confirm(address.clone());
                info!(
                    "Updated {} record {}: {} -> {}",
                    record_type,
                    record.id(),
                    previous,
                    address
                );
                RecordOutcome::Updated {
                    previous,
                    current: address,
                }
            }
            Ok(false) => {
                record.confirm(address.clone());
                RecordOutcome::AlreadyCurrent { content: address }
            }
            Err(e) => {
                warn!(
                    "Failed to update {} record {} on {}: {}",
                    record_type,
                    record.id(),
                    self.provider.provider_name(),
                    e
                );
                RecordOutcome::Failed(e)
            }
        }
    }

    /// Write `address` unless the provider already holds it.
    ///
    /// Returns whether a write was issued.
    async fn push(
        &self,
        zone_id: &str,
        record_type: RecordType,
        record_id: &str,
        address: &str,
    ) -> Result<bool> {
        let current = self.provider.get_record(zone_id, record_id).await?;
        if current.content == address {
            debug!(
                "{} record {} was already set to {} on the provider",
                record_type, record_id, address
            );
            return Ok(false);
        }

        debug!(
            "Patching {} record {}: {} -> {}",
            record_type, record_id, current.content, address
        );
        self.provider
            .patch_record(zone_id, record_id, address)
            .await?;
        Ok(true)
    }
}
