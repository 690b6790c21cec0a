//! Record locator
//!
//! Finds the single A and single AAAA record of a domain. Anything ambiguous
//! is refused: with two A records there is no way to know which one the
//! operator wants us to move.

use tracing::{debug, info};

use super::{ManagedRecordSet, RecordType, TrackedRecord};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsRecord};

/// Query the provider for `domain` and build the record set to manage
pub async fn load_records(
    provider: &dyn DnsProvider,
    zone_id: &str,
    domain: &str,
) -> Result<ManagedRecordSet> {
    debug!(
        "Loading records for {} from {} (zone {})",
        domain,
        provider.provider_name(),
        zone_id
    );

    let records = provider.list_records(zone_id, domain).await?;
    let set = classify(zone_id, domain, records)?;

    info!(
        "Managing {} for {}: A={:?} AAAA={:?}",
        set.tracked_types()
            .iter()
            .map(RecordType::as_str)
            .collect::<Vec<_>>()
            .join("+"),
        domain,
        set.ipv4().map(TrackedRecord::last_known_content),
        set.ipv6().map(TrackedRecord::last_known_content),
    );

    Ok(set)
}

/// Classify provider records into at most one A and one AAAA record
pub fn classify(
    zone_id: &str,
    domain: &str,
    records: impl IntoIterator<Item = DnsRecord>,
) -> Result<ManagedRecordSet> {
    let mut ipv4: Option<TrackedRecord> = None;
    let mut ipv6: Option<TrackedRecord> = None;

    for record in records {
        if !same_name(&record.name, domain) {
            debug!("Ignoring record {} for foreign name {}", record.id, record.name);
            continue;
        }

        let Some(record_type) = RecordType::from_wire(&record.record_type) else {
            debug!("Ignoring {} record {}", record.record_type, record.id);
            continue;
        };

        let slot = match record_type {
            RecordType::A => &mut ipv4,
            RecordType::Aaaa => &mut ipv6,
        };
        if slot.is_some() {
            return Err(Error::DuplicateRecord {
                record_type,
                domain: domain.to_string(),
            });
        }
        *slot = Some(TrackedRecord::new(record.id, record.content));
    }

    ManagedRecordSet::new(zone_id, domain, ipv4, ipv6)
}

/// DNS names compare case-insensitively, with or without the root dot
fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}
