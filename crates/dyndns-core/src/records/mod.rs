// # Managed Records
//
// Per-domain reconciliation state: which A/AAAA records we manage and what
// content we last observed or pushed for each of them.
//
// The set lives in memory for the lifetime of one sync driver. Nothing is
// persisted; after a restart the locator simply reloads it from the provider.

pub mod locator;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::IpVersion;

pub use locator::{classify, load_records};

/// DNS record types managed by dyndns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Both managed types, in processing order
    pub const ALL: [RecordType; 2] = [RecordType::A, RecordType::Aaaa];

    /// Parse the provider's type string. Other types are not managed.
    pub fn from_wire(record_type: &str) -> Option<Self> {
        match record_type {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::Aaaa),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Address family whose public address this record should carry
    pub fn ip_version(&self) -> IpVersion {
        match self {
            RecordType::A => IpVersion::V4,
            RecordType::Aaaa => IpVersion::V6,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record under management
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRecord {
    id: String,
    last_known_content: String,
    last_confirmed: Option<DateTime<Utc>>,
}

impl TrackedRecord {
    /// Track a record as loaded from the provider
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last_known_content: content.into(),
            last_confirmed: None,
        }
    }

    /// Provider-assigned record id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Content we last loaded or confirmed on the provider
    pub fn last_known_content(&self) -> &str {
        &self.last_known_content
    }

    /// When the provider last confirmed a new content, if ever during this run
    pub fn last_confirmed(&self) -> Option<DateTime<Utc>> {
        self.last_confirmed
    }

    /// Record a content the provider is known to hold. Returns the old value.
    pub(crate) fn confirm(&mut self, content: String) -> String {
        self.last_confirmed = Some(Utc::now());
        std::mem::replace(&mut self.last_known_content, content)
    }
}

/// The A and AAAA records managed for one domain
///
/// Invariant: at least one of the two records is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRecordSet {
    pub(crate) zone_id: String,
    pub(crate) domain: String,
    pub(crate) ipv4: Option<TrackedRecord>,
    pub(crate) ipv6: Option<TrackedRecord>,
}

impl ManagedRecordSet {
    /// Build a record set, failing with [`Error::NoRecords`] when both records are absent
    pub fn new(
        zone_id: impl Into<String>,
        domain: impl Into<String>,
        ipv4: Option<TrackedRecord>,
        ipv6: Option<TrackedRecord>,
    ) -> Result<Self> {
        let domain = domain.into();
        if ipv4.is_none() && ipv6.is_none() {
            return Err(Error::NoRecords { domain });
        }

        Ok(Self {
            zone_id: zone_id.into(),
            domain,
            ipv4,
            ipv6,
        })
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The tracked A record
    pub fn ipv4(&self) -> Option<&TrackedRecord> {
        self.ipv4.as_ref()
    }

    /// The tracked AAAA record
    pub fn ipv6(&self) -> Option<&TrackedRecord> {
        self.ipv6.as_ref()
    }

    pub fn get(&self, record_type: RecordType) -> Option<&TrackedRecord> {
        match record_type {
            RecordType::A => self.ipv4.as_ref(),
            RecordType::Aaaa => self.ipv6.as_ref(),
        }
    }

    /// Record types present in this set, A first
    pub fn tracked_types(&self) -> Vec<RecordType> {
        RecordType::ALL
            .into_iter()
            .filter(|record_type| self.get(*record_type).is_some())
            .collect()
    }
}
