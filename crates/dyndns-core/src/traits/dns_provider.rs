// # DNS Provider Trait
//
// Defines the capability the core needs from a DNS provider's management API:
// list the records of a name, fetch one record by id, and patch a record's
// content.
//
// ## Implementations
//
// - Cloudflare: `dyndns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let records = provider.list_records("zone-id", "home.example.com").await?;
//     for record in &records {
//         println!("{} {} {}", record.record_type, record.name, record.content);
//     }
//
//     provider.patch_record("zone-id", &records[0].id, "1.2.3.4").await?;
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// A DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// The record ID (provider-specific)
    pub id: String,
    /// The DNS type as the provider spells it ("A", "AAAA", "CNAME", ...)
    pub record_type: String,
    /// The record name
    pub name: String,
    /// The record content (an address for A/AAAA)
    pub content: String,
}

impl DnsRecord {
    pub fn new(
        id: impl Into<String>,
        record_type: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            record_type: record_type.into(),
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Trait for DNS provider implementations
///
/// Providers execute exactly one API call per method invocation. They do not
/// retry, cache, or decide whether an update is needed; the reconciler owns
/// those decisions and failed calls simply wait for the next cycle.
///
/// The bearer token is supplied when the provider is constructed. It must
/// never appear in logs or in `Debug` output.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List all records whose name matches `name` exactly (no wildcard expansion)
    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Fetch the authoritative current state of one record
    async fn get_record(&self, zone_id: &str, record_id: &str)
    -> Result<DnsRecord, crate::Error>;

    /// Replace a record's content
    async fn patch_record(
        &self,
        zone_id: &str,
        record_id: &str,
        content: &str,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// Fails with [`crate::Error::ClientInit`] when the credential cannot be
    /// used to build a client.
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
