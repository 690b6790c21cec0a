//! Core traits for the dyndns system
//!
//! - [`DnsProvider`]: list, fetch and patch records through a provider API
//! - [`AddressResolver`]: look up the host's public IPv4/IPv6 address

pub mod dns_provider;
pub mod resolver;

pub use dns_provider::{DnsProvider, DnsProviderFactory, DnsRecord};
pub use resolver::{AddressResolver, IpVersion};
