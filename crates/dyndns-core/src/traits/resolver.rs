// # Address Resolver Trait
//
// Defines the interface for finding out the host's current public address.
//
// ## Implementations
//
// - Cloudflare trace service: `dyndns-ip-trace` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::AddressResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* AddressResolver implementation */;
//
//     let v4 = resolver.resolve_ipv4().await?;
//     println!("public IPv4: {}", v4);
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::error::ResolutionError;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl std::fmt::Display for IpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for public address resolvers
///
/// Every call performs a fresh lookup. Resolvers must not cache results:
/// the reconciler compares each answer with what it last pushed and decides
/// on its own what an unchanged answer means.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve the public address of the given family, in textual form
    async fn resolve(&self, version: IpVersion) -> Result<String, ResolutionError>;

    /// Resolve the public IPv4 address
    async fn resolve_ipv4(&self) -> Result<String, ResolutionError> {
        self.resolve(IpVersion::V4).await
    }

    /// Resolve the public IPv6 address
    async fn resolve_ipv6(&self) -> Result<String, ResolutionError> {
        self.resolve(IpVersion::V6).await
    }
}
