// # Trace IP Resolver
//
// This crate resolves the host's public IPv4/IPv6 address using the
// Cloudflare trace service (`/cdn-cgi/trace`).
//
// ## Endpoints
//
// Each address family has a primary and a secondary instance of the same
// service. Reaching 1.1.1.1 over IPv4 reports our public IPv4 address,
// reaching 2606:4700:4700::1111 over IPv6 reports our public IPv6 address.
// The secondary instance is tried once when the primary fails at the
// transport level, which covers anycast routing failures.
//
// ## Response format
//
// Plain text, one `key=value` pair per line:
//
// ```text
// fl=123abc
// h=1.1.1.1
// ip=203.0.113.7
// ts=1700000000.123
// ```
//
// Only the `ip` key is used.

use async_trait::async_trait;
use dyndns_core::config::{ResolverConfig, TraceEndpoints};
use dyndns_core::traits::{AddressResolver, IpVersion};
use dyndns_core::{Error, ResolutionError, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// Path of the trace service below each endpoint
const TRACE_PATH: &str = "/cdn-cgi/trace";

/// Public address resolver backed by the trace service
#[derive(Debug, Clone)]
pub struct TraceResolver {
    /// Endpoints reached over IPv4
    ipv4: TraceEndpoints,

    /// Endpoints reached over IPv6
    ipv6: TraceEndpoints,

    /// HTTP client
    client: reqwest::Client,
}

impl TraceResolver {
    /// Create a resolver from configuration
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::client_init(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            ipv4: config.ipv4.clone(),
            ipv6: config.ipv6.clone(),
            client,
        })
    }

    /// Create a resolver using the default Cloudflare endpoints
    pub fn cloudflare() -> Result<Self> {
        Self::new(&ResolverConfig::default())
    }

    fn endpoints(&self, version: IpVersion) -> &TraceEndpoints {
        match version {
            IpVersion::V4 => &self.ipv4,
            IpVersion::V6 => &self.ipv6,
        }
    }

    async fn fetch(&self, endpoint: &str) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), TRACE_PATH);
        tracing::debug!("Requesting {}", url);
        self.client.get(&url).send().await
    }
}

#[async_trait]
impl AddressResolver for TraceResolver {
    async fn resolve(&self, version: IpVersion) -> std::result::Result<String, ResolutionError> {
        let endpoints = self.endpoints(version);

        let response = match self.fetch(&endpoints.primary).await {
            Ok(response) => response,
            Err(primary) => {
                tracing::warn!(
                    "{} trace endpoint {} failed ({}), trying {}",
                    version,
                    endpoints.primary,
                    primary,
                    endpoints.secondary
                );
                self.fetch(&endpoints.secondary)
                    .await
                    .map_err(|secondary| ResolutionError::Unreachable {
                        primary: primary.to_string(),
                        secondary: secondary.to_string(),
                    })?
            }
        };

        if response.status() != StatusCode::OK {
            return Err(ResolutionError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolutionError::Body(e.to_string()))?;

        let ip = parse_trace(&body).ok_or(ResolutionError::MissingIp)?;
        tracing::debug!("Public {} address: {}", version, ip);
        Ok(ip.to_string())
    }
}

/// Value of the first line whose key is exactly `ip`. An empty value counts as missing.
pub fn parse_trace(body: &str) -> Option<&str> {
    body.lines()
        .find_map(|line| match line.split_once('=') {
            Some(("ip", value)) => Some(value.trim_end_matches('\r')),
            _ => None,
        })
        .filter(|ip| !ip.is_empty())
}
