//! Configuration types for the dyndns system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Domain whose A/AAAA records are managed (e.g., "home.example.com")
    pub domain: String,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Public address resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Seconds between cycles in run-forever mode; `None` runs once
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl SyncConfig {
    /// Create a new configuration with default resolver settings
    pub fn new(domain: impl Into<String>, provider: ProviderConfig) -> Self {
        Self {
            domain: domain.into(),
            provider,
            resolver: ResolverConfig::default(),
            interval_secs: None,
        }
    }

    /// Run forever with the given interval
    pub fn with_interval_secs(mut self, interval_secs: u64) -> Self {
        self.interval_secs = Some(interval_secs);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("Domain name cannot be empty"));
        }

        if self.interval_secs == Some(0) {
            return Err(crate::Error::config("Sync interval must be > 0"));
        }

        self.provider.validate()?;
        self.resolver.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token (bearer)
        api_token: String,
        /// Zone ID holding the managed records
        zone_id: String,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, zone_id } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if zone_id.is_empty() {
                    return Err(crate::Error::config("Cloudflare zone ID cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Zone holding the managed records
    pub fn zone_id(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { zone_id, .. } => zone_id,
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

// Keeps the API token out of logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare { zone_id, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .finish(),
        }
    }
}

/// Primary and secondary base URL of a trace service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEndpoints {
    /// Tried first
    pub primary: String,
    /// Tried once if the primary fails at the transport level
    pub secondary: String,
}

impl TraceEndpoints {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    fn validate(&self, family: &str) -> Result<(), crate::Error> {
        for url in [&self.primary, &self.secondary] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "{} trace endpoint must use HTTP or HTTPS scheme. Got: {}",
                    family, url
                )));
            }
        }
        Ok(())
    }
}

/// Public address resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Endpoints reached over IPv4
    #[serde(default = "default_ipv4_endpoints")]
    pub ipv4: TraceEndpoints,

    /// Endpoints reached over IPv6
    #[serde(default = "default_ipv6_endpoints")]
    pub ipv6: TraceEndpoints,

    /// HTTP timeout per request (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Resolver timeout must be > 0"));
        }
        self.ipv4.validate("IPv4")?;
        self.ipv6.validate("IPv6")?;
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ipv4: default_ipv4_endpoints(),
            ipv6: default_ipv6_endpoints(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_ipv4_endpoints() -> TraceEndpoints {
    TraceEndpoints::new("https://1.1.1.1", "https://1.0.0.1")
}

fn default_ipv6_endpoints() -> TraceEndpoints {
    TraceEndpoints::new(
        "https://[2606:4700:4700::1111]",
        "https://[2606:4700:4700::1001]",
    )
}

fn default_timeout_secs() -> u64 {
    10
}
