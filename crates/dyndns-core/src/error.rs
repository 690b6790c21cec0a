//! Error types for the dyndns system
//!
//! This module defines all error types used throughout the crate.

use std::fmt;

use thiserror::Error;

use crate::records::RecordType;

/// Result type alias for dyndns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dyndns system
#[derive(Error, Debug)]
pub enum Error {
    /// The provider client could not be built (bad credential format, TLS setup)
    #[error("Client initialization failed: {0}")]
    ClientInit(String),

    /// Public IP lookup failed
    #[error("IP resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// More than one record of a type exists for the domain
    #[error("Multiple {record_type} records found for {domain}")]
    DuplicateRecord {
        /// Record type that is ambiguous
        record_type: RecordType,
        /// Domain being managed
        domain: String,
    },

    /// Neither an A nor an AAAA record exists for the domain
    #[error("No A/AAAA records found for {domain}")]
    NoRecords {
        /// Domain being managed
        domain: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// One or more record types failed during a reconciliation cycle
    #[error("Failed to update DNS records: {0}")]
    Cycle(CycleFailures),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a client initialization error
    pub fn client_init(msg: impl Into<String>) -> Self {
        Self::ClientInit(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether retrying on the next cycle cannot help.
    ///
    /// Fatal errors point at the configuration (credentials, domain, records
    /// that are missing or ambiguous) and need manual intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ClientInit(_)
                | Self::DuplicateRecord { .. }
                | Self::NoRecords { .. }
                | Self::Config(_)
        )
    }

    /// Whether this error came from the provider API (reads or writes).
    pub fn is_provider_api(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Authentication(_)
                | Self::RateLimited(_)
                | Self::NotFound(_)
                | Self::Provider { .. }
                | Self::Json(_)
        )
    }
}

/// Why a public IP lookup against the trace service failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Both the primary and the secondary endpoint failed at the transport level
    #[error("trace service unreachable (primary: {primary}; secondary: {secondary})")]
    Unreachable {
        /// Transport error from the primary endpoint
        primary: String,
        /// Transport error from the secondary endpoint
        secondary: String,
    },

    /// The trace service answered with something other than 200
    #[error("trace service returned HTTP {0}")]
    Status(u16),

    /// The response body could not be read
    #[error("failed to read trace response: {0}")]
    Body(String),

    /// The body had no `ip=` line
    #[error("parse error: ip not found")]
    MissingIp,
}

/// A single record type's failure within a cycle
#[derive(Debug)]
pub struct RecordFailure {
    /// Which record failed
    pub record_type: RecordType,
    /// What went wrong
    pub error: Error,
}

/// Every failure of one reconciliation cycle, in A then AAAA order.
#[derive(Debug, Default)]
pub struct CycleFailures(Vec<RecordFailure>);

impl CycleFailures {
    pub(crate) fn push(&mut self, record_type: RecordType, error: Error) {
        self.0.push(RecordFailure { record_type, error });
    }

    /// The failure recorded for `record_type`, if any
    pub fn get(&self, record_type: RecordType) -> Option<&Error> {
        self.0
            .iter()
            .find(|failure| failure.record_type == record_type)
            .map(|failure| &failure.error)
    }

    /// Iterate over the failures
    pub fn iter(&self) -> impl Iterator<Item = &RecordFailure> {
        self.0.iter()
    }

    /// Number of failed record types
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cycle had no failures
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CycleFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} record: {}", failure.record_type, failure.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::client_init("bad token").is_fatal());
        assert!(
            Error::NoRecords {
                domain: "home.example.com".to_string()
            }
            .is_fatal()
        );
        assert!(!Error::from(ResolutionError::MissingIp).is_fatal());
        assert!(!Error::provider("cloudflare", "boom").is_fatal());
    }

    #[test]
    fn test_provider_api_classification() {
        assert!(Error::rate_limited("slow down").is_provider_api());
        assert!(Error::not_found("r1").is_provider_api());
        assert!(!Error::from(ResolutionError::Status(503)).is_provider_api());
    }

    #[test]
    fn test_duplicate_record_message() {
        let err = Error::DuplicateRecord {
            record_type: RecordType::Aaaa,
            domain: "home.example.com".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Multiple AAAA records found for home.example.com"
        );
    }

    #[test]
    fn test_cycle_failures_display_lists_every_failure() {
        let mut failures = CycleFailures::default();
        assert!(failures.is_empty());
        failures.push(RecordType::A, ResolutionError::MissingIp.into());
        failures.push(RecordType::Aaaa, Error::provider("cloudflare", "timeout"));
        assert_eq!(failures.len(), 2);

        let rendered = Error::Cycle(failures).to_string();
        assert!(rendered.contains("A record: IP resolution failed: parse error: ip not found"));
        assert!(rendered.contains("AAAA record: Provider error (cloudflare): timeout"));
    }
}
