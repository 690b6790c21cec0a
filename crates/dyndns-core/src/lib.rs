// # dyndns-core
//
// Core library for keeping a domain's A/AAAA records pointed at the host's
// current public addresses.
//
// ## Architecture Overview
//
// - **AddressResolver**: Trait for looking up the public IPv4/IPv6 address
// - **DnsProvider**: Trait for listing, fetching and patching records via a provider API
// - **ManagedRecordSet**: The single A and AAAA record managed for a domain
// - **Reconciler**: Pushes resolved addresses to the provider when they changed
// - **SyncDriver**: Loads the records once, then runs cycles once or on an interval
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and resolver implementations
// 2. **Owned State**: The record set is an explicit value owned by one driver, never shared
// 3. **Idempotency**: No provider call is made while the public address is unchanged
// 4. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod records;
pub mod traits;

// Re-export core types for convenience
pub use config::{ProviderConfig, ResolverConfig, SyncConfig, TraceEndpoints};
pub use engine::{CycleReport, RecordOutcome, Reconciler, SyncDriver, SyncEvent};
pub use error::{Error, ResolutionError, Result};
pub use records::{ManagedRecordSet, RecordType, TrackedRecord};
pub use traits::{AddressResolver, DnsProvider, DnsProviderFactory, DnsRecord, IpVersion};
