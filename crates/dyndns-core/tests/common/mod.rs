//! Test doubles and common utilities for contract tests
//!
//! The doubles keep their state behind `Arc`s so a test can hand one copy to
//! the driver and keep another to inspect calls afterwards.

#![allow(dead_code)]

use dyndns_core::config::{ProviderConfig, SyncConfig};
use dyndns_core::error::{Error, ResolutionError, Result};
use dyndns_core::traits::{AddressResolver, DnsProvider, DnsProviderFactory, DnsRecord, IpVersion};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DOMAIN: &str = "home.example.com";
pub const ZONE: &str = "zone123";

/// A provider call, as observed by [`ScriptedProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    List { zone_id: String, name: String },
    Get { record_id: String },
    Patch { record_id: String, content: String },
}

/// An in-memory provider that records every call
pub struct ScriptedProvider {
    /// Provider-side records
    records: Arc<Mutex<Vec<DnsRecord>>>,
    /// Every call made, in order
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    fail_list: Arc<AtomicBool>,
    fail_get: Arc<AtomicBool>,
    fail_patch: Arc<AtomicBool>,
}

impl ScriptedProvider {
    pub fn new(records: Vec<DnsRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_list: Arc::new(AtomicBool::new(false)),
            fail_get: Arc::new(AtomicBool::new(false)),
            fail_patch: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new ScriptedProvider that shares records and calls with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            calls: Arc::clone(&other.calls),
            fail_list: Arc::clone(&other.fail_list),
            fail_get: Arc::clone(&other.fail_get),
            fail_patch: Arc::clone(&other.fail_patch),
        }
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn patch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ProviderCall::Patch { .. }))
            .count()
    }

    /// Current provider-side content of a record
    pub fn content_of(&self, record_id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == record_id)
            .map(|record| record.content.clone())
    }

    /// Simulate an out-of-band edit
    pub fn set_content(&self, record_id: &str, content: &str) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|record| record.id == record_id) {
            record.content = content.to_string();
        }
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_patches(&self, fail: bool) {
        self.fail_patch.store(fail, Ordering::SeqCst);
    }

    fn record_call(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl DnsProvider for ScriptedProvider {
    async fn list_records(&self, zone_id: &str, name: &str) -> Result<Vec<DnsRecord>> {
        self.record_call(ProviderCall::List {
            zone_id: zone_id.to_string(),
            name: name.to_string(),
        });
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::provider("scripted", "list unavailable"));
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.name == name)
            .cloned()
            .collect())
    }

    async fn get_record(&self, _zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        self.record_call(ProviderCall::Get {
            record_id: record_id.to_string(),
        });
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Error::provider("scripted", "get unavailable"));
        }

        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == record_id)
            .cloned()
            .ok_or_else(|| Error::not_found(record_id))
    }

    async fn patch_record(&self, _zone_id: &str, record_id: &str, content: &str) -> Result<()> {
        self.record_call(ProviderCall::Patch {
            record_id: record_id.to_string(),
            content: content.to_string(),
        });
        if self.fail_patch.load(Ordering::SeqCst) {
            return Err(Error::provider("scripted", "patch rejected"));
        }

        self.set_content(record_id, content);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A resolver returning whatever the test configured per family
pub struct ScriptedResolver {
    ipv4: Arc<Mutex<std::result::Result<String, ResolutionError>>>,
    ipv6: Arc<Mutex<std::result::Result<String, ResolutionError>>>,
    resolve_call_count: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    /// Both families fail with `MissingIp` until configured
    pub fn new() -> Self {
        Self {
            ipv4: Arc::new(Mutex::new(Err(ResolutionError::MissingIp))),
            ipv6: Arc::new(Mutex::new(Err(ResolutionError::MissingIp))),
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            ipv4: Arc::clone(&other.ipv4),
            ipv6: Arc::clone(&other.ipv6),
            resolve_call_count: Arc::clone(&other.resolve_call_count),
        }
    }

    pub fn with_ipv4(self, address: &str) -> Self {
        self.set_ipv4(Ok(address.to_string()));
        self
    }

    pub fn with_ipv6(self, address: &str) -> Self {
        self.set_ipv6(Ok(address.to_string()));
        self
    }

    pub fn set_ipv4(&self, result: std::result::Result<String, ResolutionError>) {
        *self.ipv4.lock().unwrap() = result;
    }

    pub fn set_ipv6(&self, result: std::result::Result<String, ResolutionError>) {
        *self.ipv6.lock().unwrap() = result;
    }

    /// Get the number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressResolver for ScriptedResolver {
    async fn resolve(&self, version: IpVersion) -> std::result::Result<String, ResolutionError> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);
        match version {
            IpVersion::V4 => self.ipv4.lock().unwrap().clone(),
            IpVersion::V6 => self.ipv6.lock().unwrap().clone(),
        }
    }
}

/// A resolver whose lookups never complete, like a hung trace service
pub struct StallingResolver;

#[async_trait::async_trait]
impl AddressResolver for StallingResolver {
    async fn resolve(&self, _version: IpVersion) -> std::result::Result<String, ResolutionError> {
        std::future::pending().await
    }
}

/// Hands out providers sharing state with one [`ScriptedProvider`]
pub struct ScriptedFactory {
    pub provider: ScriptedProvider,
}

impl DnsProviderFactory for ScriptedFactory {
    fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(ScriptedProvider::sharing_state_with(&self.provider)))
    }
}

/// A factory whose credential is always rejected
pub struct RejectingFactory;

impl DnsProviderFactory for RejectingFactory {
    fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        Err(Error::client_init("invalid API token format"))
    }
}

pub fn a_record(id: &str, content: &str) -> DnsRecord {
    DnsRecord::new(id, "A", DOMAIN, content)
}

pub fn aaaa_record(id: &str, content: &str) -> DnsRecord {
    DnsRecord::new(id, "AAAA", DOMAIN, content)
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    SyncConfig::new(
        DOMAIN,
        ProviderConfig::Cloudflare {
            api_token: "test-token".to_string(),
            zone_id: ZONE.to_string(),
        },
    )
}
