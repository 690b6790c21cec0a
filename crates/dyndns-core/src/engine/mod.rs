//! Sync driver
//!
//! The SyncDriver is responsible for:
//! - Loading the managed records once, at startup
//! - Running reconciliation cycles, once or on a fixed interval
//! - Logging (never halting on) failed cycles in looping mode
//! - Emitting events for monitoring
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!                 │  SyncDriver  │── SyncEvent ──▶ (optional subscriber)
//!                 └──────────────┘
//!                   │          │
//!         load (once)          loop { reconcile; sleep }
//!                   ▼          ▼
//!          ┌──────────────┐  ┌──────────────┐
//!          │ load_records │  │  Reconciler  │
//!          └──────────────┘  └──────────────┘
//!                   │          │         │
//!                   ▼          ▼         ▼
//!          ┌─────────────────────┐  ┌─────────────────┐
//!          │    DnsProvider      │  │ AddressResolver │
//!          └─────────────────────┘  └─────────────────┘
//! ```
//!
//! Record loading failures are fatal: a wrong domain, missing records or
//! ambiguous records cannot be fixed by trying again. Cycle failures are
//! not: the next cycle simply tries again.

pub mod reconcile;

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::records::{self, ManagedRecordSet, RecordType};
use crate::traits::{AddressResolver, DnsProvider, DnsProviderFactory};

pub use reconcile::{CycleReport, RecordOutcome, Reconciler};

/// Events emitted by the SyncDriver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Records loaded, driver ready
    Started {
        domain: String,
        tracked: Vec<RecordType>,
    },

    /// A record was patched to a new address
    RecordUpdated {
        record_type: RecordType,
        previous: String,
        current: String,
    },

    /// A record already carried the resolved address
    RecordUnchanged {
        record_type: RecordType,
        content: String,
    },

    /// Resolution or a provider call failed for a record
    RecordFailed {
        record_type: RecordType,
        error: String,
    },

    /// A reconciliation cycle finished
    CycleCompleted {
        cycle: u64,
        failures: usize,
    },

    /// Looping mode stopped
    Stopped {
        reason: String,
    },
}

/// Owns one domain's record set and drives reconciliation cycles over it
///
/// ## Lifecycle
///
/// 1. Create with [`SyncDriver::load()`] (or [`SyncDriver::from_records()`])
/// 2. Call [`SyncDriver::run_once()`] or [`SyncDriver::run_forever()`]
/// 3. Drop to discard the in-memory state
pub struct SyncDriver {
    reconciler: Reconciler,

    /// Records under management, mutated in place by every cycle
    records: ManagedRecordSet,

    /// Completed cycles
    cycles: u64,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<SyncEvent>>,
}

impl SyncDriver {
    /// Load the records of `domain` and prepare a driver for them
    pub async fn load(
        provider: Box<dyn DnsProvider>,
        resolver: Box<dyn AddressResolver>,
        zone_id: &str,
        domain: &str,
    ) -> Result<Self> {
        let records = records::load_records(provider.as_ref(), zone_id, domain).await?;
        Ok(Self::from_records(
            Reconciler::new(provider, resolver),
            records,
        ))
    }

    /// Drive an already constructed record set
    pub fn from_records(reconciler: Reconciler, records: ManagedRecordSet) -> Self {
        Self {
            reconciler,
            records,
            cycles: 0,
            event_tx: None,
        }
    }

    /// Receive [`SyncEvent`]s through a bounded channel of `capacity`.
    ///
    /// Events are dropped (with a warning) while the channel is full.
    pub fn subscribe(&mut self, capacity: usize) -> mpsc::Receiver<SyncEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.event_tx = Some(tx);
        self.emit_event(SyncEvent::Started {
            domain: self.records.domain().to_string(),
            tracked: self.records.tracked_types(),
        });
        rx
    }

    /// Records under management
    pub fn records(&self) -> &ManagedRecordSet {
        &self.records
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run a single cycle, surfacing any failure to the caller
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        self.cycle().await.into_result()
    }

    /// Run cycles every `interval` until the process terminates
    pub async fn run_forever(&mut self, interval: Duration) -> Result<()> {
        self.run_with_shutdown(interval, None).await
    }

    /// Run cycles every `interval` until `shutdown` fires.
    ///
    /// Dropping the shutdown sender also stops the loop, abandoning a cycle in
    /// flight. With `None` the loop only ends with the process.
    pub async fn run_with_shutdown(
        &mut self,
        interval: Duration,
        mut shutdown: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        info!(
            "Syncing {} every {:?}",
            self.records.domain(),
            interval
        );

        loop {
            let Some(report) = unless_shutdown(self.cycle(), &mut shutdown).await else {
                break;
            };
            if let Err(e) = report.into_result() {
                error!("{}", e);
            }

            if unless_shutdown(tokio::time::sleep(interval), &mut shutdown)
                .await
                .is_none()
            {
                break;
            }
        }

        info!("Shutdown signal received");
        self.emit_event(SyncEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        Ok(())
    }

    async fn cycle(&mut self) -> CycleReport {
        let report = self.reconciler.reconcile(&mut self.records).await;
        self.cycles += 1;

        for (record_type, outcome) in report.outcomes() {
            let event = match outcome {
                RecordOutcome::Updated { previous, current } => SyncEvent::RecordUpdated {
                    record_type,
                    previous: previous.clone(),
                    current: current.clone(),
                },
                RecordOutcome::Unchanged { content }
                | RecordOutcome::AlreadyCurrent { content } => SyncEvent::RecordUnchanged {
                    record_type,
                    content: content.clone(),
                },
                RecordOutcome::Failed(e) => SyncEvent::RecordFailed {
                    record_type,
                    error: e.to_string(),
                },
            };
            self.emit_event(event);
        }

        debug!(
            "Cycle {} for {} done: {} update(s), {} failure(s)",
            self.cycles,
            self.records.domain(),
            report.updates(),
            report.failures()
        );
        self.emit_event(SyncEvent::CycleCompleted {
            cycle: self.cycles,
            failures: report.failures(),
        });

        report
    }

    fn emit_event(&self, event: SyncEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        if tx.try_send(event).is_err() {
            warn!("Event channel full or closed, dropping event");
        }
    }
}

/// Drive `work` to completion unless `shutdown` fires (or is dropped) first
async fn unless_shutdown<F: Future>(
    work: F,
    shutdown: &mut Option<oneshot::Receiver<()>>,
) -> Option<F::Output> {
    match shutdown {
        Some(rx) => tokio::select! {
            output = work => Some(output),
            _ = rx => None,
        },
        None => Some(work.await),
    }
}

/// Build the provider from `config` and load the managed records
pub async fn connect(
    factory: &dyn DnsProviderFactory,
    resolver: Box<dyn AddressResolver>,
    config: &SyncConfig,
) -> Result<SyncDriver> {
    config.validate()?;

    let provider = factory.create(&config.provider)?;
    SyncDriver::load(
        provider,
        resolver,
        config.provider.zone_id(),
        &config.domain,
    )
    .await
}

/// Load the records of `config.domain` and update them once
pub async fn run_once(
    factory: &dyn DnsProviderFactory,
    resolver: Box<dyn AddressResolver>,
    config: &SyncConfig,
) -> Result<CycleReport> {
    let mut driver = connect(factory, resolver, config).await?;
    driver.run_once().await
}

/// Load the records of `config.domain` and keep them updated every `interval`.
///
/// Only returns on a fatal setup failure.
pub async fn run_forever(
    factory: &dyn DnsProviderFactory,
    resolver: Box<dyn AddressResolver>,
    config: &SyncConfig,
    interval: Duration,
) -> Result<()> {
    let mut driver = connect(factory, resolver, config).await?;
    driver.run_forever(interval).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_event_equality() {
        let event = SyncEvent::RecordUpdated {
            record_type: RecordType::A,
            previous: "1.2.3.0".to_string(),
            current: "1.2.3.4".to_string(),
        };

        assert_eq!(event.clone(), event);
    }
}
