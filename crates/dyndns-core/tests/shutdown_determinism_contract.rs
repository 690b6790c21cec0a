//! Contract Test: Sync Loop & Shutdown Determinism
//!
//! Constraints verified:
//! - Run-once surfaces a failed cycle to the caller
//! - The loop keeps running across failed cycles and picks up recoveries
//! - The loop terminates when the shutdown signal fires (or its sender drops)
//! - Shutdown interrupts a cycle that is still in flight
//! - A full event channel never blocks or fails a cycle
//! - Setup failures (client init, record loading) are fatal and returned immediately

mod common;

use common::*;
use dyndns_core::engine::{self, SyncDriver, SyncEvent};
use dyndns_core::{Error, RecordType, ResolutionError};
use std::time::Duration;
use tokio_test::assert_ok;

#[tokio::test]
async fn run_once_updates_the_record() {
    let factory = ScriptedFactory {
        provider: ScriptedProvider::new(vec![a_record("r1", "1.2.3.0")]),
    };
    let resolver = ScriptedResolver::new().with_ipv4("1.2.3.4");

    let report = engine::run_once(&factory, Box::new(resolver), &minimal_config())
        .await
        .expect("cycle succeeds");

    assert_eq!(report.updates(), 1);
    assert_eq!(factory.provider.content_of("r1").as_deref(), Some("1.2.3.4"));
}

#[tokio::test]
async fn run_once_surfaces_cycle_errors() {
    let factory = ScriptedFactory {
        provider: ScriptedProvider::new(vec![a_record("r1", "1.2.3.0")]),
    };
    let resolver = ScriptedResolver::new();
    resolver.set_ipv4(Err(ResolutionError::Unreachable {
        primary: "connection refused".to_string(),
        secondary: "connection refused".to_string(),
    }));

    let result = engine::run_once(&factory, Box::new(resolver), &minimal_config()).await;

    match result {
        Err(Error::Cycle(failures)) => assert!(matches!(
            failures.get(RecordType::A),
            Some(Error::Resolution(ResolutionError::Unreachable { .. }))
        )),
        other => panic!("expected a cycle error, got {:?}", other),
    }
}

#[tokio::test]
async fn client_init_failure_is_fatal() {
    let result = engine::run_forever(
        &RejectingFactory,
        Box::new(ScriptedResolver::new()),
        &minimal_config(),
        Duration::from_millis(10),
    )
    .await;

    let err = result.expect_err("setup must fail");
    assert!(matches!(err, Error::ClientInit(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn record_loading_failure_is_fatal_for_the_loop() {
    let factory = ScriptedFactory {
        provider: ScriptedProvider::new(Vec::new()),
    };

    // Would never return if the loop started
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        engine::run_forever(
            &factory,
            Box::new(ScriptedResolver::new()),
            &minimal_config(),
            Duration::from_millis(10),
        ),
    )
    .await
    .expect("run_forever returns on load failure");

    assert!(matches!(result, Err(Error::NoRecords { .. })));
}

#[tokio::test]
async fn loop_survives_failed_cycles_and_stops_on_shutdown() {
    let provider = ScriptedProvider::new(vec![a_record("r1", "1.2.3.0")]);
    let resolver = ScriptedResolver::new();
    resolver.set_ipv4(Err(ResolutionError::Status(502)));

    let mut driver = SyncDriver::load(
        Box::new(ScriptedProvider::sharing_state_with(&provider)),
        Box::new(ScriptedResolver::sharing_state_with(&resolver)),
        ZONE,
        DOMAIN,
    )
    .await
    .expect("records load");
    let mut events = driver.subscribe(1000);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        let result = driver
            .run_with_shutdown(Duration::from_millis(10), Some(shutdown_rx))
            .await;
        (driver, result)
    });

    // Several failing cycles
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(provider.patch_count(), 0);

    // Trace service recovers
    resolver.set_ipv4(Ok("1.2.3.4".to_string()));
    tokio::time::sleep(Duration::from_millis(60)).await;

    shutdown_tx.send(()).expect("driver still running");
    let (driver, result) = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("driver should terminate within 5 seconds")
        .unwrap();

    assert!(result.is_ok(), "clean shutdown: {:?}", result);
    assert!(driver.cycles() >= 2);
    assert_eq!(provider.patch_count(), 1);
    assert_eq!(
        driver.records().ipv4().unwrap().last_known_content(),
        "1.2.3.4"
    );

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.first(), Some(SyncEvent::Started { .. })));
    assert!(seen.iter().any(|e| matches!(e, SyncEvent::RecordFailed { record_type: RecordType::A, .. })));
    assert!(seen.contains(&SyncEvent::RecordUpdated {
        record_type: RecordType::A,
        previous: "1.2.3.0".to_string(),
        current: "1.2.3.4".to_string(),
    }));
    assert!(matches!(seen.last(), Some(SyncEvent::Stopped { .. })));
}

#[tokio::test]
async fn dropped_shutdown_sender_stops_the_loop() {
    let provider = ScriptedProvider::new(vec![a_record("r1", "1.2.3.4")]);
    let resolver = ScriptedResolver::new().with_ipv4("1.2.3.4");

    let mut driver = SyncDriver::load(
        Box::new(ScriptedProvider::sharing_state_with(&provider)),
        Box::new(resolver),
        ZONE,
        DOMAIN,
    )
    .await
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    drop(shutdown_tx);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        driver.run_with_shutdown(Duration::from_secs(3600), Some(shutdown_rx)),
    )
    .await
    .expect("loop should stop without waiting for the interval");

    assert!(result.is_ok());
    assert_eq!(driver.cycles(), 1);
    // Only the initial listing; the cycle took the fast path
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test]
async fn shutdown_interrupts_a_hung_cycle() {
    let provider = ScriptedProvider::new(vec![a_record("r1", "1.2.3.0")]);

    let mut driver = SyncDriver::load(
        Box::new(ScriptedProvider::sharing_state_with(&provider)),
        Box::new(StallingResolver),
        ZONE,
        DOMAIN,
    )
    .await
    .unwrap();
    let mut events = driver.subscribe(16);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        let result = driver
            .run_with_shutdown(Duration::from_secs(3600), Some(shutdown_rx))
            .await;
        (driver, result)
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(()).expect("driver still running");

    let (driver, result) = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("hung cycle must not delay shutdown")
        .unwrap();

    assert_ok!(result);
    assert_eq!(driver.cycles(), 0);
    assert_eq!(provider.patch_count(), 0);
    assert_eq!(
        driver.records().ipv4().unwrap().last_known_content(),
        "1.2.3.0"
    );

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.last(), Some(SyncEvent::Stopped { .. })));
}

#[tokio::test]
async fn full_event_channel_does_not_block_cycles() {
    let provider = ScriptedProvider::new(vec![
        a_record("r4", "1.2.3.0"),
        aaaa_record("r6", "2001:db8::1"),
    ]);
    let resolver = ScriptedResolver::new()
        .with_ipv4("1.2.3.4")
        .with_ipv6("2001:db8::2");

    let mut driver = SyncDriver::load(
        Box::new(ScriptedProvider::sharing_state_with(&provider)),
        Box::new(resolver),
        ZONE,
        DOMAIN,
    )
    .await
    .unwrap();

    // Started fills the channel; nothing is ever drained
    let mut events = driver.subscribe(1);

    for _ in 0..3 {
        let report = tokio::time::timeout(Duration::from_secs(5), driver.run_once())
            .await
            .expect("cycle must not wait for the subscriber");
        assert_ok!(report);
    }

    assert_eq!(driver.cycles(), 3);
    assert_eq!(provider.patch_count(), 2);
    assert!(matches!(events.try_recv(), Ok(SyncEvent::Started { .. })));
    assert!(events.try_recv().is_err());
}
