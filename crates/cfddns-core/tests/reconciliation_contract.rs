//! Contract Test: Reconciliation Cycle
//!
//! Constraints verified:
//! - The record is updated only when its content differs from the public IP
//! - A missing record is reported and never created
//! - A failed resolution never reaches the provider
//! - Every outcome produces its user-facing message
//! - Manual cycles always notify, scheduled ones follow the preferences

mod common;

use cfddns_core::traits::Severity;
use cfddns_core::{CycleOutcome, DdnsEngine, EngineEvent, Error, Notifier};
use common::*;
use std::net::Ipv4Addr;
use std::sync::Arc;

const NEW_IP: Ipv4Addr = Ipv4Addr::new(5, 6, 7, 8);

fn engine_with(
    ip_source: MockIpSource,
    provider: MockDnsProvider,
    notifier: Notifier,
    config: cfddns_core::Configuration,
) -> (DdnsEngine, tokio::sync::mpsc::Receiver<EngineEvent>) {
    DdnsEngine::new(
        Box::new(ip_source),
        Box::new(provider),
        Arc::new(notifier),
        config,
        cfddns_core::ControlFlags::new(),
    )
    .expect("engine construction succeeds")
}

#[tokio::test]
async fn differing_record_is_updated() {
    let ip_source = MockIpSource::new(Some(NEW_IP));
    let provider = MockDnsProvider::with_record("abc", "1.2.3.4");
    let handle = MockDnsProvider::sharing_counters_with(&provider);

    let (mut engine, _events) = engine_with(ip_source, provider, Notifier::log_only(), complete_config());
    let report = engine.reconcile(false).await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Updated {
            ip: NEW_IP,
            record_id: "abc".to_string()
        }
    );
    assert_eq!(report.message, "5.6.7.8 home.example.com DDNS updated.");
    assert_eq!(handle.updates(), vec![("abc".to_string(), NEW_IP)]);
    assert_eq!(engine.last_known_ip(), Some(NEW_IP));
}

#[tokio::test]
async fn matching_record_is_left_alone() {
    let ip_source = MockIpSource::new(Some(NEW_IP));
    let provider = MockDnsProvider::with_record("abc", "5.6.7.8");
    let handle = MockDnsProvider::sharing_counters_with(&provider);

    let (mut engine, _events) = engine_with(ip_source, provider, Notifier::log_only(), complete_config());
    let report = engine.reconcile(false).await;

    assert_eq!(report.outcome, CycleOutcome::Unchanged { ip: NEW_IP });
    assert_eq!(report.message, "IP (5.6.7.8) for home.example.com has not changed.");
    assert_eq!(handle.update_call_count(), 0);
    assert_eq!(engine.last_known_ip(), Some(NEW_IP));
}

#[tokio::test]
async fn missing_record_is_reported_not_created() {
    let ip_source = MockIpSource::new(Some(NEW_IP));
    let provider = MockDnsProvider::new(None);
    let handle = MockDnsProvider::sharing_counters_with(&provider);

    let (mut engine, _events) = engine_with(ip_source, provider, Notifier::log_only(), complete_config());
    let report = engine.reconcile(false).await;

    assert_eq!(report.outcome, CycleOutcome::RecordMissing { ip: NEW_IP });
    assert!(report.message.contains("home.example.com"));
    assert!(report.message.contains("5.6.7.8"));
    assert_eq!(handle.fetch_call_count(), 1);
    assert_eq!(handle.update_call_count(), 0);
    assert_eq!(engine.last_known_ip(), None);
}

#[tokio::test]
async fn failed_resolution_never_reaches_provider() {
    let ip_source = MockIpSource::new(None);
    let provider = MockDnsProvider::with_record("abc", "1.2.3.4");
    let handle = MockDnsProvider::sharing_counters_with(&provider);

    let (mut engine, _events) = engine_with(ip_source, provider, Notifier::log_only(), complete_config());
    let report = engine.reconcile(false).await;

    assert_eq!(report.outcome, CycleOutcome::ResolutionFailed);
    assert_eq!(report.message, "Failed to find a valid IP.");
    assert_eq!(handle.fetch_call_count(), 0);
    assert_eq!(handle.update_call_count(), 0);
}

#[tokio::test]
async fn rejected_update_notifies_when_not_silent() {
    let sink = RecordingSink::new();
    let mut config = complete_config();
    config.silent = false;

    let (mut engine, _events) = engine_with(
        MockIpSource::new(Some(NEW_IP)),
        MockDnsProvider::with_record("abc", "1.2.3.4").rejecting(),
        Notifier::new(Arc::new(sink.clone())),
        config,
    );
    let report = engine.reconcile(false).await;

    assert_eq!(report.message, "5.6.7.8 home.example.com DDNS failed for abc (5.6.7.8).");
    assert!(report.notified);
    assert_eq!(sink.wait_for(1), vec![(Severity::Error, report.message.clone())]);
    assert_eq!(engine.last_known_ip(), None);
}

#[tokio::test]
async fn silent_scheduled_cycle_only_logs() {
    let sink = RecordingSink::new();
    let mut config = complete_config();
    config.silent = true;
    config.notify_on_success = true;

    let (mut engine, _events) = engine_with(
        MockIpSource::new(None),
        MockDnsProvider::with_record("abc", "1.2.3.4"),
        Notifier::new(Arc::new(sink.clone())),
        config,
    );
    let report = engine.reconcile(false).await;

    assert!(!report.notified);
    assert!(sink.shown().is_empty());
}

#[tokio::test]
async fn manual_cycle_notifies_even_when_silent() {
    let sink = RecordingSink::new();
    let mut config = complete_config();
    config.silent = true;

    let (mut engine, _events) = engine_with(
        MockIpSource::new(Some(NEW_IP)),
        MockDnsProvider::with_record("abc", "5.6.7.8"),
        Notifier::new(Arc::new(sink.clone())),
        config,
    );
    let report = engine.reconcile(true).await;

    assert!(report.forced);
    assert!(report.notified);
    assert_eq!(
        sink.wait_for(1),
        vec![(
            Severity::Info,
            "IP (5.6.7.8) for home.example.com has not changed.".to_string()
        )]
    );
}

#[tokio::test]
async fn completed_cycles_are_published() {
    let (mut engine, mut events) = engine_with(
        MockIpSource::new(Some(NEW_IP)),
        MockDnsProvider::with_record("abc", "1.2.3.4"),
        Notifier::log_only(),
        complete_config(),
    );
    let report = engine.reconcile(false).await;

    assert_eq!(events.recv().await, Some(EngineEvent::CycleCompleted(report)));
}

#[test]
fn incomplete_configuration_is_rejected() {
    let mut config = complete_config();
    config.zone_id.clear();

    let result = DdnsEngine::new(
        Box::new(MockIpSource::new(Some(NEW_IP))),
        Box::new(MockDnsProvider::new(None)),
        Arc::new(Notifier::log_only()),
        config,
        cfddns_core::ControlFlags::new(),
    );

    assert!(matches!(result, Err(Error::ConfigIncomplete(field)) if field == "zone_id"));
}
