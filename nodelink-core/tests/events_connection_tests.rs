//! Tests for connection attempt telemetry

mod common;

use common::{stepping_clock, RecordingCollector};
use nodelink_core::error::TrackerError;
use nodelink_core::statistics::{ConnectDetails, ConnectEventTracker};

fn details(provider_id: &str) -> ConnectDetails {
    ConnectDetails {
        consumer_id: "0xconsumer".to_string(),
        provider_id: provider_id.to_string(),
        consumer_country: "LT".to_string(),
        provider_country: "US".to_string(),
    }
}

#[tokio::test]
async fn test_ended_without_start_fails() {
    let collector = RecordingCollector::new();
    let mut tracker = ConnectEventTracker::new(collector.clone(), stepping_clock(0, 1));

    let result = tracker.connect_ended(None).await;

    assert_eq!(result, Err(TrackerError::ConnectNotStarted));
    assert_eq!(
        result.unwrap_err().to_string(),
        "connect start not marked"
    );
    assert!(collector.events().is_empty());
}

#[tokio::test]
async fn test_canceled_without_start_fails() {
    let collector = RecordingCollector::new();
    let mut tracker = ConnectEventTracker::new(collector.clone(), stepping_clock(0, 1));

    assert_eq!(
        tracker.connect_canceled().await,
        Err(TrackerError::ConnectNotStarted)
    );
    assert!(collector.events().is_empty());
}

#[tokio::test]
async fn test_successful_attempt_emits_elapsed_time() {
    let collector = RecordingCollector::new();
    // Start read at 1_000, end read at 1_750
    let mut tracker = ConnectEventTracker::new(collector.clone(), stepping_clock(1_000, 750));

    tracker.connect_started(details("0xprovider"));
    assert!(tracker.is_started());
    tracker.connect_ended(None).await.unwrap();

    let events = collector.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.event_name, "connect_successful");
    assert_eq!(event.context["time_delta"], 750);
    assert_eq!(event.context["started_at"]["utcTime"], 1_000);
    assert_eq!(event.context["ended_at"]["utcTime"], 1_750);
    assert_eq!(event.context["connection_details"]["provider_id"], "0xprovider");
    assert_eq!(event.context["connection_details"]["consumer_country"], "LT");
    assert_eq!(event.context["connection_details"]["provider_country"], "US");
    assert!(event.context.get("error").is_none());
    assert!(!tracker.is_started());
}

#[tokio::test]
async fn test_failed_attempt_carries_error() {
    let collector = RecordingCollector::new();
    let mut tracker = ConnectEventTracker::new(collector.clone(), stepping_clock(0, 10));

    tracker.connect_started(details("0xprovider"));
    tracker
        .connect_ended(Some("Error: Connection to node failed."))
        .await
        .unwrap();

    let events = collector.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name, "connect_failed");
    assert_eq!(
        events[0].context["error"],
        "Error: Connection to node failed."
    );
}

#[tokio::test]
async fn test_canceled_attempt_swallows_collector_failure() {
    let collector = RecordingCollector::new();
    *collector.fail.lock().unwrap() = true;
    let mut tracker = ConnectEventTracker::new(collector.clone(), stepping_clock(0, 5));

    tracker.connect_started(details("0xprovider"));
    let result = tracker.connect_canceled().await;

    assert!(result.is_ok());
    assert_eq!(collector.event_names(), vec!["connect_canceled".to_string()]);
    assert_eq!(collector.events()[0].context["time_delta"], 5);
}

#[tokio::test]
async fn test_attempt_is_finalized_only_once() {
    let collector = RecordingCollector::new();
    let mut tracker = ConnectEventTracker::new(collector.clone(), stepping_clock(0, 1));

    tracker.connect_started(details("0xprovider"));
    tracker.connect_ended(None).await.unwrap();

    assert_eq!(
        tracker.connect_canceled().await,
        Err(TrackerError::ConnectNotStarted)
    );
    assert_eq!(collector.events().len(), 1);
}

#[tokio::test]
async fn test_restart_supersedes_open_attempt() {
    let collector = RecordingCollector::new();
    let mut tracker = ConnectEventTracker::new(collector.clone(), stepping_clock(0, 100));

    tracker.connect_started(details("0xfirst"));
    tracker.connect_started(details("0xsecond"));
    tracker.connect_ended(None).await.unwrap();

    let events = collector.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].context["connection_details"]["provider_id"],
        "0xsecond"
    );
    assert_eq!(events[0].context["time_delta"], 100);
}
