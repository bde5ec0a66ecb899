//! Runs that end before the browser starts
//!
//! Covers the fixture coverage guarantee and the unreachable dev server
//! path; neither needs Chromium.

use std::time::{Duration, Instant};

use dashcheck::core::Config;
use dashcheck::fixture::IssueClass;
use dashcheck::{DashboardPayload, DashcheckError, Verifier};
use tokio_test::{assert_err, assert_ok};

fn unused_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

#[test]
fn test_builtin_fixture_covers_all_ticket_classes() {
    let payload = DashboardPayload::builtin().unwrap();
    assert_ok!(payload.validate());
    assert!(payload.coverage().missing().is_empty());
}

/// Without the normal ticket the two highlighted rows would still render,
/// but nothing would prove that plain tickets are not filtered out.
#[test]
fn test_fixture_without_normal_ticket_is_rejected() {
    let mut payload = DashboardPayload::builtin().unwrap();
    payload.issues.retain(|i| i.subject != "Normal Issue");

    assert_eq!(payload.coverage().missing(), vec![IssueClass::Normal]);
    assert_eq!(
        payload.expected_subjects(),
        vec!["Delayed Issue", "Stagnant Issue"]
    );

    let err = assert_err!(payload.validate());
    assert!(err.to_string().contains("normal"), "got: {err}");
}

#[test]
fn test_fixture_with_empty_issue_list_names_every_missing_class() {
    let mut payload = DashboardPayload::builtin().unwrap();
    payload.issues.clear();

    let err = payload.validate().unwrap_err();
    let msg = err.to_string();
    for class in ["delayed", "normal", "stagnant"] {
        assert!(msg.contains(class), "{class} missing from: {msg}");
    }
}

#[tokio::test]
async fn test_invalid_fixture_fails_before_touching_the_network() {
    let mut payload = DashboardPayload::builtin().unwrap();
    payload.issues.retain(|i| i.stagnation_days == 0);

    let mut config = Config::default();
    config.dashboard.url = format!("http://127.0.0.1:{}", unused_port());

    let err = Verifier::with_payload(config, payload).run().await.unwrap_err();
    assert!(matches!(err, DashcheckError::Fixture(_)), "got: {err}");
}

#[tokio::test]
async fn test_unreachable_dev_server_exits_with_navigation_error() {
    let mut config = Config::default();
    config.dashboard.url = format!("http://127.0.0.1:{}", unused_port());
    config.dashboard.preflight = true;
    config.browser.request_timeout_ms = 3_000;

    let started = Instant::now();
    let err = Verifier::new(config).unwrap().run().await.unwrap_err();

    assert!(matches!(err, DashcheckError::Navigation(_)), "got: {err}");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_running() {
    let mut config = Config::default();
    config.dashboard.url = "not a url".to_string();

    let err = Verifier::new(config).unwrap().run().await.unwrap_err();
    assert!(matches!(err, DashcheckError::Config(_)), "got: {err}");
}
