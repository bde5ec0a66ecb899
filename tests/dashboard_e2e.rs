//! End-to-end runs against a stand-in dashboard
//!
//! A tiny page served by axum fetches `/projects/1/dashboard/data` and
//! renders it the way the real frontend does. The server has no data
//! route, so anything rendered must have come from the intercepted fixture.
//!
//! Requires Chrome/Chromium: `cargo test -- --ignored`.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use axum::response::Html;
use axum::routing::get;
use axum::Router;
use dashcheck::core::{Config, Stage};
use dashcheck::{DashcheckError, Verifier};
use tokio::sync::oneshot;

/// How the stand-in dashboard deviates from the real one
#[derive(Clone, Copy, Default)]
struct StubBehaviour {
    /// Drop rows with no delay and no stagnation
    hide_on_schedule: bool,
    /// Render the settings menu already open
    menu_open: bool,
}

const STUB_DASHBOARD: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Dashboard</title></head>
<body>
<div id="app">Loading dashboard data...</div>
<script>
const PANELS = ['kpi', 'burndown', 'issue_list'];
const HIDE_ON_SCHEDULE = __HIDE_ON_SCHEDULE__;
fetch('/projects/1/dashboard/data?tracker_id=')
  .then((r) => r.json())
  .then((data) => {
    const app = document.getElementById('app');
    app.textContent = '';

    const settings = document.createElement('div');
    const button = document.createElement('button');
    button.innerHTML =
      '<span><span>⚙️</span>' + data.labels.display_settings + '</span><span>▼</span>';
    const menu = document.createElement('div');
    menu.style.display = '__MENU_DISPLAY__';
    for (const id of PANELS) {
      const label = document.createElement('label');
      label.innerHTML = '<input type="checkbox" checked><span></span>';
      label.querySelector('span').textContent = data.labels[id];
      menu.appendChild(label);
    }
    button.addEventListener('click', () => {
      menu.style.display = menu.style.display === 'none' ? 'flex' : 'none';
    });
    settings.append(button, menu);
    app.appendChild(settings);

    const title = document.createElement('h3');
    title.textContent = data.labels.issue_list;
    app.appendChild(title);

    const table = document.createElement('table');
    for (const issue of data.issues) {
      if (HIDE_ON_SCHEDULE && issue.delay_days === 0 && issue.stagnation_days === 0) continue;
      const row = table.insertRow();
      row.insertCell().textContent = '#' + issue.id;
      row.insertCell().textContent = issue.subject;
      row.insertCell().textContent = issue.status;
    }
    app.appendChild(table);
  });
</script>
</body>
</html>
"#;

fn stub_page(behaviour: StubBehaviour) -> String {
    let menu_display = if behaviour.menu_open { "flex" } else { "none" };
    STUB_DASHBOARD
        .replace("__HIDE_ON_SCHEDULE__", &behaviour.hide_on_schedule.to_string())
        .replace("__MENU_DISPLAY__", menu_display)
}

fn find_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

async fn start_stub(port: u16, behaviour: StubBehaviour, shutdown_rx: oneshot::Receiver<()>) {
    let page = stub_page(behaviour);
    let app = Router::new().route("/", get(move || async move { Html(page) }));
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .expect("Failed to bind stub server");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .expect("Stub server error");
}

fn test_config(port: u16, name: &str) -> Config {
    let mut config = Config::default();
    config.dashboard.url = format!("http://127.0.0.1:{}", port);
    config.browser.no_sandbox = true;
    config.output.screenshot = std::env::temp_dir()
        .join(format!("dashcheck_e2e_{}", std::process::id()))
        .join(name);
    config
}

fn chrome_available(config: &Config) -> bool {
    let available = dashcheck::browser::BrowserSession::is_available(&config.browser);
    if !available {
        eprintln!("Skipping test: Chrome/Chromium not found");
    }
    available
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium
async fn test_unfiltered_issue_list_and_settings_menu() {
    let port = find_available_port();
    let config = test_config(port, "dashboard_verified.png");
    if !chrome_available(&config) {
        return;
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = tokio::spawn(start_stub(port, StubBehaviour::default(), shutdown_rx));

    let verifier = Verifier::new(config).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(90), verifier.run()).await;
    let _ = shutdown_tx.send(());
    let _ = server.await;

    let report = match result {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => panic!("Verification failed: {}", e),
        Err(_) => panic!("Verification timed out"),
    };

    assert_eq!(report.stage, Stage::Captured);
    assert!(report.mocked_requests >= 1, "data request was not intercepted");
    assert!(report.steps.iter().all(|s| s.success));

    let screenshot: PathBuf = report.screenshot.expect("screenshot path");
    let bytes = std::fs::read(&screenshot).expect("screenshot written");
    assert_eq!(&bytes[..4], b"\x89PNG");
}

/// Runs the verifier against a misbehaving stub; the run must fail
async fn run_against(behaviour: StubBehaviour, name: &str) -> Option<(Config, DashcheckError)> {
    let port = find_available_port();
    let config = test_config(port, name);
    if !chrome_available(&config) {
        return None;
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = tokio::spawn(start_stub(port, behaviour, shutdown_rx));

    let verifier = Verifier::new(config.clone()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(90), verifier.run()).await;
    let _ = shutdown_tx.send(());
    let _ = server.await;

    match result {
        Ok(Ok(report)) => panic!("verification passed at stage {}", report.stage),
        Ok(Err(e)) => Some((config, e)),
        Err(_) => panic!("Verification timed out"),
    }
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium
async fn test_filtered_on_schedule_row_fails_assertion() {
    let behaviour = StubBehaviour {
        hide_on_schedule: true,
        ..Default::default()
    };
    let Some((config, err)) = run_against(behaviour, "filtered.png").await else {
        return;
    };

    match err {
        DashcheckError::Assertion {
            locator,
            expected,
            actual,
        } => {
            assert_eq!(locator, "text=Normal Issue");
            assert_eq!(expected, "visible");
            assert_eq!(actual, "not found");
        }
        other => panic!("expected assertion, got {other}"),
    }
    assert!(!config.output.screenshot.exists());
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium
async fn test_settings_menu_open_before_click_fails_assertion() {
    let behaviour = StubBehaviour {
        menu_open: true,
        ..Default::default()
    };
    let Some((config, err)) = run_against(behaviour, "menu_open.png").await else {
        return;
    };

    match err {
        DashcheckError::Assertion {
            locator,
            expected,
            actual,
        } => {
            assert_eq!(locator, "label:has-text(\"チケット一覧\")");
            assert_eq!(expected, "hidden");
            assert_eq!(actual, "visible");
        }
        other => panic!("expected assertion, got {other}"),
    }
    assert!(!config.output.screenshot.exists());
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium
async fn test_missing_render_marker_times_out() {
    let port = find_available_port();
    let mut config = test_config(port, "never.png");
    config.wait.timeout_ms = 1_500;
    if !chrome_available(&config) {
        return;
    }

    // Serves a page that never renders the issue list
    let app = Router::new().route("/", get(|| async { Html("<p>maintenance</p>") }));
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let err = Verifier::new(config.clone()).unwrap().run().await.unwrap_err();
    server.abort();

    match err {
        DashcheckError::Timeout { what, timeout_ms } => {
            assert_eq!(what, "text=チケット一覧");
            assert_eq!(timeout_ms, 1_500);
        }
        other => panic!("expected timeout, got {other}"),
    }
    assert!(!config.output.screenshot.exists());
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium
async fn test_navigation_without_preflight_fails_when_server_is_down() {
    let port = find_available_port();
    let mut config = test_config(port, "down.png");
    config.dashboard.preflight = false;
    config.browser.request_timeout_ms = 5_000;
    if !chrome_available(&config) {
        return;
    }

    let verifier = Verifier::new(config).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(30), verifier.run()).await;
    let err = result.expect("run must not hang").unwrap_err();
    assert!(
        matches!(
            err,
            DashcheckError::Navigation(_) | DashcheckError::Timeout { .. }
        ),
        "got: {err}"
    );
}
