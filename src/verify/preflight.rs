//! Dev server readiness probe

use std::time::Duration;

use crate::core::{DashcheckError, Result};

/// Check once that something answers HTTP at `url`
///
/// Any status code counts as reachable; only connect failures and timeouts
/// fail the probe.
pub async fn probe(url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    match client.get(url).send().await {
        Ok(resp) => {
            tracing::debug!(url, status = %resp.status(), "dev server answered");
            Ok(())
        }
        Err(e) if e.is_connect() || e.is_timeout() => Err(DashcheckError::navigation(format!(
            "{} is not reachable ({}). Start the dashboard dev server first",
            url, e
        ))),
        Err(e) => Err(DashcheckError::with_context(format!("probing {}", url), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_port_fails_fast_as_navigation_error() {
        // Bind then drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}", port);

        let started = std::time::Instant::now();
        let err = probe(&url, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, DashcheckError::Navigation(_)), "got {err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
