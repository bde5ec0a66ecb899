//! Dashboard verification scenario
//!
//! Launches the browser, serves the fixture for the dashboard data endpoint,
//! loads the dashboard and checks that the unfiltered issue list and the
//! display settings menu render. The first failing step ends the run; the
//! browser is closed on every path.

pub mod preflight;

use std::path::PathBuf;

use crate::browser::{BrowserSession, DataRoute, Locator, MockResponse, RoutePattern};
use crate::core::{Config, DashcheckError, Result, Stage, StepReport, VerificationReport};
use crate::fixture::{DashboardPayload, LABEL_DISPLAY_SETTINGS, LABEL_ISSUE_LIST};

/// Requests the dashboard makes for its data
pub const DATA_ROUTE: &str = "**/projects/1/dashboard/data*";

/// Stage and step bookkeeping for one run
#[derive(Debug)]
struct RunLog {
    stage: Stage,
    steps: Vec<StepReport>,
}

impl RunLog {
    fn new() -> Self {
        Self {
            stage: Stage::Pending,
            steps: Vec::new(),
        }
    }

    fn step(&mut self, step: &str, message: impl Into<String>) {
        let report = StepReport::success(step, message);
        tracing::info!("{}", report);
        self.steps.push(report);
    }

    fn reach(&mut self, stage: Stage) -> Result<()> {
        self.stage = self.stage.advance(stage)?;
        tracing::debug!(stage = %self.stage, "stage reached");
        Ok(())
    }

    fn fail(&mut self, step: &str, error: &DashcheckError) {
        let report = StepReport::failure(step, error.to_string());
        tracing::error!(stage = %self.stage, "{}", report);
        self.steps.push(report);
        self.stage = Stage::Failed;
    }
}

/// Runs the dashboard scenario against a dev server
pub struct Verifier {
    config: Config,
    payload: DashboardPayload,
}

impl Verifier {
    /// Verifier serving the built-in fixture
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_payload(config, DashboardPayload::builtin()?))
    }

    /// Verifier serving a given payload
    pub fn with_payload(config: Config, payload: DashboardPayload) -> Self {
        Self { config, payload }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the scenario end to end
    pub async fn run(&self) -> Result<VerificationReport> {
        self.config.validate()?;
        self.payload.validate()?;

        let url = self.config.dashboard.url.as_str();
        if self.config.dashboard.preflight {
            preflight::probe(url, self.config.browser.request_timeout()).await?;
        }

        let mut log = RunLog::new();
        let mut session = match BrowserSession::launch(&self.config.browser).await {
            Ok(session) => session,
            Err(e) => {
                log.fail("launch", &e);
                return Err(e);
            }
        };
        log.step("launch", "headless browser, isolated context and page ready");
        log.reach(Stage::Launched)?;

        let outcome = self.scenario(&session, &mut log).await;
        session.close().await;

        match outcome {
            Ok((screenshot, mocked_requests)) => Ok(VerificationReport {
                steps: log.steps,
                stage: log.stage,
                screenshot: Some(screenshot),
                mocked_requests,
            }),
            Err((step, e)) => {
                log.fail(step, &e);
                Err(e)
            }
        }
    }

    /// Steps 2 to 8; the failing step's name travels with the error
    async fn scenario(
        &self,
        session: &BrowserSession,
        log: &mut RunLog,
    ) -> std::result::Result<(PathBuf, usize), (&'static str, DashcheckError)> {
        let page = session.page();
        let wait = &self.config.wait;
        let issue_list = self.payload.label(LABEL_ISSUE_LIST).map_err(|e| ("fixture", e))?;
        let display_settings = self
            .payload
            .label(LABEL_DISPLAY_SETTINGS)
            .map_err(|e| ("fixture", e))?;

        // Route
        let route = async {
            let pattern = RoutePattern::new(DATA_ROUTE)?;
            let body = self.payload.body()?;
            DataRoute::install(page, pattern, MockResponse::json(body)).await
        }
        .await
        .map_err(|e| ("route", e))?;
        log.step("route", format!("{} answered from fixture", route.pattern()));
        log.reach(Stage::DataRouteInstalled).map_err(|e| ("route", e))?;

        // Navigate
        let url = &self.config.dashboard.url;
        session.goto(url).await.map_err(|e| ("navigate", e))?;
        log.step("navigate", format!("loaded {}", url));
        log.reach(Stage::Navigated).map_err(|e| ("navigate", e))?;

        // Wait for the mocked data to render
        Locator::text(issue_list)
            .wait_visible(page, wait.timeout(), wait.poll_interval())
            .await
            .map_err(|e| ("wait", e))?;
        log.step("wait", format!("\"{}\" rendered", issue_list));

        // Issue list title and every ticket row
        let mut expectations = vec![Locator::text(issue_list)];
        expectations.extend(self.payload.expected_subjects().into_iter().map(Locator::text));
        for locator in &expectations {
            locator
                .expect_visible(page, wait.expect_timeout(), wait.poll_interval())
                .await
                .map_err(|e| ("assert", e))?;
        }
        log.step(
            "assert",
            format!("{} elements visible, no ticket filtered", expectations.len()),
        );

        // Settings menu starts closed and exposes the issue list toggle
        let toggle = Locator::css("label").has_text(issue_list);
        toggle.expect_hidden(page).await.map_err(|e| ("open settings", e))?;
        Locator::role("button", display_settings)
            .click(page, wait.expect_timeout(), wait.poll_interval())
            .await
            .map_err(|e| ("open settings", e))?;
        toggle
            .expect_visible(page, wait.expect_timeout(), wait.poll_interval())
            .await
            .map_err(|e| ("open settings", e))?;
        log.step(
            "open settings",
            format!("\"{}\" menu lists \"{}\"", display_settings, issue_list),
        );

        // Everything above must have been rendered from the fixture
        let hits = route.hits();
        if hits == 0 {
            return Err(("assert", unintercepted(route.pattern())));
        }
        log.reach(Stage::Asserted).map_err(|e| ("assert", e))?;

        // Screenshot
        let path = session
            .screenshot(&self.config.output.screenshot)
            .await
            .map_err(|e| ("screenshot", e))?;
        log.step("screenshot", format!("saved to {}", path.display()));
        log.reach(Stage::Captured).map_err(|e| ("screenshot", e))?;

        if let Err(e) = route.uninstall().await {
            tracing::debug!(error = %e, "failed to disable interception");
        }
        Ok((path, hits))
    }
}

/// A render that no intercepted request could have fed
fn unintercepted(pattern: &RoutePattern) -> DashcheckError {
    DashcheckError::assertion(
        format!("route {}", pattern),
        "at least one intercepted request",
        "0 requests",
    )
}
