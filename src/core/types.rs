//! Shared types used across dashcheck modules
//!
//! Contains the run stage machine and per-step reports.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::{DashcheckError, Result};

/// Progress of a verification run
///
/// Runs move strictly forward through the happy path; any stage may drop
/// into `Failed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing acquired yet
    Pending,
    /// Browser, context and page are open
    Launched,
    /// Data endpoint is intercepted
    DataRouteInstalled,
    /// Page loaded the dashboard URL
    Navigated,
    /// All visibility expectations held
    Asserted,
    /// Screenshot written
    Captured,
    /// A step failed
    Failed,
}

impl Stage {
    /// The stage that follows this one on success, if any
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Pending => Some(Stage::Launched),
            Stage::Launched => Some(Stage::DataRouteInstalled),
            Stage::DataRouteInstalled => Some(Stage::Navigated),
            Stage::Navigated => Some(Stage::Asserted),
            Stage::Asserted => Some(Stage::Captured),
            Stage::Captured | Stage::Failed => None,
        }
    }

    /// Move to `to`, rejecting anything but the next stage or `Failed`
    pub fn advance(self, to: Stage) -> Result<Stage> {
        if self == Stage::Failed {
            return Err(DashcheckError::Other(format!(
                "run already failed, cannot move to {}",
                to
            )));
        }
        if to == Stage::Failed || self.next() == Some(to) {
            Ok(to)
        } else {
            Err(DashcheckError::Other(format!(
                "illegal stage transition {} -> {}",
                self, to
            )))
        }
    }

    /// Whether the run can make no further progress
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Captured | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Pending => write!(f, "pending"),
            Stage::Launched => write!(f, "launched"),
            Stage::DataRouteInstalled => write!(f, "data_route_installed"),
            Stage::Navigated => write!(f, "navigated"),
            Stage::Asserted => write!(f, "asserted"),
            Stage::Captured => write!(f, "captured"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one scenario step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Short step name
    pub step: String,
    /// Whether the step succeeded
    pub success: bool,
    /// Human-readable detail
    pub message: String,
}

impl StepReport {
    /// Create a successful report
    pub fn success(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            success: true,
            message: message.into(),
        }
    }

    /// Create a failed report
    pub fn failure(step: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            success: false,
            message: error.into(),
        }
    }
}

impl std::fmt::Display for StepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = if self.success { "ok" } else { "FAILED" };
        write!(f, "[{}] {}: {}", mark, self.step, self.message)
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// Steps in execution order
    pub steps: Vec<StepReport>,
    /// Last stage reached
    pub stage: Stage,
    /// Where the screenshot was written
    pub screenshot: Option<PathBuf>,
    /// Data requests answered from the fixture
    pub mocked_requests: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_progression() {
        let mut stage = Stage::Pending;
        for expected in [
            Stage::Launched,
            Stage::DataRouteInstalled,
            Stage::Navigated,
            Stage::Asserted,
            Stage::Captured,
        ] {
            stage = stage.advance(expected).unwrap();
        }
        assert!(stage.is_terminal());
        assert_eq!(stage.next(), None);
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        assert!(Stage::Launched.advance(Stage::Navigated).is_err());
        assert!(Stage::Asserted.advance(Stage::Launched).is_err());
    }

    #[test]
    fn test_any_stage_can_fail_but_failed_is_terminal() {
        assert_eq!(
            Stage::Navigated.advance(Stage::Failed).unwrap(),
            Stage::Failed
        );
        assert!(Stage::Failed.advance(Stage::Captured).is_err());
        assert!(Stage::Failed.is_terminal());
    }

    #[test]
    fn test_step_report_display() {
        let report = StepReport::failure("assert", "Normal Issue not found");
        assert_eq!(report.to_string(), "[FAILED] assert: Normal Issue not found");
    }
}
