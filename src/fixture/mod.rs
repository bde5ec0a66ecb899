//! Mocked dashboard data
//!
//! The scenario serves one literal payload for every intercepted data
//! request. Its issue list must hold a delayed, a normal and a stagnant
//! ticket so that the rendered list proves nothing is filtered out.

mod payload;

pub use payload::*;

use crate::core::{DashcheckError, Result};

/// Label key of the issue list panel title
pub const LABEL_ISSUE_LIST: &str = "issue_list";
/// Label key of the settings menu trigger
pub const LABEL_DISPLAY_SETTINGS: &str = "display_settings";

const BUILTIN: &str = include_str!("../../fixtures/dashboard_data.json");

/// Ticket ids grouped by how the issue list highlights them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    pub delayed: Vec<u32>,
    pub stagnant: Vec<u32>,
    pub normal: Vec<u32>,
    pub on_schedule: Vec<u32>,
}

impl Coverage {
    /// Classes the scenario needs that have no ticket
    pub fn missing(&self) -> Vec<IssueClass> {
        let mut missing = Vec::new();
        if self.delayed.is_empty() {
            missing.push(IssueClass::Delayed);
        }
        if self.normal.is_empty() {
            missing.push(IssueClass::Normal);
        }
        if self.stagnant.is_empty() {
            missing.push(IssueClass::Stagnant);
        }
        missing
    }
}

impl DashboardPayload {
    /// The payload compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN)
    }

    /// Parse a payload from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// JSON body served to the page
    pub fn body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Group issue ids by class
    pub fn coverage(&self) -> Coverage {
        let mut coverage = Coverage::default();
        for issue in &self.issues {
            let bucket = match issue.class() {
                IssueClass::Delayed => &mut coverage.delayed,
                IssueClass::Stagnant => &mut coverage.stagnant,
                IssueClass::Normal => &mut coverage.normal,
                IssueClass::OnSchedule => &mut coverage.on_schedule,
            };
            bucket.push(issue.id);
        }
        coverage
    }

    /// Fail unless delayed, normal and stagnant tickets are all present
    pub fn validate(&self) -> Result<()> {
        let missing = self.coverage().missing();
        if missing.is_empty() {
            return Ok(());
        }

        let names: Vec<String> = missing.iter().map(|c| c.to_string()).collect();
        Err(DashcheckError::fixture(format!(
            "issues must include a {} ticket; without it the list cannot show \
             that no tickets are filtered",
            names.join(", ")
        )))
    }

    /// Display string for a label key
    pub fn label(&self, key: &str) -> Result<&str> {
        self.labels
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| DashcheckError::fixture(format!("label '{}' is missing", key)))
    }

    /// Subjects of the first delayed, normal and stagnant tickets, in list order
    pub fn expected_subjects(&self) -> Vec<&str> {
        let wanted = [IssueClass::Delayed, IssueClass::Normal, IssueClass::Stagnant];
        let mut picked: Vec<(usize, &str)> = wanted
            .iter()
            .filter_map(|class| {
                self.issues
                    .iter()
                    .position(|i| i.class() == *class)
                    .map(|pos| (pos, self.issues[pos].subject.as_str()))
            })
            .collect();
        picked.sort_by_key(|(pos, _)| *pos);
        picked.into_iter().map(|(_, subject)| subject).collect()
    }
}
