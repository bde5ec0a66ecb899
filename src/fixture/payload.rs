//! Dashboard data payload
//!
//! Mirrors the JSON document the dashboard frontend fetches from
//! `/projects/:id/dashboard/data`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full response of the dashboard data endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub kpis: Kpis,
    pub burndown: Burndown,
    pub status_distribution: StatusDistribution,
    pub workload: Workload,
    pub delay_analysis: DelayAnalysis,
    pub tracker_distribution: TrackerDistribution,
    pub version_progress: VersionProgress,
    pub velocity: Velocity,
    pub priority_distribution: PriorityDistribution,
    pub cumulative_flow: CumulativeFlow,
    pub cycle_time: CycleTime,
    /// Tickets in display order
    pub issues: Vec<Issue>,
    pub available_projects: Vec<Project>,
    /// Label key to localized display string
    pub labels: BTreeMap<String, String>,
}

/// Summary metrics shown on the KPI cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub completion_rate: f64,
    pub delayed_count: u32,
    pub avg_lead_time: f64,
    pub wip_count: u32,
    pub throughput: u32,
    pub due_date_rate: f64,
    pub unset_due_date_count: u32,
    pub bottleneck_rate: f64,
    pub stagnant_count: u32,
    pub assignee_concentration: String,
    pub top_assignee_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedCount {
    pub date: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Burndown {
    pub series: Vec<DatedCount>,
    pub ideal: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSeries {
    pub name: String,
    pub data: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub dates: Vec<String>,
    pub series: Vec<StatusSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadEntry {
    pub name: String,
    pub count: u32,
    pub estimated_hours: f64,
    pub spent_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub series: Vec<WorkloadEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayAnalysis {
    pub trend: Vec<DatedCount>,
    pub delay_histogram: BTreeMap<String, u32>,
    pub stagnation_histogram: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerDistribution {
    pub series: Vec<NamedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: u32,
    pub name: String,
    pub status: String,
    pub due_date: Option<String>,
    pub completed_rate: f64,
    pub estimated_hours: f64,
    pub spent_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionProgress {
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityPoint {
    pub week: String,
    pub count: u32,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub series: Vec<VelocityPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub name: String,
    pub value: u32,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityDistribution {
    pub series: Vec<PriorityEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowPoint {
    pub date: String,
    pub statuses: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeFlow {
    pub series: Vec<FlowPoint>,
    pub status_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStatus {
    pub name: String,
    pub avg_days: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTime {
    pub statuses: Vec<CycleStatus>,
}

/// One ticket row of the issue list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u32,
    pub project_name: String,
    pub subject: String,
    pub status: String,
    pub assigned_to: String,
    /// ISO date, null when unset
    pub due_date: Option<String>,
    pub delay_days: i64,
    pub stagnation_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u32,
    pub name: String,
}

/// How a ticket would be highlighted in the issue list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueClass {
    /// Past its due date
    Delayed,
    /// Untouched for a while
    Stagnant,
    /// No due date, no delay, no stagnation
    Normal,
    /// Has a due date that has not passed yet
    OnSchedule,
}

impl Issue {
    /// Classify this ticket; delay wins over stagnation
    pub fn class(&self) -> IssueClass {
        if self.delay_days > 0 {
            IssueClass::Delayed
        } else if self.stagnation_days > 0 {
            IssueClass::Stagnant
        } else if self.due_date.is_none() {
            IssueClass::Normal
        } else {
            IssueClass::OnSchedule
        }
    }
}

impl std::fmt::Display for IssueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueClass::Delayed => write!(f, "delayed"),
            IssueClass::Stagnant => write!(f, "stagnant"),
            IssueClass::Normal => write!(f, "normal"),
            IssueClass::OnSchedule => write!(f, "on-schedule"),
        }
    }
}
