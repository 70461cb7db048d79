//! Dashboard read model
//!
//! Aggregates register rows into the counts and health classification shown
//! on the project dashboard and portfolio view.

use chrono::NaiveDate;
use riskreg_common::time::DATE_FORMAT;
use riskreg_common::{ProjectRegistry, RegisterRow, Result, Sheet};
use serde::Serialize;
use serde_json::Value;

/// Risk statuses counted as active
const ACTIVE_STATUSES: [&str; 3] = ["Open", "Active", "Escalated"];

/// Task statuses counted as finished
const DONE_STATUSES: [&str; 2] = ["Completed", "Done"];

/// Every sheet of one register, data rows only
#[derive(Debug, Clone, Default)]
pub struct ProjectData {
    pub risks: Vec<RegisterRow>,
    pub tasks: Vec<RegisterRow>,
    pub updates: Vec<RegisterRow>,
    pub milestones: Vec<RegisterRow>,
}

impl ProjectData {
    /// Read all sheets of a project's register
    pub async fn load(registry: &ProjectRegistry, project_code: &str) -> Result<Self> {
        let mut handle = registry.open_read_only(project_code).await?;
        let data = Self {
            risks: handle.rows(Sheet::RiskRegister).await?,
            tasks: handle.rows(Sheet::Tasks).await?,
            updates: handle.rows(Sheet::UpdateLog).await?,
            milestones: handle.rows(Sheet::Milestones).await?,
        };
        handle.close().await?;
        Ok(data)
    }

    /// Tag every row with its project code
    pub fn tagged(mut self, project_code: &str) -> Self {
        for rows in [
            &mut self.risks,
            &mut self.tasks,
            &mut self.updates,
            &mut self.milestones,
        ] {
            for row in rows.iter_mut() {
                row.insert("project", Value::String(project_code.to_string()));
            }
        }
        self
    }

    pub fn extend(&mut self, other: ProjectData) {
        self.risks.extend(other.risks);
        self.tasks.extend(other.tasks);
        self.updates.extend(other.updates);
        self.milestones.extend(other.milestones);
    }
}

/// Portfolio health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Health {
    Healthy,
    Caution,
    #[serde(rename = "At Risk")]
    AtRisk,
    Critical,
}

/// Dashboard counters for one project (or several combined)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub active_risks: usize,
    pub watching_risks: usize,
    pub closed_risks: usize,
    pub total_risks: usize,
    pub open_tasks: usize,
    pub overdue_tasks: usize,
    pub total_tasks: usize,
    pub items_not_green: usize,
    pub high_priority: usize,
    pub health: Health,
}

fn status(row: &RegisterRow) -> Option<String> {
    row.text("Status")
}

fn is_open_task(row: &RegisterRow) -> bool {
    !matches!(status(row), Some(s) if DONE_STATUSES.contains(&s.as_str()))
}

fn is_overdue(row: &RegisterRow, today: NaiveDate) -> bool {
    row.text("Due Date")
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), DATE_FORMAT).ok())
        .map(|due| due < today)
        .unwrap_or(false)
}

/// Compute counters and health as of `today`
pub fn project_stats(data: &ProjectData, today: NaiveDate) -> ProjectStats {
    let count_status = |wanted: &[&str]| -> usize {
        data.risks
            .iter()
            .filter(|r| matches!(status(r), Some(s) if wanted.contains(&s.as_str())))
            .count()
    };

    let active_risks = count_status(&ACTIVE_STATUSES);
    let watching_risks = count_status(&["Watching"]);
    let closed_risks = count_status(&["Closed"]);

    let open_tasks: Vec<&RegisterRow> = data.tasks.iter().filter(|t| is_open_task(t)).collect();
    let overdue_tasks = open_tasks.iter().filter(|t| is_overdue(t, today)).count();

    let items_not_green = data
        .risks
        .iter()
        .filter(|r| matches!(status(r), Some(s) if s != "Closed"))
        .count();

    let high_priority = data
        .risks
        .iter()
        .filter(|r| {
            r.text("Probability").as_deref() == Some("High")
                && status(r).as_deref() != Some("Closed")
        })
        .count();

    ProjectStats {
        active_risks,
        watching_risks,
        closed_risks,
        total_risks: data.risks.len(),
        open_tasks: open_tasks.len(),
        overdue_tasks,
        total_tasks: data.tasks.len(),
        items_not_green,
        high_priority,
        health: classify_health(high_priority, overdue_tasks, active_risks),
    }
}

pub fn classify_health(high_priority: usize, overdue_tasks: usize, active_risks: usize) -> Health {
    if high_priority >= 3 || overdue_tasks >= 3 {
        Health::Critical
    } else if high_priority >= 1 || active_risks >= 5 {
        Health::AtRisk
    } else if active_risks > 0 {
        Health::Caution
    } else {
        Health::Healthy
    }
}

/// Milestone counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MilestoneSummary {
    pub critical: usize,
    pub at_risk: usize,
    pub on_track: usize,
    pub complete: usize,
}

pub fn milestone_summary(milestones: &[RegisterRow]) -> MilestoneSummary {
    let mut summary = MilestoneSummary::default();
    for row in milestones {
        match status(row).as_deref() {
            Some("Critical") => summary.critical += 1,
            Some("At Risk") => summary.at_risk += 1,
            Some("On Track") => summary.on_track += 1,
            Some("Complete") => summary.complete += 1,
            _ => {}
        }
    }
    summary
}

/// Newest Update Log rows first, at most `limit`
pub fn recent_updates(mut updates: Vec<RegisterRow>, limit: usize) -> Vec<RegisterRow> {
    // Timestamps are `YYYY-MM-DD HH:MM:SS`, so text order is time order
    updates.sort_by(|a, b| b.text("Timestamp").cmp(&a.text("Timestamp")));
    updates.truncate(limit);
    updates
}
