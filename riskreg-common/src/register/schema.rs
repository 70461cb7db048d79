//! Sheet schema definitions
//!
//! Single source of truth for the register layout. Each sheet maps to one
//! table; each column carries the header literal used as the row-mapping
//! key and the SQL column that stores it. Column order is the sheet's
//! canonical column order.
//!
//! Every table also has a hidden `row_id` that records physical row order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One column of a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Header text, e.g. `"Risk ID"`
    pub header: &'static str,
    /// SQL column name, e.g. `"risk_id"`
    pub name: &'static str,
    /// SQLite column type
    pub sql_type: &'static str,
    /// Values must be unique when present
    pub unique: bool,
}

impl ColumnDefinition {
    const fn text(header: &'static str, name: &'static str) -> Self {
        Self {
            header,
            name,
            sql_type: "TEXT",
            unique: false,
        }
    }

    const fn integer(header: &'static str, name: &'static str) -> Self {
        Self {
            header,
            name,
            sql_type: "INTEGER",
            unique: false,
        }
    }

    const fn unique_key(header: &'static str, name: &'static str) -> Self {
        Self {
            header,
            name,
            sql_type: "TEXT",
            unique: true,
        }
    }
}

const RISK_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::unique_key("Risk ID", "risk_id"),
    ColumnDefinition::text("Title", "title"),
    ColumnDefinition::text("Description", "description"),
    ColumnDefinition::text("Category", "category"),
    ColumnDefinition::text("Probability", "probability"),
    ColumnDefinition::text("Impact", "impact"),
    ColumnDefinition::integer("Risk Score", "risk_score"),
    ColumnDefinition::text("Status", "status"),
    ColumnDefinition::text("Trend", "trend"),
    ColumnDefinition::text("Owner", "owner"),
    ColumnDefinition::text("Mitigation Plan", "mitigation_plan"),
    ColumnDefinition::text("Linked Tasks", "linked_tasks"),
    ColumnDefinition::text("Date Identified", "date_identified"),
    ColumnDefinition::text("Last Updated", "last_updated"),
    ColumnDefinition::text("Update History", "update_history"),
    ColumnDefinition::text("Source", "source"),
    ColumnDefinition::text("Closed Date", "closed_date"),
    ColumnDefinition::text("Resolution Notes", "resolution_notes"),
];

const TASK_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::unique_key("Task ID", "task_id"),
    ColumnDefinition::text("Task", "task"),
    ColumnDefinition::text("Owner", "owner"),
    ColumnDefinition::text("Due Date", "due_date"),
    ColumnDefinition::text("Status", "status"),
    ColumnDefinition::text("Linked Risk", "linked_risk"),
    ColumnDefinition::text("Source", "source"),
    ColumnDefinition::text("Created Date", "created_date"),
    ColumnDefinition::text("Completed Date", "completed_date"),
];

const UPDATE_LOG_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::text("Timestamp", "timestamp"),
    ColumnDefinition::text("Source", "source"),
    ColumnDefinition::text("Source Type", "source_type"),
    ColumnDefinition::text("Changes Made", "changes_made"),
    ColumnDefinition::text("Raw Extract", "raw_extract"),
];

const MILESTONE_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::text("Milestone ID", "milestone_id"),
    ColumnDefinition::text("Milestone", "milestone"),
    ColumnDefinition::text("Baseline Date", "baseline_date"),
    ColumnDefinition::text("Current Date", "current_date_value"),
    ColumnDefinition::integer("Variance Days", "variance_days"),
    ColumnDefinition::text("Status", "status"),
    ColumnDefinition::text("Notes", "notes"),
];

/// A sheet of the register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sheet {
    RiskRegister,
    Tasks,
    UpdateLog,
    Milestones,
}

impl Sheet {
    /// All sheets in provisioning order
    pub const ALL: [Sheet; 4] = [
        Sheet::RiskRegister,
        Sheet::Tasks,
        Sheet::UpdateLog,
        Sheet::Milestones,
    ];

    /// Sheet title as shown to users
    pub fn title(&self) -> &'static str {
        match self {
            Sheet::RiskRegister => "Risk Register",
            Sheet::Tasks => "Tasks",
            Sheet::UpdateLog => "Update Log",
            Sheet::Milestones => "Milestones",
        }
    }

    /// Look a sheet up by its title
    pub fn from_title(title: &str) -> Option<Sheet> {
        Sheet::ALL.into_iter().find(|s| s.title() == title)
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Sheet::RiskRegister => "risk_register",
            Sheet::Tasks => "tasks",
            Sheet::UpdateLog => "update_log",
            Sheet::Milestones => "milestones",
        }
    }

    pub fn columns(&self) -> &'static [ColumnDefinition] {
        match self {
            Sheet::RiskRegister => RISK_COLUMNS,
            Sheet::Tasks => TASK_COLUMNS,
            Sheet::UpdateLog => UPDATE_LOG_COLUMNS,
            Sheet::Milestones => MILESTONE_COLUMNS,
        }
    }

    /// Column whose blank value marks a row as empty
    pub fn primary_key(&self) -> &'static ColumnDefinition {
        &self.columns()[0]
    }

    /// Find a column by header text
    pub fn column(&self, header: &str) -> Option<&'static ColumnDefinition> {
        self.columns().iter().find(|c| c.header == header)
    }

    /// Milestones are provisioned externally and may be absent
    pub fn is_optional(&self) -> bool {
        matches!(self, Sheet::Milestones)
    }

    /// Only milestones are read-only to the pipeline
    pub fn is_writable(&self) -> bool {
        !matches!(self, Sheet::Milestones)
    }

    /// `CREATE TABLE` statement for this sheet
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns()
            .iter()
            .map(|c| {
                if c.unique {
                    format!("{} {} UNIQUE", c.name, c.sql_type)
                } else {
                    format!("{} {}", c.name, c.sql_type)
                }
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    row_id INTEGER PRIMARY KEY AUTOINCREMENT,\n    {}\n)",
            self.table_name(),
            columns.join(",\n    ")
        )
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_register_column_order() {
        let headers: Vec<&str> = Sheet::RiskRegister.columns().iter().map(|c| c.header).collect();
        assert_eq!(headers.len(), 18);
        assert_eq!(headers[0], "Risk ID");
        assert_eq!(headers[6], "Risk Score");
        assert_eq!(headers[15], "Source");
        assert_eq!(headers[17], "Resolution Notes");
    }

    #[test]
    fn test_primary_keys() {
        assert_eq!(Sheet::RiskRegister.primary_key().header, "Risk ID");
        assert_eq!(Sheet::Tasks.primary_key().header, "Task ID");
        assert_eq!(Sheet::UpdateLog.primary_key().header, "Timestamp");
        assert_eq!(Sheet::Milestones.primary_key().header, "Milestone ID");
    }

    #[test]
    fn test_from_title_round_trips_titles() {
        for sheet in Sheet::ALL {
            assert_eq!(Sheet::from_title(sheet.title()), Some(sheet));
        }
        assert_eq!(Sheet::from_title("Decisions"), None);
    }

    #[test]
    fn test_create_table_sql_marks_unique_keys() {
        let sql = Sheet::Tasks.create_table_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS tasks"));
        assert!(sql.contains("task_id TEXT UNIQUE"));
        assert!(sql.contains("row_id INTEGER PRIMARY KEY AUTOINCREMENT"));

        let log_sql = Sheet::UpdateLog.create_table_sql();
        assert!(!log_sql.contains("UNIQUE"));
    }

    #[test]
    fn test_milestones_read_only() {
        assert!(Sheet::Milestones.is_optional());
        assert!(!Sheet::Milestones.is_writable());
        assert!(Sheet::Tasks.is_writable());
    }
}
