//! Register Reconciler
//!
//! Orchestrates one ingestion run:
//!
//! 1. Locate the project's register (no model call if it is missing)
//! 2. Extract risks, tasks and decisions from the content
//! 3. Open the register in a write transaction
//! 4. Append one row per risk, then one per task, allocating IDs per row
//! 5. Append exactly one Update Log row
//! 6. Save once
//!
//! Every failure is folded into a [`ProcessResult`]; nothing propagates as
//! an error to front doors.

use std::collections::HashMap;
use std::sync::Arc;

use riskreg_common::register::{
    next_risk_id, next_task_id, risk_score, truncate_chars, MAX_CELL_CHARS,
};
use riskreg_common::time::{Clock, FixedClock, SystemClock};
use riskreg_common::{CellValue, Error, ProjectRegistry, RegisterHandle, RiskCategory, Sheet};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::extraction::{
    ContentExtractor, ExtractedRisk, ExtractedTask, ExtractionError, ExtractionResult,
};

/// Update Log text when an extraction added nothing
pub const NO_CHANGES: &str = "No changes made";

/// Characters of task text quoted in a change description
const TASK_PREVIEW_CHARS: usize = 50;

/// Failure classification attached to unsuccessful results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RegisterNotFound,
    ExtractionService,
    ExtractionParse,
    RegisterWrite,
    InvalidInput,
}

/// Counts reported after a successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub risks_added: usize,
    pub tasks_added: usize,
    pub decisions_found: usize,
}

/// Outcome of [`Reconciler::process`]
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub changes: Vec<String>,
    pub extracted_data: Option<ExtractionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ProcessSummary>,
}

impl ProcessResult {
    fn failed(
        kind: ErrorKind,
        message: String,
        changes: Vec<String>,
        extracted_data: Option<ExtractionResult>,
    ) -> Self {
        Self {
            success: false,
            error: Some(message),
            error_kind: Some(kind),
            changes,
            extracted_data,
            summary: None,
        }
    }
}

/// One async mutex per project code
#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a project's register
    pub async fn acquire(&self, project_code: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(project_code.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of project codes that have been locked at least once
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Runs extraction and writes the results into a project's register
pub struct Reconciler {
    registry: ProjectRegistry,
    extractor: Arc<dyn ContentExtractor>,
    clock: Arc<dyn Clock>,
    locks: Option<ProjectLocks>,
}

impl Reconciler {
    /// Reconciler on the system clock with per-project serialization on
    pub fn new(registry: ProjectRegistry, extractor: Arc<dyn ContentExtractor>) -> Self {
        Self {
            registry,
            extractor,
            clock: Arc::new(SystemClock),
            locks: Some(ProjectLocks::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Toggle in-process serialization of writes per project
    ///
    /// When off, concurrent runs against one project rely on SQLite's
    /// database lock alone.
    pub fn with_serialized_writes(mut self, enabled: bool) -> Self {
        self.locks = enabled.then(ProjectLocks::new);
        self
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Per-project locks, if serialization is enabled
    pub fn project_locks(&self) -> Option<&ProjectLocks> {
        self.locks.as_ref()
    }

    /// Hold the project's write lock, if serialization is enabled
    pub async fn lock_project(&self, project_code: &str) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(project_code).await),
            None => None,
        }
    }

    /// Extract records from `content` and append them to the register
    pub async fn process(
        &self,
        project_code: &str,
        content: &str,
        source_type: &str,
        source_name: &str,
    ) -> ProcessResult {
        // Precondition: register exists (checked before spending a model call)
        if let Err(e) = self.registry.locate(project_code) {
            let kind = match e {
                Error::RegisterNotFound(_) => ErrorKind::RegisterNotFound,
                _ => ErrorKind::InvalidInput,
            };
            warn!(project = project_code, source_name = source_name, error = %e, "Register unavailable");
            return ProcessResult::failed(kind, e.to_string(), Vec::new(), None);
        }

        let extraction = match self
            .extractor
            .extract(content, project_code, source_type)
            .await
        {
            Ok(extraction) => extraction,
            Err(e) => {
                let (kind, message) = match &e {
                    ExtractionError::Service(msg) => (
                        ErrorKind::ExtractionService,
                        format!("Extraction service error: {}", msg),
                    ),
                    ExtractionError::Parse { message, raw } => {
                        debug!(raw = truncate_chars(raw, 2000), "Raw model response");
                        (
                            ErrorKind::ExtractionParse,
                            format!("Failed to parse model response: {}", message),
                        )
                    }
                    ExtractionError::ContentTooLarge { .. } => {
                        (ErrorKind::InvalidInput, e.to_string())
                    }
                };
                error!(project = project_code, source_name = source_name, error = %message, "Extraction failed");
                return ProcessResult::failed(kind, message, Vec::new(), None);
            }
        };

        for risk in &extraction.risks {
            if !risk.category.is_empty() && RiskCategory::from_label(&risk.category).is_none() {
                warn!(project = project_code, category = %risk.category, "Unrecognized risk category");
            }
        }

        let _guard = self.lock_project(project_code).await;

        let mut handle = match self.registry.open(project_code).await {
            Ok(handle) => handle,
            Err(e) => {
                let message = format!("Failed to open Risk Register: {}", e);
                error!(project = project_code, source_name = source_name, error = %message, "Register write failed");
                return ProcessResult::failed(
                    ErrorKind::RegisterWrite,
                    message,
                    Vec::new(),
                    Some(extraction),
                );
            }
        };

        let mut changes = Vec::new();
        let written = self
            .write_rows(&mut handle, &extraction, source_type, source_name, &mut changes)
            .await;

        let saved = match written {
            Ok(()) => handle.save().await,
            Err(e) => {
                if let Err(close_err) = handle.close().await {
                    warn!(error = %close_err, "Closing register after failed write");
                }
                Err(e)
            }
        };

        if let Err(e) = saved {
            let message = format!("Failed to save Risk Register: {}", e);
            error!(project = project_code, source_name = source_name, error = %message, "Register write failed");
            return ProcessResult::failed(ErrorKind::RegisterWrite, message, changes, Some(extraction));
        }

        let summary = ProcessSummary {
            risks_added: extraction.risks.len(),
            tasks_added: extraction.tasks.len(),
            decisions_found: extraction.decisions.len(),
        };

        info!(
            project = project_code,
            source_name = source_name,
            source_type = source_type,
            risks_added = summary.risks_added,
            tasks_added = summary.tasks_added,
            decisions_found = summary.decisions_found,
            "Register updated"
        );

        ProcessResult {
            success: true,
            error: None,
            error_kind: None,
            changes,
            extracted_data: Some(extraction),
            summary: Some(summary),
        }
    }

    /// Apply every append for one run inside the open transaction
    async fn write_rows(
        &self,
        handle: &mut RegisterHandle,
        extraction: &ExtractionResult,
        source_type: &str,
        source_name: &str,
        changes: &mut Vec<String>,
    ) -> riskreg_common::Result<()> {
        // One reading per run so IDs, dates and the log timestamp agree
        let now = FixedClock(self.clock.now());
        let today = now.today();

        for risk in &extraction.risks {
            // Re-read keys so each allocation sees rows appended earlier in this run
            let keys = handle.key_column(Sheet::RiskRegister).await?;
            let risk_id = next_risk_id(keys.iter().map(String::as_str), now.year());
            handle
                .append_row(Sheet::RiskRegister, &risk_row(&risk_id, risk, &today, source_name))
                .await?;
            changes.push(format!("Added Risk {}: {}", risk_id, risk.title));
        }

        for task in &extraction.tasks {
            let keys = handle.key_column(Sheet::Tasks).await?;
            let task_id = next_task_id(keys.iter().map(String::as_str));
            handle
                .append_row(Sheet::Tasks, &task_row(&task_id, task, &today, source_name))
                .await?;
            changes.push(format!(
                "Added Task {}: {}...",
                task_id,
                truncate_chars(&task.task, TASK_PREVIEW_CHARS)
            ));
        }

        let changes_text = if changes.is_empty() {
            NO_CHANGES.to_string()
        } else {
            changes.join("\n")
        };
        // Log what the model said; extractors without a raw payload fall back
        // to the parsed records
        let raw_extract = if extraction.raw.is_null() {
            serde_json::to_string_pretty(extraction)
        } else {
            serde_json::to_string_pretty(&extraction.raw)
        }
        .map_err(|e| Error::Internal(format!("Serialize extraction failed: {}", e)))?;

        handle
            .append_row(
                Sheet::UpdateLog,
                &[
                    ("Timestamp", CellValue::from(now.timestamp())),
                    ("Source", CellValue::from(source_name)),
                    ("Source Type", CellValue::from(source_type)),
                    ("Changes Made", CellValue::from(changes_text)),
                    (
                        "Raw Extract",
                        CellValue::from(truncate_chars(&raw_extract, MAX_CELL_CHARS)),
                    ),
                ],
            )
            .await
    }
}

fn risk_row(
    risk_id: &str,
    risk: &ExtractedRisk,
    today: &str,
    source_name: &str,
) -> Vec<(&'static str, CellValue)> {
    vec![
        ("Risk ID", CellValue::from(risk_id)),
        ("Title", CellValue::from(risk.title.as_str())),
        ("Description", CellValue::from(risk.description.as_str())),
        ("Category", CellValue::from(risk.category.as_str())),
        ("Probability", CellValue::from(risk.probability.as_str())),
        ("Impact", CellValue::from(risk.impact.as_str())),
        ("Risk Score", CellValue::from(risk_score(&risk.probability, &risk.impact))),
        ("Status", CellValue::from("Open")),
        ("Trend", CellValue::from("New")),
        ("Owner", CellValue::from(risk.owner.as_str())),
        ("Mitigation Plan", CellValue::from(risk.mitigation_plan.as_str())),
        ("Linked Tasks", CellValue::from("")),
        ("Date Identified", CellValue::from(today)),
        ("Last Updated", CellValue::from(today)),
        (
            "Update History",
            CellValue::from(format!("{}: Created from {}", today, source_name)),
        ),
        ("Source", CellValue::from(source_name)),
    ]
}

fn task_row(
    task_id: &str,
    task: &ExtractedTask,
    today: &str,
    source_name: &str,
) -> Vec<(&'static str, CellValue)> {
    vec![
        ("Task ID", CellValue::from(task_id)),
        ("Task", CellValue::from(task.task.as_str())),
        ("Owner", CellValue::from(task.owner.as_str())),
        ("Due Date", CellValue::from(task.due_date.clone().unwrap_or_default())),
        ("Status", CellValue::from("Open")),
        ("Linked Risk", CellValue::from(task.linked_risk.clone().unwrap_or_default())),
        ("Source", CellValue::from(source_name)),
        ("Created Date", CellValue::from(today)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_project_locks_are_per_project() {
        let locks = ProjectLocks::new();
        let _hb = locks.acquire("HB").await;

        // A different project is not blocked
        let rh = tokio::time::timeout(std::time::Duration::from_millis(100), locks.acquire("RH")).await;
        assert!(rh.is_ok());

        // The same project waits
        let hb_again =
            tokio::time::timeout(std::time::Duration::from_millis(100), locks.acquire("HB")).await;
        assert!(hb_again.is_err());
    }

    #[test]
    fn test_risk_row_forces_status_and_trend() {
        let risk = ExtractedRisk {
            title: "Crane delay".to_string(),
            probability: "High".to_string(),
            impact: "Low".to_string(),
            ..ExtractedRisk::default()
        };
        let row = risk_row("R-2025-001", &risk, "2025-03-01", "Standup");
        let get = |h: &str| row.iter().find(|(k, _)| *k == h).map(|(_, v)| v.clone());

        assert_eq!(get("Status"), Some(CellValue::from("Open")));
        assert_eq!(get("Trend"), Some(CellValue::from("New")));
        assert_eq!(get("Risk Score"), Some(CellValue::Integer(3)));
        assert_eq!(
            get("Update History"),
            Some(CellValue::from("2025-03-01: Created from Standup"))
        );
    }

    #[test]
    fn test_failed_result_serializes_kind() {
        let result = ProcessResult::failed(
            ErrorKind::RegisterNotFound,
            "Risk Register not found at /x".to_string(),
            Vec::new(),
            None,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "register_not_found");
        assert!(json.get("summary").is_none());
    }
}
