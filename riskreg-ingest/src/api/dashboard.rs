//! Dashboard API endpoints
//!
//! Read side of the registers plus manual task entry. Without a `project`
//! query parameter, list endpoints aggregate across every provisioned
//! project; rows are always tagged with their `project`.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use riskreg_common::register::{next_task_id, truncate_chars, MAX_CELL_CHARS};
use riskreg_common::time::{Clock, FixedClock};
use riskreg_common::{CellValue, Sheet};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::dashboard::{milestone_summary, project_stats, recent_updates, ProjectData};
use crate::{ApiError, ApiResult, AppState};

/// Update Log source for manual entries
pub const DASHBOARD_SOURCE: &str = "Dashboard";

const DEFAULT_UPDATE_LIMIT: usize = 10;

/// Common query parameters
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub project: Option<String>,
    pub limit: Option<usize>,
}

/// POST /api/tasks payload
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub project: Option<String>,
    pub task: Option<String>,
    pub owner: Option<String>,
    pub due_date: Option<String>,
}

/// Load one project, or every project when `project` is `None`
async fn load(state: &AppState, project: Option<&str>) -> ApiResult<ProjectData> {
    match project.filter(|p| !p.is_empty()) {
        Some(code) => Ok(ProjectData::load(&state.registry, code).await?.tagged(code)),
        None => {
            let mut combined = ProjectData::default();
            for code in state.registry.list_projects()? {
                combined.extend(ProjectData::load(&state.registry, &code).await?.tagged(&code));
            }
            Ok(combined)
        }
    }
}

/// GET /api/risks
pub async fn get_risks(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Value>> {
    let risks = load(&state, query.project.as_deref()).await?.risks;
    Ok(Json(json!({
        "success": true,
        "count": risks.len(),
        "risks": risks,
    })))
}

/// GET /api/tasks
pub async fn get_tasks(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Value>> {
    let tasks = load(&state, query.project.as_deref()).await?.tasks;
    Ok(Json(json!({
        "success": true,
        "count": tasks.len(),
        "tasks": tasks,
    })))
}

/// GET /api/updates
pub async fn get_updates(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Value>> {
    let updates = load(&state, query.project.as_deref()).await?.updates;
    let updates = recent_updates(updates, query.limit.unwrap_or(DEFAULT_UPDATE_LIMIT));
    Ok(Json(json!({
        "success": true,
        "count": updates.len(),
        "updates": updates,
    })))
}

/// GET /api/milestones
pub async fn get_milestones(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Value>> {
    let milestones = load(&state, query.project.as_deref()).await?.milestones;
    let summary = milestone_summary(&milestones);
    Ok(Json(json!({
        "success": true,
        "count": milestones.len(),
        "milestones": milestones,
        "summary": summary,
    })))
}

/// GET /api/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<Value>> {
    let data = load(&state, query.project.as_deref()).await?;
    let clock = FixedClock(state.reconciler.clock().now());
    let stats = project_stats(&data, clock.now().date());
    Ok(Json(json!({
        "success": true,
        "stats": stats,
        "last_updated": clock.timestamp(),
    })))
}

/// GET /api/portfolio
///
/// Projects whose register cannot be read are logged and left out.
pub async fn get_portfolio(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let today = state.reconciler.clock().now().date();
    let mut portfolio = Vec::new();

    for code in state.registry.list_projects()? {
        match ProjectData::load(&state.registry, &code).await {
            Ok(data) => portfolio.push(json!({
                "code": code,
                "stats": project_stats(&data, today),
            })),
            Err(e) => warn!(project = %code, error = %e, "Skipping unreadable register"),
        }
    }

    Ok(Json(json!({
        "success": true,
        "count": portfolio.len(),
        "projects": portfolio,
    })))
}

/// POST /api/tasks
///
/// **Request:** `{"project": "HB", "task": "...", "owner"?, "due_date"?}`
///
/// **Errors:**
/// - 400: task or project missing, invalid project code
/// - 404: no register for the project
pub async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<Json<Value>> {
    let task_text = payload
        .task
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Task description required".to_string()))?;
    let project = payload
        .project
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Project required".to_string()))?;
    let owner = payload
        .owner
        .filter(|o| !o.trim().is_empty())
        .unwrap_or_else(|| crate::extraction::DEFAULT_OWNER.to_string());
    let due_date = payload.due_date.filter(|d| !d.trim().is_empty());

    // Resolve the register before taking a lock so unknown codes leave no trace
    state.registry.locate(&project).map_err(|e| not_found_as_project(e, &project))?;

    let reconciler = &state.reconciler;
    let _guard = reconciler.lock_project(&project).await;
    let clock = FixedClock(reconciler.clock().now());

    let mut handle = state
        .registry
        .open(&project)
        .await
        .map_err(|e| not_found_as_project(e, &project))?;

    let keys = handle.key_column(Sheet::Tasks).await?;
    let task_id = next_task_id(keys.iter().map(String::as_str));
    let today = clock.today();

    let new_task = json!({
        "Task ID": task_id,
        "Task": task_text,
        "Owner": owner,
        "Due Date": due_date,
        "Status": "Open",
        "Source": DASHBOARD_SOURCE,
        "Created Date": today,
    });

    let written = async {
        handle
            .append_row(
                Sheet::Tasks,
                &[
                    ("Task ID", CellValue::from(task_id.as_str())),
                    ("Task", CellValue::from(task_text.as_str())),
                    ("Owner", CellValue::from(owner.as_str())),
                    ("Due Date", CellValue::from(due_date.clone())),
                    ("Status", CellValue::from("Open")),
                    ("Source", CellValue::from(DASHBOARD_SOURCE)),
                    ("Created Date", CellValue::from(today.as_str())),
                ],
            )
            .await?;
        handle
            .append_row(
                Sheet::UpdateLog,
                &[
                    ("Timestamp", CellValue::from(clock.timestamp())),
                    ("Source", CellValue::from(DASHBOARD_SOURCE)),
                    ("Source Type", CellValue::from("dashboard")),
                    (
                        "Changes Made",
                        CellValue::from(format!(
                            "Added Task {}: {}...",
                            task_id,
                            truncate_chars(&task_text, 50)
                        )),
                    ),
                    (
                        "Raw Extract",
                        CellValue::from(truncate_chars(&new_task.to_string(), MAX_CELL_CHARS)),
                    ),
                ],
            )
            .await
    }
    .await;

    match written {
        Ok(()) => handle.save().await?,
        Err(e) => {
            if let Err(close_err) = handle.close().await {
                warn!(error = %close_err, "Closing register after failed write");
            }
            return Err(e.into());
        }
    }

    info!(project = %project, task_id = %task_id, "Task created from dashboard");

    Ok(Json(json!({
        "success": true,
        "task": new_task,
    })))
}

fn not_found_as_project(err: riskreg_common::Error, project: &str) -> ApiError {
    match err {
        riskreg_common::Error::RegisterNotFound(_) => {
            ApiError::NotFound(format!("Project {} not found", project))
        }
        other => ApiError::from(other),
    }
}

/// Build dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/api/risks", get(get_risks))
        .route("/api/tasks", get(get_tasks).post(create_task))
        .route("/api/updates", get(get_updates))
        .route("/api/milestones", get(get_milestones))
        .route("/api/stats", get(get_stats))
        .route("/api/portfolio", get(get_portfolio))
}
