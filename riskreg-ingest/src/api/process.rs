//! Ingestion endpoints
//!
//! `POST /process` runs the Reconciler on posted content (plus any inline
//! attachments). Every response, including validation failures, uses the
//! `{success, error, changes}` shape so mail-flow callers can branch on
//! `success` alone.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::attachments::{process_attachments, Attachment};
use crate::reconciler::ProcessSummary;
use crate::{ApiResult, AppState};

/// Accepted `source_type` values
pub const VALID_SOURCE_TYPES: [&str; 6] =
    ["email", "meeting", "document", "chat", "other", "email_attachment"];

const REQUIRED_FIELDS: [&str; 4] = ["project", "content", "source_type", "source_name"];

/// POST /process payload
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub project: String,
    pub content: String,
    pub source_type: String,
    pub source_name: String,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

/// POST /process response
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub error: Option<String>,
    pub changes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ProcessSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments_processed: Option<Vec<String>>,
}

impl ProcessResponse {
    fn rejected(error: impl Into<String>) -> Response {
        let body = ProcessResponse {
            success: false,
            error: Some(error.into()),
            changes: Vec::new(),
            summary: None,
            attachments_processed: None,
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Names of required fields that are absent, empty or not strings
fn missing_fields(body: &Value) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .into_iter()
        .filter(|field| {
            !matches!(body.get(*field).and_then(Value::as_str), Some(s) if !s.is_empty())
        })
        .collect()
}

/// POST /process
///
/// **Request:** `{"project", "content", "source_type", "source_name", "attachments"?}`
///
/// **Errors:**
/// - 400: body not JSON, missing fields, unknown `source_type`
/// - 500: extraction or register update failed
pub async fn process_content(State(state): State<AppState>, body: Bytes) -> Response {
    let Ok(value) = serde_json::from_slice::<Value>(&body) else {
        return ProcessResponse::rejected("Request must be JSON");
    };

    let missing = missing_fields(&value);
    if !missing.is_empty() {
        return ProcessResponse::rejected(format!(
            "Missing required fields: {}",
            missing.join(", ")
        ));
    }

    let request: ProcessRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => return ProcessResponse::rejected(format!("Invalid request: {}", e)),
    };

    if !VALID_SOURCE_TYPES.contains(&request.source_type.as_str()) {
        return ProcessResponse::rejected(format!(
            "Invalid source_type. Must be one of: {}",
            VALID_SOURCE_TYPES.join(", ")
        ));
    }

    let mut content = request.content;
    let mut notes = Vec::new();
    if let Some(attachments) = request.attachments.filter(|a| !a.is_empty()) {
        info!(count = attachments.len(), "Processing attachments");
        let outcome = process_attachments(&attachments);
        content.push_str(&outcome.text);
        notes = outcome.notes;
    }

    let result = state
        .reconciler
        .process(
            &request.project,
            &content,
            &request.source_type,
            &request.source_name,
        )
        .await;

    let status = if result.success {
        StatusCode::OK
    } else {
        warn!(
            project = %request.project,
            source_name = %request.source_name,
            error = result.error.as_deref().unwrap_or(""),
            "Process request failed"
        );
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let body = ProcessResponse {
        success: result.success,
        error: result.error,
        changes: result.changes,
        summary: result.summary,
        attachments_processed: Some(notes),
    };

    (status, Json(body)).into_response()
}

/// GET /projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let projects: Vec<Value> = state
        .registry
        .list_projects()?
        .into_iter()
        .map(|code| {
            let path = state
                .registry
                .path_for(&code)
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            json!({ "code": code, "risk_register": path })
        })
        .collect();

    Ok(Json(json!({
        "count": projects.len(),
        "projects": projects,
    })))
}

/// Build ingestion routes
pub fn process_routes() -> Router<AppState> {
    Router::new()
        .route("/process", post(process_content))
        .route("/projects", get(list_projects))
}
