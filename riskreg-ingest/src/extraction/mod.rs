//! Model Extraction Adapter
//!
//! Turns unstructured text into risk, task and decision records by asking a
//! language model to answer a fixed JSON schema.
//!
//! - [`prompt`] builds the deterministic instruction prompt
//! - [`parse`] strips code fences and validates the JSON answer
//! - [`anthropic`] is the HTTP adapter for the Messages API
//!
//! Adapters never retry; a failed call surfaces as [`ExtractionError`] and
//! the caller decides what to do next.

pub mod anthropic;
pub mod parse;
pub mod prompt;

pub use anthropic::AnthropicExtractor;
pub use parse::{parse_model_response, strip_code_fence};
pub use prompt::build_extraction_prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default rating when the model omits probability or impact
pub const DEFAULT_LEVEL: &str = "Medium";

/// Default owner when the model names nobody
pub const DEFAULT_OWNER: &str = "TBD";

/// Extraction failures
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Model call failed (transport, timeout, auth, rate limit, no completion)
    #[error("{0}")]
    Service(String),

    /// Model answered with text that is not the expected JSON shape
    #[error("{message}")]
    Parse {
        message: String,
        /// Raw completion text, kept for diagnostics
        raw: String,
    },

    /// Content rejected before calling the model
    #[error("Content too large: {chars} characters exceeds limit of {limit}")]
    ContentTooLarge { chars: usize, limit: usize },
}

impl ExtractionError {
    pub(crate) fn parse(message: impl Into<String>, raw: &str) -> Self {
        ExtractionError::Parse {
            message: message.into(),
            raw: raw.to_string(),
        }
    }
}

/// One risk proposed by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRisk {
    pub title: String,
    pub description: String,
    /// Stored verbatim; see [`riskreg_common::RiskCategory`] for known values
    pub category: String,
    pub probability: String,
    pub impact: String,
    pub owner: String,
    pub mitigation_plan: String,
}

impl Default for ExtractedRisk {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: String::new(),
            probability: DEFAULT_LEVEL.to_string(),
            impact: DEFAULT_LEVEL.to_string(),
            owner: DEFAULT_OWNER.to_string(),
            mitigation_plan: String::new(),
        }
    }
}

/// One action item proposed by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTask {
    pub task: String,
    pub owner: String,
    /// `YYYY-MM-DD` when the content names a date
    pub due_date: Option<String>,
    /// Existing risk ID the content ties this task to
    pub linked_risk: Option<String>,
}

impl Default for ExtractedTask {
    fn default() -> Self {
        Self {
            task: String::new(),
            owner: DEFAULT_OWNER.to_string(),
            due_date: None,
            linked_risk: None,
        }
    }
}

/// A decision reported back to the caller; never written to a sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDecision {
    pub decision: String,
    pub context: String,
}

/// Everything one model call produced, in model output order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub risks: Vec<ExtractedRisk>,
    pub tasks: Vec<ExtractedTask>,
    pub decisions: Vec<ExtractedDecision>,
    /// The model's JSON object as returned, before defaults were applied
    #[serde(skip)]
    pub raw: Value,
}

impl ExtractionResult {
    /// No risks and no tasks (decisions alone change nothing)
    pub fn is_empty(&self) -> bool {
        self.risks.is_empty() && self.tasks.is_empty()
    }
}

/// Source of structured records for a piece of content
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(
        &self,
        content: &str,
        project_code: &str,
        source_type: &str,
    ) -> Result<ExtractionResult, ExtractionError>;
}
