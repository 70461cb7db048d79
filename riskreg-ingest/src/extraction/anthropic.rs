//! Anthropic Messages API adapter
//!
//! One completion request per extraction. Transport failures, non-success
//! status codes and completions without a text block all surface as
//! [`ExtractionError::Service`]; the text that does come back goes through
//! [`parse_model_response`].

use std::time::Duration;

use async_trait::async_trait;
use riskreg_common::config::ModelConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    build_extraction_prompt, parse_model_response, ContentExtractor, ExtractionError,
    ExtractionResult,
};

const API_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("riskreg-ingest/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an unparseable completion written to the debug log
const RAW_LOG_CHARS: usize = 2000;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Extractor backed by the Anthropic Messages API
pub struct AnthropicExtractor {
    http_client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    max_content_chars: usize,
}

impl AnthropicExtractor {
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, ExtractionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Service(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_content_chars: config.max_content_chars,
        })
    }

    async fn complete(&self, prompt: String) -> Result<String, ExtractionError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Service("Model request timed out".to_string())
                } else {
                    ExtractionError::Service(format!("Network error: {}", e))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ExtractionError::Service("Invalid API key".to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExtractionError::Service("Rate limit exceeded".to_string()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Service(format!(
                "API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Service(format!("Unreadable completion: {}", e)))?;

        body.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| ExtractionError::Service("Completion contained no text".to_string()))
    }
}

#[async_trait]
impl ContentExtractor for AnthropicExtractor {
    async fn extract(
        &self,
        content: &str,
        project_code: &str,
        source_type: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        let chars = content.chars().count();
        if chars > self.max_content_chars {
            return Err(ExtractionError::ContentTooLarge {
                chars,
                limit: self.max_content_chars,
            });
        }

        debug!(
            project = project_code,
            source_type = source_type,
            chars = chars,
            model = %self.model,
            "Requesting extraction"
        );

        let text = self
            .complete(build_extraction_prompt(content, project_code, source_type))
            .await?;

        match parse_model_response(&text) {
            Ok(result) => {
                info!(
                    project = project_code,
                    risks = result.risks.len(),
                    tasks = result.tasks.len(),
                    decisions = result.decisions.len(),
                    "Extraction complete"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(project = project_code, error = %e, "Model response did not parse");
                debug!(
                    raw = riskreg_common::register::truncate_chars(&text, RAW_LOG_CHARS),
                    "Unparseable completion"
                );
                Err(e)
            }
        }
    }
}
