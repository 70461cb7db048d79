//! Scripted ContentExtractor
//!
//! Returns canned model text (run through the real response parser) or a
//! service failure, and counts how often it was called.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use riskreg_ingest::extraction::{
    parse_model_response, ContentExtractor, ExtractionError, ExtractionResult,
};

enum Script {
    Respond(String),
    Fail(String),
}

pub struct FakeExtractor {
    script: Script,
    calls: AtomicUsize,
    contents: Mutex<Vec<String>>,
}

impl FakeExtractor {
    /// Always answer with this completion text
    pub fn responding(text: impl Into<String>) -> Self {
        Self::new(Script::Respond(text.into()))
    }

    /// Always answer with this JSON value
    pub fn responding_json(value: serde_json::Value) -> Self {
        Self::responding(value.to_string())
    }

    /// Always fail as the model service would
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(Script::Fail(message.into()))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            contents: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Content passed on each call, in order
    pub fn contents(&self) -> Vec<String> {
        self.contents.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentExtractor for FakeExtractor {
    async fn extract(
        &self,
        content: &str,
        _project_code: &str,
        _source_type: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contents.lock().unwrap().push(content.to_string());

        match &self.script {
            Script::Respond(text) => parse_model_response(text),
            Script::Fail(message) => Err(ExtractionError::Service(message.clone())),
        }
    }
}
