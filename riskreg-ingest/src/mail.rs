//! Email attachment front door
//!
//! Mail transport lives behind [`MailSource`]; this module only turns the
//! fetched attachments into Reconciler calls, one per readable attachment.
//!
//! No transport ships with this crate and neither binary wires one in.
//! [`process_mail_attachments`] is the seam an IMAP or Graph client plugs
//! into by implementing [`MailSource`].

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::documents;
use crate::reconciler::Reconciler;
use riskreg_common::register::truncate_chars;

/// Source type recorded for attachment-derived updates
pub const EMAIL_ATTACHMENT_SOURCE: &str = "email_attachment";

/// Attachments with this much text or less are skipped
const MIN_ATTACHMENT_CHARS: usize = 50;

/// Characters of the subject kept in the source name
const SUBJECT_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),
}

/// A fetched attachment
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A fetched message that carries at least one attachment
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub subject: String,
    pub sender: String,
    pub attachments: Vec<MailAttachment>,
}

/// Mailbox access
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Messages with attachments received in the last `days_back` days,
    /// optionally restricted to subjects containing `subject_filter`
    async fn fetch_messages(
        &self,
        days_back: u32,
        subject_filter: Option<&str>,
    ) -> Result<Vec<MailMessage>, MailError>;
}

/// Outcome for one attachment
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentReport {
    pub email_subject: String,
    pub attachment: String,
    pub success: bool,
    pub risks_found: usize,
    pub tasks_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one mailbox sweep
#[derive(Debug, Clone, Serialize)]
pub struct MailProcessReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub emails_processed: usize,
    pub attachments_processed: usize,
    pub results: Vec<AttachmentReport>,
}

/// Source name recorded in the register for one attachment
pub fn attachment_source_name(subject: &str, filename: &str) -> String {
    format!(
        "Email: {} - {}",
        truncate_chars(subject, SUBJECT_PREVIEW_CHARS),
        filename
    )
}

/// Text for a mail attachment; unreadable files become a bracketed note
fn attachment_text(attachment: &MailAttachment) -> Option<String> {
    let extension = documents::extension_of(&attachment.filename);
    if !documents::is_supported(&extension) {
        return None;
    }
    Some(
        documents::extract_text(&attachment.bytes, &extension)
            .unwrap_or_else(|e| format!("[Error extracting {}: {}]", extension, e)),
    )
}

/// Fetch recent mail and run every readable attachment through the Reconciler
pub async fn process_mail_attachments(
    source: &dyn MailSource,
    reconciler: &Reconciler,
    project_code: &str,
    days_back: u32,
    subject_filter: Option<&str>,
) -> Result<MailProcessReport, MailError> {
    let messages = source.fetch_messages(days_back, subject_filter).await?;

    if messages.is_empty() {
        return Ok(MailProcessReport {
            success: false,
            message: Some("No emails with attachments found".to_string()),
            emails_processed: 0,
            attachments_processed: 0,
            results: Vec::new(),
        });
    }

    let mut results = Vec::new();

    for message in &messages {
        for attachment in &message.attachments {
            let Some(text) = attachment_text(attachment) else {
                continue;
            };
            if text.chars().count() <= MIN_ATTACHMENT_CHARS {
                continue;
            }

            let source_name = attachment_source_name(&message.subject, &attachment.filename);
            info!(project = project_code, source_name = %source_name, "Processing email attachment");

            let result = reconciler
                .process(project_code, &text, EMAIL_ATTACHMENT_SOURCE, &source_name)
                .await;

            if !result.success {
                warn!(
                    project = project_code,
                    source_name = %source_name,
                    error = result.error.as_deref().unwrap_or(""),
                    "Email attachment not processed"
                );
            }

            let summary = result.summary.unwrap_or_default();
            results.push(AttachmentReport {
                email_subject: message.subject.clone(),
                attachment: attachment.filename.clone(),
                success: result.success,
                risks_found: summary.risks_added,
                tasks_found: summary.tasks_added,
                error: result.error,
            });
        }
    }

    Ok(MailProcessReport {
        success: true,
        message: None,
        emails_processed: messages.len(),
        attachments_processed: results.len(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name_truncates_subject() {
        let subject = "S".repeat(80);
        let name = attachment_source_name(&subject, "notes.docx");
        assert_eq!(name, format!("Email: {} - notes.docx", "S".repeat(50)));
    }

    #[test]
    fn test_unsupported_attachment_has_no_text() {
        let attachment = MailAttachment {
            filename: "drawing.dwg".to_string(),
            bytes: vec![0; 100],
        };
        assert_eq!(attachment_text(&attachment), None);
    }

    #[test]
    fn test_broken_docx_becomes_note() {
        let attachment = MailAttachment {
            filename: "minutes.docx".to_string(),
            bytes: b"garbage".to_vec(),
        };
        let text = attachment_text(&attachment).unwrap();
        assert!(text.starts_with("[Error extracting .docx: "));
    }
}
