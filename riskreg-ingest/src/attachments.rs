//! Inline attachments on `/process` requests
//!
//! Attachments arrive base64-encoded (the field names used by mail-flow
//! connectors are accepted as aliases). Readable text is appended to the
//! request content; every attachment produces one note for the response.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::{info, warn};

use crate::documents::{self, SPREADSHEET_EXTENSIONS};

/// Extracted text at or below this many characters counts as empty
const MIN_TEXT_CHARS: usize = 10;

/// One attachment in a `/process` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Attachment {
    #[serde(default, alias = "name")]
    pub filename: Option<String>,

    /// Base64 file content
    #[serde(default, alias = "contentBytes")]
    pub content: Option<String>,

    #[serde(default, alias = "contentType")]
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn name(&self) -> &str {
        self.filename.as_deref().unwrap_or("unknown")
    }
}

/// Text gathered from a batch of attachments plus one note per attachment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentOutcome {
    /// Sections to append to the request content (empty if nothing readable)
    pub text: String,
    pub notes: Vec<String>,
}

pub fn process_attachments(attachments: &[Attachment]) -> AttachmentOutcome {
    let mut sections = Vec::new();
    let mut notes = Vec::new();

    for attachment in attachments {
        let filename = attachment.name();
        let extension = documents::extension_of(filename);

        if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
            notes.push(format!(
                "[Attachment: {} - Excel file noted but not processed]",
                filename
            ));
            continue;
        }

        if !documents::is_supported(&extension) {
            notes.push(format!(
                "[Attachment: {} - Unsupported format {}]",
                filename, extension
            ));
            continue;
        }

        let text = STANDARD
            .decode(attachment.content.as_deref().unwrap_or("").trim())
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                documents::extract_text(&bytes, &extension).map_err(|e| e.to_string())
            });

        match text {
            Ok(text) if text.trim().chars().count() > MIN_TEXT_CHARS => {
                let chars = text.chars().count();
                info!(attachment = filename, chars = chars, "Extracted attachment text");
                sections.push(format!("\n\n--- ATTACHMENT: {} ---\n{}", filename, text));
                notes.push(format!("[Processed attachment: {} ({} chars)]", filename, chars));
            }
            Ok(_) => {
                notes.push(format!(
                    "[Attachment: {} - No text content extracted]",
                    filename
                ));
            }
            Err(e) => {
                warn!(attachment = filename, error = %e, "Attachment could not be read");
                notes.push(format!("[Attachment: {} - Error: {}]", filename, e));
            }
        }
    }

    AttachmentOutcome {
        text: sections.join("\n"),
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, bytes: &[u8]) -> Attachment {
        Attachment {
            filename: Some(name.to_string()),
            content: Some(STANDARD.encode(bytes)),
            content_type: None,
        }
    }

    #[test]
    fn test_text_attachment_appended() {
        let outcome = process_attachments(&[attachment("notes.txt", b"Crane booking slipped a week")]);
        assert_eq!(
            outcome.text,
            "\n\n--- ATTACHMENT: notes.txt ---\nCrane booking slipped a week"
        );
        assert_eq!(outcome.notes, vec!["[Processed attachment: notes.txt (28 chars)]"]);
    }

    #[test]
    fn test_docx_attachment_appended() {
        let bytes = crate::documents::tests::docx_bytes(&["Transformer lead time is 40 weeks"]);
        let outcome = process_attachments(&[attachment("minutes.docx", &bytes)]);
        assert!(outcome.text.contains("Transformer lead time is 40 weeks"));
        assert!(outcome.notes[0].starts_with("[Processed attachment: minutes.docx"));
    }

    #[test]
    fn test_excel_and_unsupported_noted() {
        let outcome = process_attachments(&[
            attachment("budget.xlsx", b"PK"),
            attachment("photo.png", b"\x89PNG"),
        ]);
        assert!(outcome.text.is_empty());
        assert_eq!(
            outcome.notes,
            vec![
                "[Attachment: budget.xlsx - Excel file noted but not processed]",
                "[Attachment: photo.png - Unsupported format .png]",
            ]
        );
    }

    #[test]
    fn test_short_text_not_appended() {
        let outcome = process_attachments(&[attachment("ok.md", b"  ok  ")]);
        assert!(outcome.text.is_empty());
        assert_eq!(outcome.notes, vec!["[Attachment: ok.md - No text content extracted]"]);
    }

    #[test]
    fn test_bad_base64_reported() {
        let bad = Attachment {
            filename: Some("notes.txt".to_string()),
            content: Some("***".to_string()),
            content_type: None,
        };
        let outcome = process_attachments(&[bad]);
        assert!(outcome.notes[0].starts_with("[Attachment: notes.txt - Error: "));
    }

    #[test]
    fn test_connector_field_aliases() {
        let parsed: Attachment = serde_json::from_str(
            r#"{"name": "a.txt", "contentBytes": "aGVsbG8=", "contentType": "text/plain"}"#,
        )
        .unwrap();
        assert_eq!(parsed.name(), "a.txt");
        assert_eq!(parsed.content.as_deref(), Some("aGVsbG8="));
        assert_eq!(parsed.content_type.as_deref(), Some("text/plain"));
    }
}
