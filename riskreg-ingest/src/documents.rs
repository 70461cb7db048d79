//! Document text extraction
//!
//! Plain text formats are decoded as UTF-8 (invalid sequences replaced).
//! `.docx` files are OOXML zip packages; paragraph text is pulled from
//! `word/document.xml` and joined with newlines. `.pdf` text comes from
//! `pdf-extract`; a PDF it cannot read (corrupt, encrypted, or one that
//! makes the parser panic) degrades to a placeholder string, as does every
//! legacy `.doc`.

use std::io::{Cursor, Read};
use std::panic;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

/// Extensions whose text can be read by [`extract_text`]
pub const SUPPORTED_EXTENSIONS: [&str; 5] = [".txt", ".md", ".docx", ".pdf", ".doc"];

/// Spreadsheet attachments are acknowledged but never processed
pub const SPREADSHEET_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

const PDF_PLACEHOLDER: &str = "[Could not extract PDF]";
const DOC_PLACEHOLDER: &str = "[Could not extract .doc file]";

const DOCX_BODY_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Invalid .docx package: {0}")]
    Docx(String),
}

/// Lower-case extension with its leading dot, or empty
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub fn is_supported(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension)
}

/// Extract text from file content given its extension (as from [`extension_of`])
pub fn extract_text(bytes: &[u8], extension: &str) -> Result<String, DocumentError> {
    match extension {
        ".txt" | ".md" => Ok(decode_text(bytes)),
        ".docx" => docx_text(bytes),
        ".pdf" => Ok(pdf_text(bytes)),
        ".doc" => Ok(DOC_PLACEHOLDER.to_string()),
        other => Err(DocumentError::Unsupported(other.to_string())),
    }
}

/// Read a file from disk and extract its text
pub async fn read_document(path: &Path) -> Result<String, DocumentError> {
    let extension = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(extension_of)
        .unwrap_or_default();
    if !is_supported(&extension) {
        return Err(DocumentError::Unsupported(extension));
    }

    let bytes = tokio::fs::read(path).await?;
    extract_text(&bytes, &extension)
}

fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

fn docx_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| DocumentError::Docx(e.to_string()))?;
    let mut part = archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| DocumentError::Docx(format!("{}: {}", DOCX_BODY_PART, e)))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)?;

    Ok(docx_paragraphs(&xml).join("\n"))
}

fn pdf_text(bytes: &[u8]) -> String {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("PDF extraction failed: {}", e);
            PDF_PLACEHOLDER.to_string()
        }
        Err(_) => {
            warn!("PDF extraction panicked");
            PDF_PLACEHOLDER.to_string()
        }
    }
}

/// Text of each `<w:p>` paragraph in document order
fn docx_paragraphs(xml: &str) -> Vec<String> {
    let mut chunks: Vec<&str> = xml.split("</w:p>").collect();
    // Whatever follows the last paragraph close is not a paragraph
    chunks.pop();
    chunks.into_iter().map(run_text).collect()
}

/// Concatenate every `<w:t>` run inside one paragraph chunk
fn run_text(chunk: &str) -> String {
    let mut out = String::new();
    let mut rest = chunk;

    while let Some(start) = rest.find("<w:t") {
        let after = &rest[start + 4..];
        // Skip <w:tab>, <w:tbl>, <w:tc> and friends
        if !matches!(after.chars().next(), Some('>') | Some(' ')) {
            rest = after;
            continue;
        }
        let Some(open_end) = after.find('>') else {
            break;
        };
        if after[..open_end].ends_with('/') {
            rest = &after[open_end + 1..];
            continue;
        }
        let content = &after[open_end + 1..];
        let Some(close) = content.find("</w:t>") else {
            break;
        };
        out.push_str(&unescape_xml(&content[..close]));
        rest = &content[close + "</w:t>".len()..];
    }

    out
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
