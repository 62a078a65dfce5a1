//! Document extraction boundary
//!
//! Extractors turn an uploaded file into plain text. Failures are reported as
//! values so a caller can show the message next to an empty input.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of extracting text from a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extracted {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Extracted {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            error: Some(error.into()),
        }
    }

    /// Convert into the text or an extraction error for `path`
    pub fn into_result(self, path: &Path) -> Result<String> {
        match self.error {
            Some(message) => Err(Error::Extraction {
                path: path.display().to_string(),
                message,
            }),
            None => Ok(self.text),
        }
    }
}

/// Something that can pull plain text out of file bytes
pub trait DocumentExtractor: Send + Sync {
    /// Whether this extractor handles the file extension (lowercase, no dot)
    fn supports(&self, extension: &str) -> bool;

    fn extract(&self, bytes: &[u8]) -> Extracted;
}

/// Plain text and markdown
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

impl DocumentExtractor for PlainTextExtractor {
    fn supports(&self, extension: &str) -> bool {
        matches!(extension, "txt" | "text" | "md" | "markdown")
    }

    fn extract(&self, bytes: &[u8]) -> Extracted {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(e) => {
                tracing::warn!("input is not valid UTF-8 ({}); decoding lossily", e);
                String::from_utf8_lossy(bytes).into_owned()
            }
        };
        Extracted::ok(text.replace("\r\n", "\n"))
    }
}

/// Read `path` and extract its text with the first extractor that supports it
pub fn extract_document(path: &Path, extractors: &[&dyn DocumentExtractor]) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "txt".to_string());

    let extractor = extractors
        .iter()
        .find(|extractor| extractor.supports(&extension))
        .ok_or_else(|| Error::Extraction {
            path: path.display().to_string(),
            message: format!("unsupported document format '.{}'", extension),
        })?;

    let bytes = std::fs::read(path).map_err(|e| Error::Io {
        message: format!("Failed to read {}: {}", path.display(), e),
        source: e,
    })?;
    extractor.extract(&bytes).into_result(path)
}

/// Extract with the built-in extractors
pub fn extract_text(path: &Path) -> Result<String> {
    extract_document(path, &[&PlainTextExtractor])
}
