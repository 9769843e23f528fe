//! Document Generation Abstraction
//!
//! Turns a frozen scan snapshot into a file on disk in the requested
//! target format. The actual rendering (PDF layout, DOCX packaging) is
//! host-provided; the core only needs the resulting local path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Target document type for a generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Frozen copy of a scan record's content, taken at enqueue time.
///
/// The sync task owns this copy; later edits to the live scan record do
/// not propagate into already-queued work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    /// Recognized text content of the scan
    pub text: String,
    /// Capture timestamp as an RFC 3339 string, as recorded by the scanner
    pub captured_at: String,
    /// Optional user comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// User-assigned tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Document generator trait
///
/// Fails with a generation error on malformed input or disk-write
/// failure.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Render the snapshot into a file of the given format and return
    /// the local path of the generated document.
    async fn generate(&self, snapshot: &ScanSnapshot, format: DocumentFormat) -> Result<PathBuf>;
}
