//! Core data models used throughout the batch pipeline.
//!
//! These types represent the documents, per-item processing state and
//! canonical result rows that flow from ingestion through dispatch to
//! analytics and export.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default placeholder for text fields the remote service did not report.
pub const NOT_AVAILABLE: &str = "N/A";
/// Default detected language.
pub const DEFAULT_LANGUAGE: &str = "English";
/// Default `source` column value.
pub const DEFAULT_SOURCE: &str = "AI Medical Coding System";
/// Default `document_type` column value.
pub const DEFAULT_DOCUMENT_TYPE: &str = "Patient Education";

/// An in-memory document plus identifying metadata, independent of where it
/// came from (picked file, folder entry or archive member).
///
/// Identity is `(logical_path, size)`. The logical path may encode folder or
/// archive nesting with `/`-separated segments; `name` is always the bare
/// final segment.
#[derive(Debug, Clone)]
pub struct VirtualFile {
    pub name: String,
    pub logical_path: String,
    pub content: Arc<Vec<u8>>,
    pub mime: String,
}

impl VirtualFile {
    /// Build a virtual file from its logical path and raw bytes.
    ///
    /// `\` is accepted as an alternate separator and normalized to `/`.
    pub fn new(logical_path: &str, content: Vec<u8>) -> Self {
        let logical_path = logical_path.replace('\\', "/");
        let name = file_name_of(&logical_path).to_string();
        let mime = mime_for(&name).to_string();
        Self {
            name,
            logical_path,
            content: Arc::new(content),
            mime,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Lowercased extension of the bare name, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}

impl PartialEq for VirtualFile {
    fn eq(&self, other: &Self) -> bool {
        self.logical_path == other.logical_path && self.size() == other.size()
    }
}

impl Eq for VirtualFile {}

/// Last `/`- or `\`-separated segment of a path.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

/// Lowercased extension after the final `.` of a bare file name.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_HTML: &str = "text/html";
pub const MIME_OCTET: &str = "application/octet-stream";

fn mime_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("pdf") => MIME_PDF,
        Some("doc") => MIME_DOC,
        Some("docx") => MIME_DOCX,
        Some("txt") => MIME_TEXT,
        Some("html") | Some("htm") => MIME_HTML,
        _ => MIME_OCTET,
    }
}

/// Processing state of one batch item.
///
/// Transitions are monotonic: `Queued -> Processing -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Completed | ItemState::Failed)
    }

    pub fn can_transition_to(self, next: ItemState) -> bool {
        matches!(
            (self, next),
            (ItemState::Queued, ItemState::Processing)
                | (ItemState::Processing, ItemState::Completed)
                | (ItemState::Processing, ItemState::Failed)
        )
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemState::Queued => "queued",
            ItemState::Processing => "processing",
            ItemState::Completed => "completed",
            ItemState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One virtual file wrapped with its processing state for a single run.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub file: VirtualFile,
    state: ItemState,
}

impl BatchItem {
    pub fn new(file: VirtualFile) -> Self {
        Self {
            file,
            state: ItemState::Queued,
        }
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Move to `next` if the transition is allowed. Returns whether it applied.
    pub fn advance(&mut self, next: ItemState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

/// Terminal status of a canonical result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    #[default]
    Completed,
    Error,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Completed => f.write_str("completed"),
            ResultStatus::Error => f.write_str("error"),
        }
    }
}

/// Which side a failure originated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// The request never completed or the response could not be read.
    Client,
    /// The service answered with a non-success status.
    Server,
}

fn default_na() -> String {
    NOT_AVAILABLE.to_string()
}
fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}
fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}
fn default_document_type() -> String {
    DEFAULT_DOCUMENT_TYPE.to_string()
}

/// One row per document. Every field has a defined default so consumers
/// never observe an absent value; `filepath` is always the locally-known
/// logical path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub filepath: String,
    #[serde(default = "default_na")]
    pub title: String,
    #[serde(default = "default_na")]
    pub gender: String,
    #[serde(default = "default_na")]
    pub unique_name: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default = "default_na")]
    pub icd_code_root: String,
    #[serde(default)]
    pub icd_code_hierarchy: String,
    #[serde(default)]
    pub details_description: String,
    #[serde(default)]
    pub details_score: String,
    /// Legacy alias of `icd_code_hierarchy`.
    #[serde(default)]
    pub diagnosis_codes: String,
    #[serde(default)]
    pub cpt_codes: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_document_type")]
    pub document_type: String,
    #[serde(default)]
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
}

impl CanonicalResult {
    /// A completed row holding only defaults.
    pub fn empty(filepath: &str) -> Self {
        Self {
            filepath: filepath.to_string(),
            title: default_na(),
            gender: default_na(),
            unique_name: default_na(),
            keywords: String::new(),
            icd_code_root: default_na(),
            icd_code_hierarchy: String::new(),
            details_description: String::new(),
            details_score: String::new(),
            diagnosis_codes: String::new(),
            cpt_codes: String::new(),
            language: default_language(),
            source: default_source(),
            document_type: default_document_type(),
            status: ResultStatus::Completed,
            error: None,
            error_category: None,
        }
    }

    /// An error row for a document whose analysis failed.
    pub fn failed(filepath: &str, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            error: Some(message.into()),
            error_category: Some(category),
            ..Self::empty(filepath)
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ResultStatus::Error
    }
}
