//! The working set of virtual files for one batch.
//!
//! Normalizes picked files, folder walks and archive members into one ordered
//! collection keyed by logical path. Filtering is by extension allow-list;
//! duplicates are dropped silently.

use std::collections::HashSet;

use crate::error::IngestError;
use crate::models::{extension_of, VirtualFile};

/// Extensions the remote service can analyze (case-insensitive).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "html", "htm"];

/// Whether a bare file name ends in a supported extension.
pub fn is_supported_name(name: &str) -> bool {
    extension_of(name)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check one candidate against the allow-list.
pub fn check_supported(file: &VirtualFile) -> Result<(), IngestError> {
    if is_supported_name(&file.name) {
        Ok(())
    } else {
        Err(IngestError::UnsupportedFormat {
            name: file.name.clone(),
        })
    }
}

/// Outcome of one [`VirtualFileSet::add`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    pub accepted: usize,
    pub rejected_unsupported: usize,
    /// Names of rejected candidates, for reporting.
    pub rejected: Vec<String>,
}

/// Ordered, deduplicated collection of virtual files.
#[derive(Debug, Clone, Default)]
pub struct VirtualFileSet {
    files: Vec<VirtualFile>,
    paths: HashSet<String>,
}

impl VirtualFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add candidates in order. Unsupported extensions are counted and
    /// rejected; an already-present logical path is dropped without counting.
    pub fn add(&mut self, candidates: impl IntoIterator<Item = VirtualFile>) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        for file in candidates {
            if let Err(IngestError::UnsupportedFormat { name }) = check_supported(&file) {
                outcome.rejected_unsupported += 1;
                outcome.rejected.push(name);
                continue;
            }
            if !self.paths.insert(file.logical_path.clone()) {
                continue;
            }
            self.files.push(file);
            outcome.accepted += 1;
        }
        outcome
    }

    /// Remove the entry at `index`, keeping the order of the rest.
    pub fn remove(&mut self, index: usize) -> Option<VirtualFile> {
        if index >= self.files.len() {
            return None;
        }
        let file = self.files.remove(index);
        self.paths.remove(&file.logical_path);
        Some(file)
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }

    pub fn contains(&self, logical_path: &str) -> bool {
        self.paths.contains(logical_path)
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(VirtualFile::size).sum()
    }
}
