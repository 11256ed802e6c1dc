//! Archive expansion: turns a ZIP upload into virtual files.
//!
//! Decompression sits behind the [`ArchiveSource`] capability so the entry
//! policy (directories, system artifacts, allow-list, empty members) can be
//! exercised independently of the ZIP reader. A bad member is recorded as a
//! skip; only structural failures of the container abort the expansion.

use std::io::Read;

use tracing::{debug, warn};

use crate::error::{ArchiveError, MemberError};
use crate::fileset::is_supported_name;
use crate::models::{file_name_of, VirtualFile};

/// Default upper bound on the compressed archive size (100 MiB).
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 100 * 1024 * 1024;
/// Prefix under which macOS archivers store resource forks.
pub const DEFAULT_SYSTEM_PREFIX: &str = "__MACOSX/";
/// Maximum decompressed bytes read from a single member (zip-bomb protection).
const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// One entry as listed by an archive's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub path: String,
    pub is_dir: bool,
}

/// Decompression capability: list entries, then extract them one by one.
pub trait ArchiveSource {
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError>;
    fn extract(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>, MemberError>;
}

/// [`ArchiveSource`] over an in-memory ZIP file.
pub struct ZipSource<'a> {
    archive: zip::ZipArchive<std::io::Cursor<&'a [u8]>>,
}

impl<'a> ZipSource<'a> {
    /// Open a ZIP archive. Inputs without a ZIP signature are
    /// [`ArchiveError::InvalidFormat`]; a signature with an unreadable
    /// directory is [`ArchiveError::Corrupt`].
    pub fn open(bytes: &'a [u8]) -> Result<Self, ArchiveError> {
        if !has_zip_signature(bytes) {
            return Err(ArchiveError::InvalidFormat);
        }
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
        Ok(Self { archive })
    }
}

impl ArchiveSource for ZipSource<'_> {
    /// Lists entries from the central directory only. Local headers are not
    /// touched here, so a damaged or encrypted member surfaces from
    /// [`ArchiveSource::extract`] as a per-member failure.
    fn entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let path = self.archive.name_for_index(index).ok_or_else(|| {
                ArchiveError::Corrupt(format!("missing directory record {}", index))
            })?;
            entries.push(ArchiveEntry {
                index,
                path: path.to_string(),
                is_dir: path.ends_with('/') || path.ends_with('\\'),
            });
        }
        Ok(entries)
    }

    fn extract(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>, MemberError> {
        let file = self
            .archive
            .by_index(entry.index)
            .map_err(|e| MemberError::Extraction(e.to_string()))?;
        let mut out = Vec::new();
        file.take(MAX_ENTRY_BYTES)
            .read_to_end(&mut out)
            .map_err(|e| MemberError::Extraction(e.to_string()))?;
        if out.len() as u64 >= MAX_ENTRY_BYTES {
            return Err(MemberError::TooLarge(MAX_ENTRY_BYTES));
        }
        Ok(out)
    }
}

fn has_zip_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
        || bytes.starts_with(b"PK\x05\x06")
        || bytes.starts_with(b"PK\x07\x08")
}

/// Why an archive member was not turned into a virtual file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// OS metadata such as `__MACOSX/` forks or dotfiles.
    SystemArtifact,
    Unsupported,
    Failed(MemberError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::SystemArtifact => f.write_str("system file"),
            SkipReason::Unsupported => f.write_str("unsupported format"),
            SkipReason::Failed(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: SkipReason,
}

/// Accepted files in archive order plus everything that was skipped.
/// Directory entries appear in neither list.
#[derive(Debug, Default)]
pub struct ExpandOutcome {
    pub accepted: Vec<VirtualFile>,
    pub skipped: Vec<SkippedEntry>,
}

/// Applies the entry policy to an archive.
#[derive(Debug, Clone)]
pub struct ArchiveExpander {
    max_bytes: u64,
    system_prefix: String,
}

impl Default for ArchiveExpander {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ARCHIVE_BYTES, DEFAULT_SYSTEM_PREFIX)
    }
}

impl ArchiveExpander {
    pub fn new(max_bytes: u64, system_prefix: &str) -> Self {
        Self {
            max_bytes,
            system_prefix: system_prefix.to_string(),
        }
    }

    /// Expand a ZIP archive held in memory. The size limit is checked before
    /// any decompression is attempted.
    pub fn expand(&self, bytes: &[u8]) -> Result<ExpandOutcome, ArchiveError> {
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(ArchiveError::SizeExceeded {
                size,
                max: self.max_bytes,
            });
        }
        let mut source = ZipSource::open(bytes)?;
        self.expand_source(&mut source)
    }

    /// Apply the entry policy to any [`ArchiveSource`].
    pub fn expand_source(
        &self,
        source: &mut dyn ArchiveSource,
    ) -> Result<ExpandOutcome, ArchiveError> {
        let mut outcome = ExpandOutcome::default();

        for entry in source.entries()? {
            let path = entry.path.replace('\\', "/");
            let name = file_name_of(&path);
            if entry.is_dir || name.is_empty() {
                continue;
            }

            let reason = if self.is_system_artifact(&path) {
                Some(SkipReason::SystemArtifact)
            } else if !is_supported_name(name) {
                Some(SkipReason::Unsupported)
            } else {
                None
            };
            if let Some(reason) = reason {
                debug!(path = %path, %reason, "skipping archive entry");
                outcome.skipped.push(SkippedEntry { path, reason });
                continue;
            }

            match source.extract(&entry) {
                Ok(bytes) if bytes.is_empty() => {
                    warn!(path = %path, "archive entry is empty");
                    outcome.skipped.push(SkippedEntry {
                        path,
                        reason: SkipReason::Failed(MemberError::Empty),
                    });
                }
                Ok(bytes) => outcome.accepted.push(VirtualFile::new(&path, bytes)),
                Err(e) => {
                    warn!(path = %path, error = %e, "failed to extract archive entry");
                    outcome.skipped.push(SkippedEntry {
                        path,
                        reason: SkipReason::Failed(e),
                    });
                }
            }
        }

        Ok(outcome)
    }

    fn is_system_artifact(&self, path: &str) -> bool {
        if !self.system_prefix.is_empty() && path.starts_with(&self.system_prefix) {
            return true;
        }
        path.split('/').any(|segment| segment.starts_with('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_zip(entries: &[(&str, Option<&str>)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let opts = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            for (name, body) in entries {
                match body {
                    None => zip.add_directory(*name, opts).unwrap(),
                    Some(body) => {
                        zip.start_file(*name, opts).unwrap();
                        zip.write_all(body.as_bytes()).unwrap();
                    }
                }
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn mixed_archive_accepts_two_and_skips_two() {
        let bytes = build_zip(&[
            ("docs/", None),
            ("__MACOSX/docs/._a.pdf", Some("fork")),
            ("docs/empty.txt", Some("")),
            ("docs/a.pdf", Some("%PDF-1.4")),
            ("b.txt", Some("hello")),
        ]);
        let outcome = ArchiveExpander::default().expand(&bytes).unwrap();
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.skipped.len(), 2);

        assert_eq!(outcome.accepted[0].logical_path, "docs/a.pdf");
        assert_eq!(outcome.accepted[0].name, "a.pdf");
        assert_eq!(outcome.accepted[1].logical_path, "b.txt");

        assert_eq!(outcome.skipped[0].reason, SkipReason::SystemArtifact);
        assert_eq!(
            outcome.skipped[1].reason,
            SkipReason::Failed(MemberError::Empty)
        );
    }

    #[test]
    fn dot_segments_and_unsupported_are_skipped() {
        let bytes = build_zip(&[
            (".hidden/a.txt", Some("x")),
            ("notes/.DS_Store", Some("x")),
            ("img/scan.png", Some("x")),
            ("deep/nested/path/c.DOCX", Some("x")),
        ]);
        let outcome = ArchiveExpander::default().expand(&bytes).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].logical_path, "deep/nested/path/c.DOCX");
        let reasons: Vec<_> = outcome.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::SystemArtifact,
                SkipReason::SystemArtifact,
                SkipReason::Unsupported
            ]
        );
    }

    #[test]
    fn oversize_archive_fails_before_decompression() {
        let expander = ArchiveExpander::new(4, DEFAULT_SYSTEM_PREFIX);
        let err = expander.expand(b"definitely not checked").unwrap_err();
        assert!(matches!(err, ArchiveError::SizeExceeded { size: 22, max: 4 }));
    }

    #[test]
    fn non_zip_input_is_invalid_format() {
        let err = ArchiveExpander::default().expand(b"plain text").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidFormat));
    }

    #[test]
    fn truncated_zip_is_corrupt() {
        let mut bytes = build_zip(&[("a.txt", Some("hello world"))]);
        bytes.truncate(20);
        let err = ArchiveExpander::default().expand(&bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt(_)));
    }

    /// Offset of the `n`th (0-based) occurrence of `signature` in `bytes`.
    fn nth_record(bytes: &[u8], signature: &[u8; 4], n: usize) -> usize {
        bytes
            .windows(4)
            .enumerate()
            .filter(|(_, w)| *w == signature)
            .nth(n)
            .map(|(pos, _)| pos)
            .unwrap()
    }

    #[test]
    fn damaged_local_header_skips_only_that_member() {
        let mut bytes = build_zip(&[
            ("good1.txt", Some("first")),
            ("bad.txt", Some("middle")),
            ("good2.txt", Some("last")),
        ]);
        let header = nth_record(&bytes, b"PK\x03\x04", 1);
        bytes[header + 2] = 0xFF;

        let outcome = ArchiveExpander::default().expand(&bytes).unwrap();
        let accepted: Vec<_> = outcome
            .accepted
            .iter()
            .map(|f| f.logical_path.as_str())
            .collect();
        assert_eq!(accepted, vec!["good1.txt", "good2.txt"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].path, "bad.txt");
        assert!(matches!(
            outcome.skipped[0].reason,
            SkipReason::Failed(MemberError::Extraction(_))
        ));
    }

    #[test]
    fn encrypted_member_is_skipped() {
        let mut bytes = build_zip(&[("good.txt", Some("open")), ("secret.txt", Some("shh"))]);
        // General purpose flag bit 0 marks the member as encrypted, in both
        // its local header and its central directory record.
        let local = nth_record(&bytes, b"PK\x03\x04", 1);
        bytes[local + 6] |= 0x01;
        let central = nth_record(&bytes, b"PK\x01\x02", 1);
        bytes[central + 8] |= 0x01;

        let outcome = ArchiveExpander::default().expand(&bytes).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].logical_path, "good.txt");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].path, "secret.txt");
        assert!(matches!(
            outcome.skipped[0].reason,
            SkipReason::Failed(MemberError::Extraction(_))
        ));
    }

    #[test]
    fn directory_entries_are_listed_from_trailing_slash() {
        let bytes = build_zip(&[("docs/", None), ("docs/a.txt", Some("a"))]);
        let mut source = ZipSource::open(&bytes).unwrap();
        let entries = source.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].path, "docs/a.txt");
        assert!(!entries[1].is_dir);
    }

    struct FlakySource;

    impl ArchiveSource for FlakySource {
        fn entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
            Ok(vec![
                ArchiveEntry {
                    index: 0,
                    path: "bad.pdf".to_string(),
                    is_dir: false,
                },
                ArchiveEntry {
                    index: 1,
                    path: "dir\\good.txt".to_string(),
                    is_dir: false,
                },
            ])
        }

        fn extract(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>, MemberError> {
            if entry.index == 0 {
                Err(MemberError::Extraction("invalid checksum".to_string()))
            } else {
                Ok(b"ok".to_vec())
            }
        }
    }

    #[test]
    fn failing_member_does_not_abort_the_rest() {
        let outcome = ArchiveExpander::default()
            .expand_source(&mut FlakySource)
            .unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].logical_path, "dir/good.txt");
        assert_eq!(outcome.skipped[0].path, "bad.pdf");
        assert!(outcome.skipped[0].reason.to_string().contains("invalid checksum"));
    }
}
