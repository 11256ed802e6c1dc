//! Input collection: files, folder trees and ZIP archives → virtual files.
//!
//! Each CLI input is resolved by kind:
//!
//! | Input | Logical path |
//! |-------|--------------|
//! | regular file | its file name |
//! | directory | `<dir name>/<relative path>` |
//! | `.zip` file | full in-archive path of each member |
//!
//! Everything goes through one [`VirtualFileSet`], so the allow-list and
//! logical-path dedupe apply uniformly. A failing archive is reported and
//! skipped; it never aborts collection of the other inputs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::archive::{ArchiveExpander, SkippedEntry};
use crate::config::Config;
use crate::fileset::{is_supported_name, VirtualFileSet};
use crate::models::{extension_of, file_name_of, VirtualFile};

/// What happened to one archive input.
#[derive(Debug)]
pub struct ArchiveReport {
    pub path: String,
    pub accepted: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// Result of collecting all inputs into a file set.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub accepted: usize,
    /// Names rejected by the extension allow-list.
    pub rejected: Vec<String>,
    pub archives: Vec<ArchiveReport>,
    /// Archives that could not be expanded at all, with the reason.
    pub failed_archives: Vec<(String, String)>,
}

/// Resolve every input and add the resulting virtual files to `set`.
///
/// A missing input path is an error. Archive-level failures are recorded in
/// [`IngestReport::failed_archives`] instead.
pub fn collect_inputs(
    inputs: &[PathBuf],
    config: &Config,
    set: &mut VirtualFileSet,
) -> Result<IngestReport> {
    let expander = ArchiveExpander::new(config.archive.max_bytes, &config.archive.system_prefix);
    let excludes = build_excludes(&config.ingest.exclude_globs)?;
    let mut report = IngestReport::default();

    for input in inputs {
        if !input.exists() {
            bail!("Input does not exist: {}", input.display());
        }

        if input.is_dir() {
            let scan = scan_folder(input, &excludes, config.ingest.follow_symlinks)?;
            report.rejected.extend(scan.rejected);
            let outcome = set.add(scan.files);
            report.accepted += outcome.accepted;
            report.rejected.extend(outcome.rejected);
            continue;
        }

        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| input.display().to_string());
        let is_zip = extension_of(&name).as_deref() == Some("zip");
        if !is_zip && !is_supported_name(&name) {
            report.rejected.push(name);
            continue;
        }

        let bytes = std::fs::read(input)
            .with_context(|| format!("Failed to read input: {}", input.display()))?;

        if is_zip {
            match expander.expand(&bytes) {
                Ok(outcome) => {
                    info!(
                        archive = %name,
                        accepted = outcome.accepted.len(),
                        skipped = outcome.skipped.len(),
                        "expanded archive"
                    );
                    let added = set.add(outcome.accepted);
                    report.accepted += added.accepted;
                    report.rejected.extend(added.rejected);
                    report.archives.push(ArchiveReport {
                        path: name,
                        accepted: added.accepted,
                        skipped: outcome.skipped,
                    });
                }
                Err(e) => {
                    warn!(archive = %name, error = %e, "failed to expand archive");
                    report.failed_archives.push((name, e.to_string()));
                }
            }
            continue;
        }

        let outcome = set.add(std::iter::once(VirtualFile::new(&name, bytes)));
        report.accepted += outcome.accepted;
        report.rejected.extend(outcome.rejected);
    }

    Ok(report)
}

/// Files read from a folder walk plus the names the allow-list turned away
/// before reading.
#[derive(Debug, Default)]
struct FolderScan {
    files: Vec<VirtualFile>,
    rejected: Vec<String>,
}

/// Walk a folder tree in file-name order. Logical paths are prefixed with the
/// folder's own name so the tree structure survives into the results.
/// Unsupported files are never opened.
fn scan_folder(root: &Path, excludes: &GlobSet, follow_symlinks: bool) -> Result<FolderScan> {
    let prefix = folder_name(root)?;
    let mut scan = FolderScan::default();

    let walker = WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if excludes.is_match(&rel_str) || file_name_of(&rel_str).starts_with('.') {
            continue;
        }

        let name = file_name_of(&rel_str);
        if !is_supported_name(name) {
            scan.rejected.push(name.to_string());
            continue;
        }

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let logical_path = match &prefix {
            Some(p) => format!("{}/{}", p, rel_str),
            None => rel_str,
        };
        scan.files.push(VirtualFile::new(&logical_path, bytes));
    }

    Ok(scan)
}

fn folder_name(root: &Path) -> Result<Option<String>> {
    if let Some(name) = root.file_name() {
        return Ok(Some(name.to_string_lossy().to_string()));
    }
    // `.` or `..` have no name of their own; use the resolved directory's.
    let resolved = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve folder: {}", root.display()))?;
    Ok(resolved
        .file_name()
        .map(|n| n.to_string_lossy().to_string()))
}

fn build_excludes(extra: &[String]) -> Result<GlobSet> {
    let mut patterns = vec![
        "**/.git/**".to_string(),
        "**/__MACOSX/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    patterns.extend(extra.iter().cloned());

    let mut builder = GlobSetBuilder::new();
    for pattern in &patterns {
        builder.add(
            Glob::new(pattern).with_context(|| format!("Invalid exclude glob: {}", pattern))?,
        );
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(path: &Path, body: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let opts = zip::write::SimpleFileOptions::default();
            for (name, body) in entries {
                zip.start_file(*name, opts).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn folder_paths_keep_tree_structure() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cardio");
        write(&root.join("2024/heart.pdf"), b"%PDF");
        write(&root.join("notes.txt"), b"n");
        write(&root.join("scan.png"), b"p");
        write(&root.join(".hidden.txt"), b"h");

        let mut set = VirtualFileSet::new();
        let report = collect_inputs(&[root], &Config::default(), &mut set).unwrap();
        let paths: Vec<_> = set.files().iter().map(|f| f.logical_path.as_str()).collect();
        assert_eq!(paths, vec!["cardio/2024/heart.pdf", "cardio/notes.txt"]);
        assert_eq!(report.rejected, vec!["scan.png"]);
    }

    #[test]
    fn single_file_uses_bare_name() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("Heart Attack.pdf");
        write(&file, b"%PDF");
        let mut set = VirtualFileSet::new();
        collect_inputs(&[file.clone(), file], &Config::default(), &mut set).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.files()[0].logical_path, "Heart Attack.pdf");
    }

    #[test]
    fn zip_members_keep_in_archive_paths() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("batch.zip");
        write(
            &archive,
            &zip_bytes(&[
                ("inner/a.txt", "a"),
                ("__MACOSX/inner/._a.txt", "f"),
                ("b.exe", "x"),
            ]),
        );
        let mut set = VirtualFileSet::new();
        let report = collect_inputs(&[archive], &Config::default(), &mut set).unwrap();
        assert_eq!(set.files()[0].logical_path, "inner/a.txt");
        assert_eq!(report.archives.len(), 1);
        assert_eq!(report.archives[0].accepted, 1);
        assert_eq!(report.archives[0].skipped.len(), 2);
    }

    #[test]
    fn broken_archive_is_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("broken.zip");
        let good = tmp.path().join("good.txt");
        write(&archive, b"not a zip at all");
        write(&good, b"fine");

        let mut set = VirtualFileSet::new();
        let report = collect_inputs(&[archive, good], &Config::default(), &mut set).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(report.failed_archives.len(), 1);
        assert_eq!(report.failed_archives[0].0, "broken.zip");
    }

    #[test]
    fn exclude_globs_apply_to_folder_walks() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("docs");
        write(&root.join("keep.txt"), b"k");
        write(&root.join("drafts/skip.txt"), b"s");

        let mut config = Config::default();
        config.ingest.exclude_globs = vec!["drafts/**".to_string()];
        let mut set = VirtualFileSet::new();
        collect_inputs(&[root], &config, &mut set).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.files()[0].logical_path, "docs/keep.txt");
    }

    // Reading /proc/self/mem from offset 0 fails with EIO, so any attempt to
    // load these links would abort the collection.
    #[cfg(target_os = "linux")]
    #[test]
    fn unsupported_files_are_rejected_without_reading() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("media");
        write(&root.join("notes.txt"), b"n");
        std::os::unix::fs::symlink("/proc/self/mem", root.join("movie.mp4")).unwrap();
        let loose = tmp.path().join("disk.iso");
        std::os::unix::fs::symlink("/proc/self/mem", &loose).unwrap();
        assert!(std::fs::read(&loose).is_err());

        let mut config = Config::default();
        config.ingest.follow_symlinks = true;
        let mut set = VirtualFileSet::new();
        let report = collect_inputs(&[root, loose], &config, &mut set).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.files()[0].logical_path, "media/notes.txt");
        assert_eq!(report.rejected, vec!["movie.mp4", "disk.iso"]);
    }

    #[test]
    fn missing_input_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut set = VirtualFileSet::new();
        assert!(collect_inputs(&[tmp.path().join("nope")], &Config::default(), &mut set).is_err());
    }
}
