//! Batch driver: walk a file or directory, rewrite every script file, and
//! accumulate run statistics.
//!
//! One bad file never aborts a run: read and write failures are counted and
//! the walk continues. Files are only ever written whole, after every rule
//! has been applied to the in-memory text.

use std::path::{Path, PathBuf};

use glob_match::glob_match;
use serde::{Deserialize, Serialize};

use super::registry::EventRegistry;
use super::rules::{CallSiteWarning, FileChange, Rewriter, RuleCounts, RuleKind};
use crate::error::{Error, Result};
use crate::utils::io;

/// Script extension scanned by default.
pub const DEFAULT_EXTENSION: &str = "gd";

/// Directory names pruned from the walk by default: version control, IDE
/// project state, engine import caches, build/export output and temp dirs.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    ".godot",
    ".import",
    "node_modules",
    "build",
    "export",
    "exports",
    "tmp",
    "temp",
];

// ============================================================================
// Types
// ============================================================================

/// What happens when a call-site cannot be migrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Warn and keep going.
    #[default]
    Lenient,
    /// Same per-file behavior, but the run fails if anything was left unmigrated.
    Strict,
}

#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub dry_run: bool,
    pub verbose: bool,
    /// Directory names or glob patterns pruned before descending.
    pub skip_dirs: Vec<String>,
    /// Script extension without the leading dot.
    pub extension: String,
    pub strictness: Strictness,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            verbose: false,
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|d| d.to_string()).collect(),
            extension: DEFAULT_EXTENSION.to_string(),
            strictness: Strictness::Lenient,
        }
    }
}

/// A file whose text changed (written, or would be under dry-run).
#[derive(Debug, Clone, Serialize)]
pub struct ChangedFile {
    /// Path relative to the scan root.
    pub file: String,
    pub replacements: RuleCounts,
    pub written: bool,
}

/// A file that could not be read or written.
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// Counters and findings for one invocation of [`run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    pub files_processed: usize,
    pub files_modified: usize,
    pub replacements: RuleCounts,
    pub errors: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_files: Vec<ChangedFile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CallSiteWarning>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_errors: Vec<FileError>,
}

impl RunStatistics {
    /// Call-sites left unmigrated (unmapped, malformed, unsupported).
    pub fn unresolved(&self) -> usize {
        self.warnings.iter().filter(|w| w.is_unresolved()).count()
    }

    /// Fail under strict mode when anything was left unmigrated, including
    /// files that could not be read or written.
    pub fn enforce(&self, strictness: Strictness) -> Result<()> {
        if strictness != Strictness::Strict {
            return Ok(());
        }
        let unresolved = self.unresolved();
        if unresolved == 0 && self.errors == 0 {
            return Ok(());
        }

        let details = serde_json::to_value(self)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize stats".to_string())))?;
        if unresolved > 0 {
            Err(Error::migration_unmapped_events(unresolved, details))
        } else {
            Err(Error::migration_file_errors(self.errors, details))
        }
    }

    fn record_error(&mut self, file: &str, err: &Error) {
        self.errors += 1;
        self.file_errors.push(FileError {
            file: file.to_string(),
            message: err.detail_message(),
        });
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Migrate a single file or every script file under a directory.
///
/// Fails only when `path` does not exist; per-file problems are counted.
pub fn run(path: &Path, registry: &EventRegistry, options: &MigrateOptions) -> Result<RunStatistics> {
    if !path.exists() {
        return Err(Error::path_not_found(path.display().to_string()));
    }

    let rewriter = Rewriter::new()?;
    let mut stats = RunStatistics::default();

    if path.is_file() {
        let display = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        log_status!("migrate", "Processing file {}", path.display());
        process_file(path, &display, &rewriter, registry, options, &mut stats);
    } else {
        log_status!("migrate", "Processing directory {}", path.display());
        let files = collect_files(path, options, &mut stats);
        for file in &files {
            let relative = file
                .strip_prefix(path)
                .unwrap_or(file)
                .to_string_lossy()
                .to_string();
            process_file(file, &relative, &rewriter, registry, options, &mut stats);
        }
    }

    log_status!(
        "migrate",
        "{} file(s) processed, {} modified, {} replacement(s), {} warning(s), {} error(s)",
        stats.files_processed,
        stats.files_modified,
        stats.replacements.total(),
        stats.warnings.len(),
        stats.errors
    );

    Ok(stats)
}

// ============================================================================
// File walking
// ============================================================================

fn is_skipped_dir(name: &str, skip_dirs: &[String]) -> bool {
    skip_dirs
        .iter()
        .any(|pattern| pattern == name || glob_match(pattern, name))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Candidate files under `root`, in sorted walk order.
fn collect_files(root: &Path, options: &MigrateOptions, stats: &mut RunStatistics) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let root_name = root.file_name().map(|n| n.to_string_lossy().to_string());
    if let Some(name) = root_name {
        if is_skipped_dir(&name, &options.skip_dirs) {
            return files;
        }
    }

    walk_recursive(root, root, options, stats, &mut files);
    files
}

fn walk_recursive(
    dir: &Path,
    root: &Path,
    options: &MigrateOptions,
    stats: &mut RunStatistics,
    files: &mut Vec<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            let relative = dir.strip_prefix(root).unwrap_or(dir).display().to_string();
            let err = Error::internal_io(e.to_string(), Some(format!("read dir {}", dir.display())));
            report_error(options, &relative, &err);
            stats.record_error(&relative, &err);
            return;
        }
    };

    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            let name = entry.file_name().to_string_lossy().to_string();
            // Prune before descending.
            if is_skipped_dir(&name, &options.skip_dirs) {
                continue;
            }
            walk_recursive(&path, root, options, stats, files);
        } else if file_type.is_file() && has_extension(&path, &options.extension) {
            files.push(path);
        }
    }
}

// ============================================================================
// Per-file processing
// ============================================================================

fn process_file(
    path: &Path,
    relative: &str,
    rewriter: &Rewriter,
    registry: &EventRegistry,
    options: &MigrateOptions,
    stats: &mut RunStatistics,
) {
    if options.verbose {
        eprintln!("[migrate] Processing {}", relative);
    }

    let text = match io::read_text(path) {
        Ok(text) => text,
        Err(err) => {
            report_error(options, relative, &err);
            stats.record_error(relative, &err);
            return;
        }
    };

    let mut change = rewriter.rewrite(&text, registry);
    for warning in &mut change.warnings {
        warning.file = relative.to_string();
    }

    let mut written = false;
    if change.modified && !options.dry_run {
        if let Err(err) = io::write_text_atomic(path, &change.rewritten) {
            report_error(options, relative, &err);
            stats.record_error(relative, &err);
            stats.warnings.extend(change.warnings);
            return;
        }
        written = true;
        stats.files_modified += 1;
    }

    report_change(options, relative, &change, written);

    stats.files_processed += 1;
    stats.replacements.merge(&change.counts);
    if change.modified {
        stats.changed_files.push(ChangedFile {
            file: relative.to_string(),
            replacements: change.counts,
            written,
        });
    }
    stats.warnings.extend(change.warnings);
}

fn report_change(options: &MigrateOptions, relative: &str, change: &FileChange, written: bool) {
    for warning in &change.warnings {
        if options.verbose {
            eprintln!("[migrate] warning: {}:{}: {}", relative, warning.line, warning.message);
        } else {
            log_status!("migrate", "warning: {}:{}: {}", relative, warning.line, warning.message);
        }
    }

    if !options.verbose {
        return;
    }

    for replacement in &change.replacements {
        eprintln!(
            "[migrate] {}:{} {}: {} -> {}",
            relative,
            replacement.line,
            replacement.rule.label(),
            replacement.before,
            replacement.after
        );
    }

    for kind in RuleKind::ALL {
        let count = change.counts.get(kind);
        if count > 0 {
            eprintln!(
                "[migrate]   replaced {} {} call(s)",
                count,
                kind.legacy_method()
            );
        }
    }

    if written {
        eprintln!("[migrate]   file modified: {}", relative);
    } else if change.modified {
        eprintln!("[migrate]   dry run, not written: {}", relative);
    }
}

fn report_error(options: &MigrateOptions, relative: &str, err: &Error) {
    if options.verbose {
        eprintln!("[migrate] error: {}: {}", relative, err.detail_message());
    } else {
        log_status!("migrate", "error: {}: {}", relative, err.detail_message());
    }
}

// ============================================================================
// Tests
// ============================================================================
