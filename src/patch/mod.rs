// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Unified diff generation for rewritten files.
//!
//! Every dirty file becomes one diff segment with `--- a/<path>` / `+++ b/<path>`
//! headers, in (package import path, file path) order. The patch file is written
//! once, after every segment rendered.

use std::io::Write;
use std::path::Path;

use similar::{ChangeTag, TextDiff};
use tracing::{debug, info};

use crate::error::{InstrumentError, Result};
use crate::program::Program;

/// Context lines around each hunk.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// One rewritten file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub package: String,
    pub path: String,
    pub original: String,
    pub rewritten: String,
}

/// Rendered diff of one file.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: String,
    pub text: String,
    pub lines_added: usize,
    pub lines_removed: usize,
}

/// What was written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub files: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub bytes: usize,
}

/// Renders dirty files of a program into one patch.
#[derive(Debug, Clone)]
pub struct DiffEmitter {
    context_lines: usize,
}

impl Default for DiffEmitter {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }
}

impl DiffEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Dirty files in emission order.
    ///
    /// A rewritten file that no longer parses is a `SerializationFailure`.
    pub fn records(&self, program: &Program) -> Result<Vec<DiffRecord>> {
        let mut records = Vec::new();
        for id in program.dirty_files() {
            let file = program.file(id);
            if file.has_syntax_errors() {
                return Err(InstrumentError::SerializationFailure {
                    path: file.path.clone(),
                    reason: "rewritten source does not parse".to_string(),
                });
            }
            records.push(DiffRecord {
                package: program.package_of(id).import_path.clone(),
                path: file.path.clone(),
                original: file.original().to_string(),
                rewritten: file.text().to_string(),
            });
        }
        records.sort_by(|a, b| (&a.package, &a.path).cmp(&(&b.package, &b.path)));
        Ok(records)
    }

    /// Unified diff of one record.
    pub fn render_file(&self, record: &DiffRecord) -> FileDiff {
        let diff = TextDiff::from_lines(record.original.as_str(), record.rewritten.as_str());
        let mut lines_added = 0;
        let mut lines_removed = 0;
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => lines_added += 1,
                ChangeTag::Delete => lines_removed += 1,
                ChangeTag::Equal => {}
            }
        }

        let old_header = format!("a/{}", record.path);
        let new_header = format!("b/{}", record.path);
        let mut unified = diff.unified_diff();
        unified
            .context_radius(self.context_lines)
            .header(&old_header, &new_header);

        FileDiff {
            path: record.path.clone(),
            text: unified.to_string(),
            lines_added,
            lines_removed,
        }
    }

    /// Render every record, calling `progress` once per file.
    pub fn render<F>(&self, records: &[DiffRecord], mut progress: F) -> (String, PatchSummary)
    where
        F: FnMut(&FileDiff),
    {
        let mut patch = String::new();
        let mut summary = PatchSummary::default();
        for record in records {
            let file = self.render_file(record);
            debug!(file = %file.path, added = file.lines_added, removed = file.lines_removed, "rendered diff");
            progress(&file);
            summary.files += 1;
            summary.lines_added += file.lines_added;
            summary.lines_removed += file.lines_removed;
            patch.push_str(&file.text);
        }
        summary.bytes = patch.len();
        (patch, summary)
    }

    /// Render the program's changes and write them to `output` in one write.
    ///
    /// Nothing is written if any file fails to render. A run without changes
    /// writes an empty patch.
    pub fn emit<F>(&self, program: &Program, output: &Path, progress: F) -> Result<PatchSummary>
    where
        F: FnMut(&FileDiff),
    {
        let records = self.records(program)?;
        let (patch, summary) = self.render(&records, progress);
        write_atomic(output, patch.as_bytes())?;
        info!(
            path = %output.display(),
            files = summary.files,
            added = summary.lines_added,
            removed = summary.lines_removed,
            "patch written"
        );
        Ok(summary)
    }
}

/// Write `contents` to a temporary file next to `path`, then rename it into place.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| InstrumentError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(path: &str, original: &str, rewritten: &str) -> DiffRecord {
        DiffRecord {
            package: "example.com/app".to_string(),
            path: path.to_string(),
            original: original.to_string(),
            rewritten: rewritten.to_string(),
        }
    }

    #[test]
    fn test_render_file_headers_and_hunk() {
        let emitter = DiffEmitter::new();
        let diff = emitter.render_file(&record(
            "main.go",
            "package main\n\nfunc main() {\n}\n",
            "package main\n\nfunc main() {\n\twork()\n}\n",
        ));
        assert!(diff.text.starts_with("--- a/main.go\n+++ b/main.go\n@@ "));
        assert!(diff.text.contains("+\twork()\n"));
        assert_eq!(diff.lines_added, 1);
        assert_eq!(diff.lines_removed, 0);
    }

    #[test]
    fn test_missing_trailing_newline_marker() {
        let emitter = DiffEmitter::new();
        let diff = emitter.render_file(&record("a.go", "package a", "package b"));
        assert!(diff.text.contains("\\ No newline at end of file"));
    }

    #[test]
    fn test_render_concatenates_in_order_and_reports_progress() {
        let emitter = DiffEmitter::new();
        let records = vec![
            record("a.go", "package a\n", "package a\n\nvar x = 1\n"),
            record("b.go", "package a\n", "package a\n\nvar y = 2\n"),
        ];
        let mut seen = Vec::new();
        let (patch, summary) = emitter.render(&records, |f| seen.push(f.path.clone()));
        assert_eq!(seen, vec!["a.go", "b.go"]);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.bytes, patch.len());
        let a = patch.find("--- a/a.go").unwrap();
        let b = patch.find("--- a/b.go").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.diff");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let leftovers = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
