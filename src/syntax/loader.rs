// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Discovers and parses the Go packages under a workspace root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use super::nodes::descendants;
use super::parser::GoParser;
use super::source::SourceFile;
use crate::error::{InstrumentError, Result};
use crate::program::Program;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata", "node_modules"];

/// Options for loading packages.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Package selection patterns (`./...`, `./cmd/...`, `./internal/store`, `main.go`).
    /// Empty selects every package.
    pub patterns: Vec<String>,
    /// Sub-paths to leave out: a directory name or a root-relative path.
    pub exclude: Vec<String>,
}

/// Loads every selected package, test files included, into a [`Program`].
pub struct PackageLoader {
    root: PathBuf,
    options: LoadOptions,
    selection: Option<GlobSet>,
}

impl PackageLoader {
    pub fn new(root: impl Into<PathBuf>, options: LoadOptions) -> Result<Self> {
        let selection = if options.patterns.is_empty() {
            None
        } else {
            Some(Self::build_globset(&options.patterns)?)
        };
        Ok(Self {
            root: root.into(),
            options,
            selection,
        })
    }

    /// Translate package patterns into file globs.
    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob_text = pattern_to_glob(pattern);
            let glob = GlobBuilder::new(&glob_text)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    InstrumentError::LoadFailure(format!("invalid package pattern '{}': {}", pattern, e))
                })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| InstrumentError::LoadFailure(format!("failed to build package patterns: {}", e)))
    }

    fn is_excluded(&self, relative: &str, file_name: &str) -> bool {
        self.options.exclude.iter().any(|raw| {
            let exclusion = raw.trim_start_matches("./").trim_end_matches('/');
            !exclusion.is_empty()
                && (exclusion == file_name
                    || relative == exclusion
                    || relative.starts_with(&format!("{}/", exclusion)))
        })
    }

    fn is_selected(&self, relative: &str) -> bool {
        match &self.selection {
            Some(set) => set.is_match(relative),
            None => true,
        }
    }

    /// List selected `.go` files as `(relative, absolute)` paths, sorted.
    pub fn discover(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.root.is_dir() {
            return Err(InstrumentError::LoadFailure(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                let relative = relative_path(&self.root, e.path());
                if e.file_type().is_dir()
                    && (name.starts_with('.')
                        || name.starts_with('_')
                        || SKIPPED_DIRS.contains(&name.as_ref()))
                {
                    return false;
                }
                !self.is_excluded(&relative, &name)
            })
        {
            let entry = entry.map_err(|e| {
                InstrumentError::LoadFailure(format!("failed to walk directory: {}", e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("go") {
                continue;
            }
            let relative = relative_path(&self.root, path);
            if self.is_selected(&relative) {
                found.push((relative, path.to_path_buf()));
            }
        }
        found.sort();
        Ok(found)
    }

    /// Parse every selected file and group the files into packages.
    pub fn load(&self) -> Result<Program> {
        let module_path = read_module_path(&self.root)?;
        let mut parser = GoParser::new()?;

        // (dir, package name) -> files
        let mut groups: BTreeMap<(String, String), Vec<SourceFile>> = BTreeMap::new();
        for (relative, absolute) in self.discover()? {
            let text = std::fs::read_to_string(&absolute).map_err(|e| {
                InstrumentError::LoadFailure(format!("failed to read {}: {}", relative, e))
            })?;
            let file = SourceFile::parse(&mut parser, relative.clone(), absolute, text)?;
            if file.has_syntax_errors() {
                return Err(InstrumentError::LoadFailure(format!(
                    "{}:{}: syntax error",
                    relative,
                    first_error_line(&file)
                )));
            }
            let name = file
                .package_name()
                .ok_or_else(|| {
                    InstrumentError::LoadFailure(format!("{}: missing package clause", relative))
                })?
                .to_string();
            let dir = parent_dir(&relative);
            groups.entry((dir, name)).or_default().push(file);
        }

        let mut program = Program::new(self.root.clone(), module_path.clone());
        let mut ordered: Vec<(String, String, String, bool, Vec<SourceFile>)> = groups
            .into_iter()
            .map(|((dir, name), files)| {
                let base = import_path_for(module_path.as_deref(), &dir);
                let is_test = name.ends_with("_test") && files.iter().all(|f| f.is_test());
                let import_path = if is_test { format!("{}_test", base) } else { base };
                (import_path, name, dir, is_test, files)
            })
            .collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for (import_path, name, dir, is_test, files) in ordered {
            tracing::debug!(package = %import_path, files = files.len(), "loaded package");
            program.add_package(import_path, name, dir, is_test, files);
        }

        tracing::info!(
            packages = program.packages().len(),
            files = program.file_count(),
            "packages loaded"
        );
        Ok(program)
    }
}

fn pattern_to_glob(pattern: &str) -> String {
    let trimmed = pattern.trim().trim_start_matches("./");
    if trimmed.is_empty() || trimmed == "." {
        return "*.go".to_string();
    }
    if trimmed == "..." {
        return "**/*.go".to_string();
    }
    if let Some(dir) = trimmed.strip_suffix("/...") {
        return format!("{}/**/*.go", dir);
    }
    if trimmed.ends_with(".go") {
        return trimmed.to_string();
    }
    format!("{}/*.go", trimmed.trim_end_matches('/'))
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn parent_dir(relative: &str) -> String {
    match relative.rfind('/') {
        Some(idx) => relative[..idx].to_string(),
        None => ".".to_string(),
    }
}

fn import_path_for(module_path: Option<&str>, dir: &str) -> String {
    match (module_path, dir) {
        (Some(module), ".") => module.to_string(),
        (Some(module), dir) => format!("{}/{}", module, dir),
        (None, dir) => dir.to_string(),
    }
}

/// Module path declared by `go.mod`, if the root has one.
fn read_module_path(root: &Path) -> Result<Option<String>> {
    let go_mod = root.join("go.mod");
    if !go_mod.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&go_mod)
        .map_err(|e| InstrumentError::LoadFailure(format!("failed to read go.mod: {}", e)))?;
    Ok(parse_module_line(&content))
}

fn parse_module_line(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}

fn first_error_line(file: &SourceFile) -> usize {
    descendants(file.root())
        .into_iter()
        .find(|n| n.is_error() || n.is_missing())
        .map(|n| n.start_position().row + 1)
        .unwrap_or(1)
}
