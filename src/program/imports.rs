// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-file import tables.

use crate::syntax::nodes::{descendants, node_text};
use crate::syntax::SourceFile;

/// One `import` spec of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    /// Name the package is referred to by in this file (`_` and `.` kept as written).
    pub name: String,
    pub path: String,
    pub explicit_alias: bool,
}

/// Imports of a single file.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    entries: Vec<ImportEntry>,
}

impl ImportTable {
    /// Build the table for `file`. `package_name` resolves the declared name of
    /// loaded packages; anything else falls back to [`default_package_name`].
    pub fn from_file(file: &SourceFile, package_name: impl Fn(&str) -> Option<String>) -> Self {
        let source = file.text();
        let mut entries = Vec::new();
        for node in descendants(file.root()) {
            if node.kind() != "import_spec" {
                continue;
            }
            let Some(path_node) = node.child_by_field_name("path") else {
                continue;
            };
            let path = unquote(node_text(path_node, source));
            let alias = node
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string());
            let explicit_alias = alias.is_some();
            let name = alias
                .or_else(|| package_name(&path))
                .unwrap_or_else(|| default_package_name(&path));
            entries.push(ImportEntry {
                name,
                path,
                explicit_alias,
            });
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    /// Import path bound to a local package name.
    pub fn path_for(&self, name: &str) -> Option<&str> {
        if name == "_" || name == "." {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.path.as_str())
    }

    /// Local name under which `path` is imported.
    pub fn name_for(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.path == path && e.name != "_" && e.name != ".")
            .map(|e| e.name.as_str())
    }

    /// Local names introduced by the imports.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.name != "_" && e.name != ".")
            .map(|e| e.name.as_str())
    }
}

fn unquote(literal: &str) -> String {
    literal.trim_matches(|c| c == '"' || c == '`').to_string()
}

/// Package name Go tooling assumes for an import path it has not loaded.
///
/// Major-version suffixes are skipped (`github.com/x/y/v3` is `y`) and
/// `gopkg.in` version selectors are stripped (`gopkg.in/yaml.v3` is `yaml`).
pub fn default_package_name(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 {
        if let Some(last) = segments.last() {
            if is_major_version(last) {
                segments.pop();
            }
        }
    }
    let last = segments.last().copied().unwrap_or(path);
    let last = match last.find(".v") {
        Some(idx) if path.starts_with("gopkg.in/") => &last[..idx],
        _ => last,
    };
    last.replace('-', "_")
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}
