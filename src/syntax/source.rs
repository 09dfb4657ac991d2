// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! A loaded Go source file and its current syntax tree.

use std::path::PathBuf;

use tree_sitter::{Node, Tree};

use super::edit::{apply_edits, TextEdit};
use super::nodes::{named_children, node_text};
use super::parser::GoParser;
use crate::error::{InstrumentError, Result};

/// One `.go` file: the text captured at load time plus its current, possibly edited, form.
pub struct SourceFile {
    /// Path relative to the workspace root, with `/` separators.
    pub path: String,
    /// Absolute path on disk.
    pub abs_path: PathBuf,
    original: String,
    text: String,
    tree: Tree,
    dirty: bool,
}

impl SourceFile {
    pub fn parse(
        parser: &mut GoParser,
        path: impl Into<String>,
        abs_path: PathBuf,
        text: String,
    ) -> Result<Self> {
        let tree = parser.parse(&text)?;
        Ok(Self {
            path: path.into(),
            abs_path,
            original: text.clone(),
            text,
            tree,
            dirty: false,
        })
    }

    /// Text as it was when the file was loaded.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Current text, including any applied edits.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_test(&self) -> bool {
        self.path.ends_with("_test.go")
    }

    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Name from the `package` clause.
    pub fn package_name(&self) -> Option<&str> {
        let clause = named_children(self.root())
            .into_iter()
            .find(|n| n.kind() == "package_clause")?;
        let ident = named_children(clause).into_iter().next()?;
        Some(node_text(ident, &self.text))
    }

    /// Apply a batch of edits computed against the current text, then re-parse.
    ///
    /// An empty batch leaves the file untouched and clean.
    pub fn apply(&mut self, parser: &mut GoParser, edits: &[TextEdit]) -> Result<()> {
        if edits.is_empty() {
            return Ok(());
        }
        let updated = apply_edits(&self.text, edits).map_err(|reason| InstrumentError::EditConflict {
            path: self.path.clone(),
            reason,
        })?;
        if updated == self.text {
            return Ok(());
        }
        self.tree = parser.parse(&updated)?;
        self.text = updated;
        self.dirty = true;
        tracing::debug!(file = %self.path, edits = edits.len(), "applied edits");
        Ok(())
    }

    /// 1-based line number of a byte offset in the current text.
    pub fn line_of(&self, byte: usize) -> usize {
        let end = byte.min(self.text.len());
        self.text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("path", &self.path)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
