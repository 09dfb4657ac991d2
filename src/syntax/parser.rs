// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tree-sitter based Go parsing.

use tree_sitter::{Parser, Tree};

use crate::error::{InstrumentError, Result};

/// Go parser backed by the tree-sitter Go grammar.
///
/// Trees keep byte ranges for every node, so edits can be expressed as byte-span
/// replacements that leave untouched text (comments, blank lines, alignment) intact.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    /// Create a parser configured for Go.
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| InstrumentError::Parser(format!("Failed to set Go language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse Go source text into a syntax tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| InstrumentError::Parser("tree-sitter returned no tree".to_string()))
    }
}

impl std::fmt::Debug for GoParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoParser").finish_non_exhaustive()
    }
}
