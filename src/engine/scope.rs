// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-scope symbol table used to synthesize fresh identifiers.

use std::collections::HashSet;

use tree_sitter::Node;

use crate::error::{InstrumentError, Result};
use crate::program::ImportTable;
use crate::syntax::nodes::{descendants, node_text, top_level_names};

/// Upper bound on numeric suffixes tried before giving up on a name.
pub const MAX_NAME_ATTEMPTS: usize = 100;

/// Names visible in one function, plus every name handed out so far.
#[derive(Debug, Clone)]
pub struct ScopeNamer {
    path: String,
    taken: HashSet<String>,
}

impl ScopeNamer {
    pub fn new<I, S>(path: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            taken: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Names in scope for `function`: file-level declarations, imports, and every
    /// identifier used inside the function.
    pub fn for_function(
        path: &str,
        source: &str,
        root: Node<'_>,
        function: Node<'_>,
        imports: &ImportTable,
    ) -> Self {
        let mut namer = Self::new(path, top_level_names(root, source));
        for name in imports.names() {
            namer.reserve(name);
        }
        for node in descendants(function) {
            if node.kind() == "identifier" {
                namer.reserve(node_text(node, source));
            }
        }
        namer
    }

    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Return `base` if free, otherwise `base1`, `base2`, ... and reserve it.
    pub fn fresh(&mut self, base: &str) -> Result<String> {
        if !self.taken.contains(base) {
            self.taken.insert(base.to_string());
            return Ok(base.to_string());
        }
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let candidate = format!("{}{}", base, attempt);
            if !self.taken.contains(&candidate) {
                tracing::debug!(base, name = %candidate, "renamed synthesized identifier");
                self.taken.insert(candidate.clone());
                return Ok(candidate);
            }
        }
        Err(InstrumentError::IdentifierCollision {
            path: self.path.clone(),
            base: base.to_string(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }
}
