// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Keeps test files compiling after signatures change.
//!
//! Tests never start a transaction, so every call from a test file to a function
//! that gained the handle parameter passes `nil`.

use tracing::{debug, info};

use super::propagate::{argument_insertion, package_level_nil_edits};
use super::InstrumentationManager;
use crate::callgraph::{function_decls, CallContext, CallGraph};
use crate::error::Result;
use crate::program::FileId;
use crate::syntax::nodes::descendants;
use crate::syntax::TextEdit;

impl InstrumentationManager<'_> {
    /// Pass nil to rewritten functions from every test file.
    pub fn resolve_tests(&mut self, graph: &CallGraph) -> Result<()> {
        if self.rewritten.is_empty() {
            return Ok(());
        }
        let files: Vec<FileId> = self
            .program
            .file_ids()
            .filter(|id| self.program.file(*id).is_test())
            .collect();

        let mut updated = 0usize;
        for file in files {
            let edits = self.test_call_edits(file, graph);
            if self.apply_batch(file, edits, Default::default())? {
                updated += 1;
            }
        }
        info!(files = updated, "test call sites updated");
        Ok(())
    }

    fn test_call_edits(&self, file_id: FileId, graph: &CallGraph) -> Vec<TextEdit> {
        let file = self.program.file(file_id);
        let source = file.text();
        let package = self.program.package_of(file_id);
        let imports = self.program.imports(file_id);
        let mut edits = Vec::new();

        for decl in function_decls(file.root(), source) {
            let Some(body) = decl.body else {
                continue;
            };
            let ctx = CallContext::for_decl(self.program, package.id, &imports, &decl);
            for call in descendants(body) {
                if call.kind() != "call_expression" {
                    continue;
                }
                let Some(callee) = ctx
                    .resolve_call(call, source)
                    .and_then(|key| graph.lookup(&key))
                else {
                    continue;
                };
                if !self.rewritten.contains(&callee) {
                    continue;
                }
                debug!(
                    file = %file.path,
                    line = call.start_position().row + 1,
                    callee = %graph.node(callee).key,
                    "passing nil handle from test"
                );
                if let Some(edit) = argument_insertion(call, graph.node(callee).handle_index, "nil") {
                    edits.push(edit);
                }
            }
        }
        let package_level = CallContext::package_level(self.program, package.id, &imports);
        edits.extend(package_level_nil_edits(
            file.root(),
            source,
            &package_level,
            graph,
            &self.rewritten,
        ));
        edits
    }
}
