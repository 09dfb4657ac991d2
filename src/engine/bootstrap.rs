// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent creation at the top of `main`.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::{InstrumentationManager, ScopeNamer};
use crate::callgraph::function_decls;
use crate::error::Result;
use crate::integrations::NEWRELIC_IMPORT;
use crate::program::FileId;
use crate::syntax::edit::insert_at_block_start;
use crate::syntax::nodes::{block_statements, descendants, node_text};
use crate::syntax::TextEdit;

impl InstrumentationManager<'_> {
    /// Create the agent in every `main` that references it without creating it.
    pub(super) fn bootstrap(&mut self) -> Result<()> {
        if !self.config.agent_bootstrap {
            return Ok(());
        }
        let files: Vec<FileId> = self
            .program
            .file_ids()
            .filter(|id| {
                !self.program.file(*id).is_test() && self.program.package_of(*id).name == "main"
            })
            .collect();

        for file in files {
            let edits = match self.bootstrap_edits(file) {
                Ok(edits) => edits,
                Err(err) if err.is_file_scoped() => {
                    self.record_file_error(file, &err);
                    continue;
                }
                Err(err) => return Err(err),
            };
            if edits.is_empty() {
                continue;
            }
            let imports: BTreeSet<&'static str> = [NEWRELIC_IMPORT, "time"].into_iter().collect();
            if self.apply_batch(file, edits, imports)? {
                info!(file = %self.program.file(file).path, "agent created in main");
            }
        }
        Ok(())
    }

    fn bootstrap_edits(&self, file_id: FileId) -> Result<Vec<TextEdit>> {
        let file = self.program.file(file_id);
        let source = file.text();
        let root = file.root();
        let imports = self.program.imports(file_id);
        let agent = self.config.agent_variable.as_str();

        let Some(main) = function_decls(root, source)
            .into_iter()
            .find(|d| d.name == "main" && d.receiver_type.is_none())
        else {
            return Ok(Vec::new());
        };
        let Some(body) = main.body else {
            return Ok(Vec::new());
        };
        let references_agent = descendants(body)
            .into_iter()
            .any(|n| n.kind() == "identifier" && node_text(n, source) == agent);
        if !references_agent || node_text(body, source).contains(".NewApplication(") {
            debug!(file = %file.path, "agent bootstrap not needed");
            return Ok(Vec::new());
        }

        let mut namer = ScopeNamer::for_function(&file.path, source, root, main.node, &imports);
        let err_name = namer.fresh("agentInitError")?;
        let newrelic = self.newrelic_name(file_id);
        let time = imports.name_for("time").unwrap_or("time");

        let mut config = format!("{}.ConfigFromEnvironment()", newrelic);
        if let Some(app_name) = &self.config.app_name {
            config.push_str(&format!(", {}.ConfigAppName({:?})", newrelic, app_name));
        }
        let lines = vec![
            format!(
                "{}, {} := {}.NewApplication({})",
                agent, err_name, newrelic, config
            ),
            format!("if {} != nil {{", err_name),
            format!("\tpanic({})", err_name),
            "}".to_string(),
            format!("defer {}.Shutdown(5 * {}.Second)", agent, time),
        ];
        let first = block_statements(body).into_iter().next();
        Ok(vec![insert_at_block_start(source, body, first, &lines)])
    }
}
