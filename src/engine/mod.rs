// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Instrumentation engine.
//!
//! The [`InstrumentationManager`] runs the rewriting stages over a loaded
//! [`Program`], in order:
//!
//! 1. [`inject`](InstrumentationManager::inject): integrations insert their code
//!    next to matched statements; handle-requiring matches only seed pass 2.
//! 2. [`propagate`](InstrumentationManager::propagate): thread the tracing handle
//!    from entry points down to the seeded functions.
//! 3. [`resolve_tests`](InstrumentationManager::resolve_tests): keep test call sites
//!    compiling against rewritten signatures.
//! 4. [`finish`](InstrumentationManager::finish): agent bootstrap in `main`, then
//!    the imports referenced by inserted code.
//!
//! Each stage edits a file with one batch of byte-span edits followed by a re-parse.
//! Nodes are never held across batches; later stages find their targets again in
//! the current trees.

mod bootstrap;
mod imports;
mod inject;
mod propagate;
mod scope;
mod test_resolver;

pub use propagate::{HandleState, PropagationPlan};
pub use scope::{ScopeNamer, MAX_NAME_ATTEMPTS};

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::callgraph::{CallGraph, FuncId, FuncKey};
use crate::detect::Detection;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{InstrumentError, Result};
use crate::integrations::{Catalog, NEWRELIC_IMPORT};
use crate::program::{FileId, Program};
use crate::syntax::{GoParser, TextEdit};

/// Names and switches used by generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Variable holding the agent application in `main`.
    pub agent_variable: String,
    /// Name of the tracing handle parameter and local.
    pub handle_name: String,
    /// Application name passed to the agent, if any.
    pub app_name: Option<String>,
    /// Create the agent at the top of `main` when inserted code needs it.
    pub agent_bootstrap: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_variable: "NewRelicAgent".to_string(),
            handle_name: "nrTxn".to_string(),
            app_name: None,
            agent_bootstrap: true,
        }
    }
}

/// What the engine did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSummary {
    pub files_changed: usize,
    pub functions_rewritten: usize,
    /// Go modules referenced by the imports the inserted code needs.
    pub required_modules: BTreeSet<String>,
}

/// Drives every rewriting stage over one program.
pub struct InstrumentationManager<'a> {
    program: &'a mut Program,
    catalog: &'a Catalog,
    config: &'a EngineConfig,
    sink: &'a mut DiagnosticSink,
    parser: GoParser,
    active: Vec<usize>,
    /// Modules of the active integrations.
    modules: BTreeSet<String>,
    /// Import paths referenced by code inserted into each file.
    required_imports: BTreeMap<FileId, BTreeSet<&'static str>>,
    /// Functions containing a match that needs the tracing handle.
    seeds: BTreeSet<FuncKey>,
    /// Functions whose signature gained the handle parameter in this run.
    rewritten: BTreeSet<FuncId>,
}

impl<'a> InstrumentationManager<'a> {
    pub fn new(
        program: &'a mut Program,
        catalog: &'a Catalog,
        config: &'a EngineConfig,
        detection: Detection,
        sink: &'a mut DiagnosticSink,
    ) -> Result<Self> {
        Ok(Self {
            program,
            catalog,
            config,
            sink,
            parser: GoParser::new()?,
            active: detection.active,
            modules: detection.required_modules,
            required_imports: BTreeMap::new(),
            seeds: BTreeSet::new(),
            rewritten: BTreeSet::new(),
        })
    }

    pub fn program(&self) -> &Program {
        self.program
    }

    pub fn seeds(&self) -> &BTreeSet<FuncKey> {
        &self.seeds
    }

    pub fn rewritten(&self) -> &BTreeSet<FuncId> {
        &self.rewritten
    }

    /// Run every stage with a call graph built from the loaded program.
    pub fn run(&mut self, graph: &CallGraph) -> Result<EngineSummary> {
        self.inject()?;
        self.propagate(graph)?;
        self.resolve_tests(graph)?;
        self.finish()
    }

    /// Bootstrap the agent and add imports; returns the run summary.
    pub fn finish(&mut self) -> Result<EngineSummary> {
        self.bootstrap()?;
        self.add_imports()?;
        Ok(EngineSummary {
            files_changed: self.program.dirty_files().len(),
            functions_rewritten: self.rewritten.len(),
            required_modules: self
                .required_imports
                .values()
                .flatten()
                .filter_map(|path| providing_module(&self.modules, path))
                .map(str::to_string)
                .collect(),
        })
    }

    /// Apply one batch of edits to a file.
    ///
    /// File-scoped failures are recorded and reported as `Ok(false)`; the file keeps
    /// its previous text.
    fn apply_batch(
        &mut self,
        file: FileId,
        edits: Vec<TextEdit>,
        imports: BTreeSet<&'static str>,
    ) -> Result<bool> {
        if edits.is_empty() {
            return Ok(false);
        }
        match self.program.file_mut(file).apply(&mut self.parser, &edits) {
            Ok(()) => {
                if !imports.is_empty() {
                    self.required_imports.entry(file).or_default().extend(imports);
                }
                Ok(true)
            }
            Err(err) if err.is_file_scoped() => {
                self.record_file_error(file, &err);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn record_file_error(&mut self, file: FileId, err: &InstrumentError) {
        let path = self.program.file(file).path.clone();
        warn!(file = %path, error = %err, "skipping edits for file");
        let kind = match err {
            InstrumentError::IdentifierCollision { .. } => DiagnosticKind::IdentifierCollision,
            _ => DiagnosticKind::EditConflict,
        };
        self.sink
            .record(Diagnostic::new(kind, err.to_string()).in_file(path));
    }

    /// Local name of the agent package in a file, or its default name.
    fn newrelic_name(&self, file: FileId) -> String {
        self.program
            .imports(file)
            .name_for(NEWRELIC_IMPORT)
            .unwrap_or("newrelic")
            .to_string()
    }

    /// Text of the handle parameter declaration for a file.
    fn handle_param(&self, file: FileId) -> String {
        format!(
            "{} *{}.Transaction",
            self.config.handle_name,
            self.newrelic_name(file)
        )
    }
}

/// The most specific of `modules` that provides the package at `path`.
pub fn providing_module<'m>(modules: &'m BTreeSet<String>, path: &str) -> Option<&'m str> {
    modules
        .iter()
        .filter(|module| {
            path == module.as_str()
                || path
                    .strip_prefix(module.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|module| module.len())
        .map(String::as_str)
}
