// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Integration catalog.
//!
//! Each supported library is an [`Integration`]: it names the import paths that
//! activate it, recognizes one statement shape, and generates the instrumentation
//! for a matched statement. The engine iterates the catalog uniformly and never
//! branches on a specific library.

mod gin;
mod nethttp;
mod slog;

pub use gin::GinIntegration;
pub use nethttp::{HttpClientIntegration, HttpServerIntegration};
pub use slog::SlogIntegration;

use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::engine::ScopeNamer;
use crate::error::Result;
use crate::program::{default_package_name, ImportTable};
use crate::syntax::nodes::{selector_call, statement_call};

/// Import path of the New Relic Go agent.
pub const NEWRELIC_IMPORT: &str = "github.com/newrelic/go-agent/v3/newrelic";

/// Go module providing the agent.
pub const NEWRELIC_MODULE: &str = "github.com/newrelic/go-agent/v3";

/// Which function bodies an integration applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    AnyFunction,
    /// Only `func main()` of a `main` package, where the agent variable lives.
    MainOnly,
}

/// Where generated code goes relative to the matched statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
    Replace,
    /// Raw insertion at a byte offset inside the statement.
    At(usize),
}

/// A new identifier that stands in for an existing one in later statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub original: String,
    pub replacement: String,
}

/// Code generated for one matched statement.
#[derive(Debug, Clone, Default)]
pub struct Injection {
    pub edits: Vec<(Placement, String)>,
    /// Import paths referenced by the generated code.
    pub imports: Vec<&'static str>,
    pub binding: Option<Binding>,
}

impl Injection {
    pub fn with_edit(mut self, placement: Placement, text: impl Into<String>) -> Self {
        self.edits.push((placement, text.into()));
        self
    }

    pub fn with_import(mut self, path: &'static str) -> Self {
        self.imports.push(path);
        self
    }

    pub fn with_binding(mut self, original: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.binding = Some(Binding {
            original: original.into(),
            replacement: replacement.into(),
        });
        self
    }
}

/// A statement under inspection, with its neighbours in the same block.
#[derive(Clone, Copy)]
pub struct StatementView<'t, 'a> {
    pub node: Node<'t>,
    pub source: &'a str,
    pub imports: &'a ImportTable,
    pub prev: Option<Node<'t>>,
    pub next: Option<Node<'t>>,
}

impl<'t, 'a> StatementView<'t, 'a> {
    /// If the statement's call is `<pkg>.<Func>(...)` for the package at `import_path`,
    /// return the call node and `Func`.
    pub fn package_call(&self, import_path: &str) -> Option<(Node<'t>, &'a str)> {
        let call = statement_call(self.node)?;
        let (operand, field) = selector_call(call, self.source)?;
        (self.imports.path_for(operand) == Some(import_path)).then_some((call, field))
    }

    /// Local name of an imported package, or its default name if it is not imported yet.
    pub fn package_name(&self, import_path: &str) -> String {
        self.imports
            .name_for(import_path)
            .map(str::to_string)
            .unwrap_or_else(|| default_package_name(import_path))
    }
}

/// Values the engine provides to code generation.
pub struct GenerateContext<'a> {
    /// Agent application variable (e.g. `NewRelicAgent`).
    pub agent: &'a str,
    /// Tracing handle variable (e.g. `nrTxn`).
    pub handle: &'a str,
    pub namer: &'a mut ScopeNamer,
}

/// One supported library.
pub trait Integration: Send + Sync {
    fn name(&self) -> &'static str;

    /// Import paths whose presence activates this integration.
    fn triggers(&self) -> &'static [&'static str];

    /// Go module the user must add for the generated code to build.
    fn required_module(&self) -> &'static str {
        NEWRELIC_MODULE
    }

    fn scope(&self) -> Scope {
        Scope::AnyFunction
    }

    /// Whether generated code uses the tracing handle.
    fn requires_handle(&self) -> bool {
        false
    }

    fn matches(&self, stmt: &StatementView<'_, '_>) -> bool;

    /// Whether a matched statement already carries this integration's instrumentation.
    fn is_instrumented(&self, stmt: &StatementView<'_, '_>) -> bool;

    fn generate(&self, stmt: &StatementView<'_, '_>, ctx: &mut GenerateContext<'_>) -> Result<Injection>;
}

/// The registered integrations, in a fixed order.
pub struct Catalog {
    integrations: Vec<Box<dyn Integration>>,
}

impl Catalog {
    pub fn new(integrations: Vec<Box<dyn Integration>>) -> Self {
        Self { integrations }
    }

    /// Catalog with every built-in integration.
    pub fn builtin() -> Self {
        Self::new(vec![
            Box::new(SlogIntegration),
            Box::new(GinIntegration),
            Box::new(HttpServerIntegration),
            Box::new(HttpClientIntegration),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Integration> {
        self.integrations.iter().map(|i| i.as_ref())
    }

    pub fn len(&self) -> usize {
        self.integrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty()
    }

    /// Indices of integrations triggered by any of `import_paths`.
    pub fn active_for(&self, import_paths: &BTreeSet<String>) -> Vec<usize> {
        self.integrations
            .iter()
            .enumerate()
            .filter(|(_, integration)| {
                integration
                    .triggers()
                    .iter()
                    .any(|trigger| import_paths.contains(*trigger))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Integration> {
        self.integrations.get(index).map(|i| i.as_ref())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.integrations.iter().map(|i| i.name()))
            .finish()
    }
}
