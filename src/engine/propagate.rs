// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pass 2: tracing handle propagation.
//!
//! Seeds are functions holding a match that needs the handle. A breadth-first walk
//! over the reverse call graph marks every function between an entry point and a
//! seed; those functions gain a handle parameter and their call sites pass it on.
//! Entry points create the handle instead of receiving it.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::{debug, info};
use tree_sitter::Node;

use super::inject::injection_edits;
use super::{InstrumentationManager, ScopeNamer};
use crate::callgraph::{
    function_decls, http_handler_request, CallContext, CallGraph, EntryKind, FuncId, FuncKey,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::Result;
use crate::integrations::{GenerateContext, Scope, StatementView, NEWRELIC_IMPORT};
use crate::program::{FileId, Program};
use crate::syntax::edit::insert_at_block_start;
use crate::syntax::nodes::{
    assigned_names, block_statements, descendants, named_children, parameter_groups,
    statement_sequences, ParamGroup,
};
use crate::syntax::TextEdit;

/// Per-function propagation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unvisited,
    Queued,
    HandleRequired,
    Rewritten,
}

/// Which functions carry the tracing handle, and which of them change signature.
#[derive(Debug, Default)]
pub struct PropagationPlan {
    states: Vec<HandleState>,
    /// Functions with a handle in scope: marked functions and entry points that create one.
    carriers: BTreeSet<FuncId>,
    /// Functions that gain the handle parameter in this run.
    rewritten: BTreeSet<FuncId>,
    diagnostics: Vec<Diagnostic>,
}

impl PropagationPlan {
    /// Walk from the seeds to their callers until entry points are reached.
    pub fn compute(graph: &CallGraph, program: &Program, seeds: &BTreeSet<FuncKey>) -> Self {
        let reachable = graph.reachable_from_entries();
        let mut plan = Self {
            states: vec![HandleState::Unvisited; graph.len()],
            ..Self::default()
        };
        let mut queue: VecDeque<FuncId> = VecDeque::new();

        for key in seeds {
            let Some(id) = graph.lookup(key) else {
                continue;
            };
            let node = graph.node(id);
            if node.is_test_file {
                continue;
            }
            if !reachable.contains(&id) {
                plan.note(
                    program,
                    graph,
                    id,
                    DiagnosticKind::UnreachableMatch,
                    format!("`{}` is not reachable from an entry point; its calls are left as is", node.key),
                );
                continue;
            }
            if graph.is_barrier(id) && !node.has_handle_param {
                plan.note(
                    program,
                    graph,
                    id,
                    DiagnosticKind::PropagationBarrier,
                    format!("`{}` cannot take a tracing handle parameter", node.key),
                );
                continue;
            }
            plan.states[id.0] = HandleState::Queued;
            queue.push_back(id);
        }

        while let Some(id) = queue.pop_front() {
            plan.states[id.0] = HandleState::HandleRequired;
            let node = graph.node(id);

            match &node.entry {
                Some(EntryKind::Main) => {
                    plan.carriers.insert(id);
                }
                Some(EntryKind::HttpHandler { request }) => {
                    if request.is_some() || node.has_handle_param {
                        plan.carriers.insert(id);
                    } else {
                        plan.note(
                            program,
                            graph,
                            id,
                            DiagnosticKind::PropagationBarrier,
                            format!("handler `{}` has no named request parameter to take a transaction from", node.key),
                        );
                    }
                }
                Some(EntryKind::Test) => {}
                None => {
                    plan.carriers.insert(id);
                    if !node.has_handle_param {
                        debug!(function = %node.key, "adding tracing handle parameter");
                        plan.rewritten.insert(id);
                    }
                    for caller in graph.callers(id) {
                        let caller_node = graph.node(*caller);
                        if caller_node.is_test_file
                            || !reachable.contains(caller)
                            || plan.states[caller.0] != HandleState::Unvisited
                        {
                            continue;
                        }
                        if graph.is_barrier(*caller) && !caller_node.has_handle_param {
                            plan.states[caller.0] = HandleState::Rewritten;
                            plan.note(
                                program,
                                graph,
                                *caller,
                                DiagnosticKind::PropagationBarrier,
                                format!(
                                    "`{}` cannot take a tracing handle parameter; it passes nil to `{}`",
                                    caller_node.key, node.key
                                ),
                            );
                            continue;
                        }
                        plan.states[caller.0] = HandleState::Queued;
                        queue.push_back(*caller);
                    }
                }
            }
            plan.states[id.0] = HandleState::Rewritten;
        }

        info!(
            carriers = plan.carriers.len(),
            rewritten = plan.rewritten.len(),
            "handle propagation planned"
        );
        plan
    }

    fn note(
        &mut self,
        program: &Program,
        graph: &CallGraph,
        id: FuncId,
        kind: DiagnosticKind,
        message: String,
    ) {
        let node = graph.node(id);
        self.diagnostics.push(
            Diagnostic::new(kind, message).at(program.file(node.file).path.clone(), node.line),
        );
    }

    pub fn state(&self, id: FuncId) -> HandleState {
        self.states
            .get(id.0)
            .copied()
            .unwrap_or(HandleState::Unvisited)
    }

    pub fn carries_handle(&self, id: FuncId) -> bool {
        self.carriers.contains(&id)
    }

    pub fn is_rewritten(&self, id: FuncId) -> bool {
        self.rewritten.contains(&id)
    }

    pub fn rewritten(&self) -> &BTreeSet<FuncId> {
        &self.rewritten
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Edits for one file in pass 2.
#[derive(Debug, Default)]
struct HandleEdits {
    edits: Vec<TextEdit>,
    imports: BTreeSet<&'static str>,
    diagnostics: Vec<Diagnostic>,
}

/// A `go func(...) { ... }(...)` literal that gets its own handle parameter.
struct GoLiteral<'t> {
    literal: Node<'t>,
    launch: Node<'t>,
    handle_index: usize,
}

/// Tracks where the handle is available inside one function body.
struct FunctionScope<'t, 's> {
    decl: Node<'t>,
    decl_available: bool,
    decl_used: bool,
    handle: &'s str,
    source: &'s str,
    http: Option<&'s str>,
    path: &'s str,
    literals: HashMap<usize, bool>,
    go_literals: BTreeMap<usize, GoLiteral<'t>>,
    /// Handler literals that create their own handle from the request.
    handler_literals: BTreeMap<usize, (Node<'t>, String)>,
    diagnostics: Vec<Diagnostic>,
}

impl<'t, 's> FunctionScope<'t, 's> {
    /// Whether the handle can be referenced at `node`.
    fn available_at(&mut self, node: Node<'t>) -> bool {
        let mut current = node.parent();
        while let Some(parent) = current {
            if parent.id() == self.decl.id() {
                break;
            }
            if parent.kind() == "func_literal" {
                return self.literal_available(parent);
            }
            current = parent.parent();
        }
        if self.decl_available {
            self.decl_used = true;
        }
        self.decl_available
    }

    fn literal_available(&mut self, literal: Node<'t>) -> bool {
        if let Some(known) = self.literals.get(&literal.id()) {
            return *known;
        }
        let groups: Vec<ParamGroup> = literal
            .child_by_field_name("parameters")
            .map(|p| parameter_groups(p, self.source))
            .unwrap_or_default();
        let body = literal.child_by_field_name("body");

        let available = if groups
            .iter()
            .any(|g| g.names.iter().any(|n| n == self.handle))
            || body
                .map(|b| declares_handle(b, self.source, self.handle))
                .unwrap_or(false)
        {
            true
        } else if let Some(launch) = go_launch(literal) {
            if !groups.iter().all(|g| !g.names.is_empty()) {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::PropagationBarrier,
                        "goroutine literal with unnamed parameters cannot take a tracing handle",
                    )
                    .at(self.path, literal.start_position().row + 1),
                );
                false
            } else if self.available_at(literal) {
                let handle_index: usize = groups
                    .iter()
                    .filter(|g| !g.variadic)
                    .map(|g| g.arity())
                    .sum();
                self.go_literals.insert(
                    literal.start_byte(),
                    GoLiteral {
                        literal,
                        launch,
                        handle_index,
                    },
                );
                true
            } else {
                false
            }
        } else if let Some(Some(request)) = http_handler_request(&groups, self.http) {
            self.handler_literals
                .insert(literal.start_byte(), (literal, request));
            true
        } else {
            self.available_at(literal)
        };

        self.literals.insert(literal.id(), available);
        available
    }
}

impl InstrumentationManager<'_> {
    /// Pass 2 over every production file.
    pub fn propagate(&mut self, graph: &CallGraph) -> Result<PropagationPlan> {
        let plan = PropagationPlan::compute(graph, self.program, &self.seeds);
        for diagnostic in plan.diagnostics() {
            self.sink.record(diagnostic.clone());
        }
        self.rewritten = plan.rewritten().clone();

        let files: Vec<FileId> = self
            .program
            .file_ids()
            .filter(|id| !self.program.file(*id).is_test())
            .collect();
        for file in files {
            let edits = match self.plan_handle_edits(file, graph, &plan, true) {
                Ok(edits) => edits,
                Err(err) if err.is_file_scoped() => {
                    // Keep signatures and call sites consistent; drop only the deferred injections.
                    self.record_file_error(file, &err);
                    self.plan_handle_edits(file, graph, &plan, false)?
                }
                Err(err) => return Err(err),
            };
            for diagnostic in edits.diagnostics {
                self.sink.record(diagnostic);
            }
            self.apply_batch(file, edits.edits, edits.imports)?;
        }
        Ok(plan)
    }

    fn plan_handle_edits(
        &self,
        file_id: FileId,
        graph: &CallGraph,
        plan: &PropagationPlan,
        with_deferred: bool,
    ) -> Result<HandleEdits> {
        let file = self.program.file(file_id);
        let source = file.text();
        let root = file.root();
        let package = self.program.package_of(file_id);
        let imports = self.program.imports(file_id);
        let handle = self.config.handle_name.as_str();
        let newrelic = self.newrelic_name(file_id);
        let param_text = self.handle_param(file_id);
        let mut out = HandleEdits::default();

        for decl in function_decls(root, source) {
            let key = decl.key(package.id);
            let Some(id) = graph.lookup(&key) else {
                continue;
            };
            let Some(body) = decl.body else {
                continue;
            };
            let node = graph.node(id);
            let ctx = CallContext::for_decl(self.program, package.id, &imports, &decl);
            let mut scope = FunctionScope {
                decl: decl.node,
                decl_available: plan.carries_handle(id),
                decl_used: false,
                handle,
                source,
                http: imports.name_for("net/http"),
                path: &file.path,
                literals: HashMap::new(),
                go_literals: BTreeMap::new(),
                handler_literals: BTreeMap::new(),
                diagnostics: Vec::new(),
            };

            let mut signature_edits = Vec::new();
            if plan.is_rewritten(id) {
                if let Some(params) = decl.params {
                    signature_edits.push(param_insertion(params, &param_text));
                    out.imports.insert(NEWRELIC_IMPORT);
                }
            }

            let mut call_edits = Vec::new();
            for call in descendants(body) {
                if call.kind() != "call_expression" {
                    continue;
                }
                let Some(callee) = ctx
                    .resolve_call(call, source)
                    .and_then(|k| graph.lookup(&k))
                else {
                    continue;
                };
                if !plan.is_rewritten(callee) {
                    continue;
                }
                let available = scope.available_at(call);
                let argument = match (available, is_go_statement_call(call)) {
                    (true, true) => format!("{}.NewGoroutine()", handle),
                    (true, false) => handle.to_string(),
                    (false, _) => {
                        debug!(caller = %key, callee = %graph.node(callee).key, "passing nil handle");
                        "nil".to_string()
                    }
                };
                if let Some(edit) = argument_insertion(call, graph.node(callee).handle_index, &argument)
                {
                    call_edits.push(edit);
                }
            }

            let mut deferred_edits = Vec::new();
            if with_deferred && self.seeds.contains(&key) && plan.carries_handle(id) {
                let is_main = matches!(node.entry, Some(EntryKind::Main));
                let mut namer = ScopeNamer::for_function(&file.path, source, root, decl.node, &imports);
                for statements in statement_sequences(body) {
                    for (i, stmt) in statements.iter().enumerate() {
                        let view = StatementView {
                            node: *stmt,
                            source,
                            imports: &imports,
                            prev: i.checked_sub(1).map(|j| statements[j]),
                            next: statements.get(i + 1).copied(),
                        };
                        for index in &self.active {
                            let Some(integration) = self.catalog.get(*index) else {
                                continue;
                            };
                            if !integration.requires_handle()
                                || (integration.scope() == Scope::MainOnly && !is_main)
                                || !integration.matches(&view)
                            {
                                continue;
                            }
                            if integration.is_instrumented(&view) {
                                break;
                            }
                            if !scope.available_at(*stmt) {
                                out.diagnostics.push(
                                    Diagnostic::new(
                                        DiagnosticKind::PropagationBarrier,
                                        format!("no tracing handle in scope for {} call", integration.name()),
                                    )
                                    .at(file.path.clone(), stmt.start_position().row + 1),
                                );
                                break;
                            }
                            let mut generate_ctx = GenerateContext {
                                agent: &self.config.agent_variable,
                                handle,
                                namer: &mut namer,
                            };
                            let injection = integration.generate(&view, &mut generate_ctx)?;
                            deferred_edits.extend(injection_edits(source, *stmt, &injection));
                            out.imports.extend(injection.imports.iter().copied());
                            break;
                        }
                    }
                }
            }

            let mut creation_edits = Vec::new();
            if scope.decl_used && !declares_handle(body, source, handle) {
                let lines = match &node.entry {
                    Some(EntryKind::Main) => vec![
                        format!(
                            "{} := {}.StartTransaction(\"main\")",
                            handle, self.config.agent_variable
                        ),
                        format!("defer {}.End()", handle),
                    ],
                    Some(EntryKind::HttpHandler {
                        request: Some(request),
                    }) => {
                        out.imports.insert(NEWRELIC_IMPORT);
                        vec![format!(
                            "{} := {}.FromContext({}.Context())",
                            handle, newrelic, request
                        )]
                    }
                    _ => Vec::new(),
                };
                if !lines.is_empty() {
                    debug!(function = %key, "creating tracing handle at entry point");
                    let first = block_statements(body).into_iter().next();
                    creation_edits.push(insert_at_block_start(source, body, first, &lines));
                }
            }

            let mut literal_edits = Vec::new();
            for go_literal in scope.go_literals.values() {
                if let Some(params) = go_literal.literal.child_by_field_name("parameters") {
                    literal_edits.push(param_insertion(params, &param_text));
                    out.imports.insert(NEWRELIC_IMPORT);
                }
                if let Some(edit) = argument_insertion(
                    go_literal.launch,
                    go_literal.handle_index,
                    &format!("{}.NewGoroutine()", handle),
                ) {
                    literal_edits.push(edit);
                }
            }
            for (literal, request) in scope.handler_literals.values() {
                if let Some(literal_body) = literal.child_by_field_name("body") {
                    let first = block_statements(literal_body).into_iter().next();
                    literal_edits.push(insert_at_block_start(
                        source,
                        literal_body,
                        first,
                        &[format!("{} := {}.FromContext({}.Context())", handle, newrelic, request)],
                    ));
                    out.imports.insert(NEWRELIC_IMPORT);
                }
            }

            out.diagnostics.append(&mut scope.diagnostics);
            // Same-offset insertions keep this order: handle creation precedes
            // statements inserted before the first statement of a body.
            out.edits.extend(signature_edits);
            out.edits.extend(creation_edits);
            out.edits.extend(literal_edits);
            out.edits.extend(call_edits);
            out.edits.extend(deferred_edits);
        }

        let package_level = CallContext::package_level(self.program, package.id, &imports);
        out.edits.extend(package_level_nil_edits(
            root,
            source,
            &package_level,
            graph,
            plan.rewritten(),
        ));

        Ok(out)
    }
}

/// `nil` handle arguments for calls to rewritten functions in package-level `var` initializers.
pub(super) fn package_level_nil_edits(
    root: Node<'_>,
    source: &str,
    ctx: &CallContext<'_>,
    graph: &CallGraph,
    rewritten: &BTreeSet<FuncId>,
) -> Vec<TextEdit> {
    named_children(root)
        .into_iter()
        .filter(|item| item.kind() == "var_declaration")
        .flat_map(descendants)
        .filter(|node| node.kind() == "call_expression")
        .filter_map(|call| {
            let callee = ctx
                .resolve_call(call, source)
                .and_then(|key| graph.lookup(&key))
                .filter(|id| rewritten.contains(id))?;
            debug!(
                line = call.start_position().row + 1,
                callee = %graph.node(callee).key,
                "passing nil handle from package initializer"
            );
            argument_insertion(call, graph.node(callee).handle_index, "nil")
        })
        .collect()
}

/// Whether a body already declares the handle with `:=`.
fn declares_handle(body: Node<'_>, source: &str, handle: &str) -> bool {
    descendants(body).into_iter().any(|n| {
        n.kind() == "short_var_declaration" && assigned_names(n, source).iter().any(|a| a == handle)
    })
}

/// The `go` launch call of a function literal, if the literal is launched directly.
fn go_launch(literal: Node<'_>) -> Option<Node<'_>> {
    let call = literal.parent().filter(|p| p.kind() == "call_expression")?;
    let function = call.child_by_field_name("function")?;
    if function.id() != literal.id() {
        return None;
    }
    is_go_statement_call(call).then_some(call)
}

fn is_go_statement_call(call: Node<'_>) -> bool {
    call.parent()
        .map(|p| p.kind() == "go_statement")
        .unwrap_or(false)
}

/// Insert a parameter declaration before a variadic parameter, else last.
pub(super) fn param_insertion(params: Node<'_>, text: &str) -> TextEdit {
    let decls: Vec<Node<'_>> = named_children(params)
        .into_iter()
        .filter(|n| {
            n.kind() == "parameter_declaration" || n.kind() == "variadic_parameter_declaration"
        })
        .collect();
    if let Some(variadic) = decls
        .iter()
        .find(|n| n.kind() == "variadic_parameter_declaration")
    {
        TextEdit::insert(variadic.start_byte(), format!("{}, ", text))
    } else if let Some(last) = decls.last() {
        TextEdit::insert(last.end_byte(), format!(", {}", text))
    } else {
        TextEdit::insert(params.start_byte() + 1, text)
    }
}

/// Insert an argument at position `index` of a call.
pub(super) fn argument_insertion(call: Node<'_>, index: usize, text: &str) -> Option<TextEdit> {
    let list = call.child_by_field_name("arguments")?;
    let args = named_children(list);
    let edit = if args.is_empty() {
        TextEdit::insert(list.start_byte() + 1, text)
    } else if index < args.len() {
        TextEdit::insert(args[index].start_byte(), format!("{}, ", text))
    } else {
        let last = args.last()?;
        TextEdit::insert(last.end_byte(), format!(", {}", text))
    };
    Some(edit)
}
