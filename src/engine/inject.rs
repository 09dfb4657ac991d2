// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pass 1: integration matches and forward substitution of rebound identifiers.

use std::collections::BTreeSet;

use tracing::{debug, info};
use tree_sitter::Node;

use super::{InstrumentationManager, ScopeNamer};
use crate::callgraph::{function_decls, FuncKey};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::Result;
use crate::integrations::{Binding, GenerateContext, Injection, Placement, Scope, StatementView};
use crate::program::FileId;
use crate::syntax::edit::{insert_after_statement, insert_before_statement};
use crate::syntax::nodes::{
    assigned_names, call_arguments, descendants, node_text, statement_call, statement_sequences,
};
use crate::syntax::TextEdit;

/// Edits and findings for one file, computed before anything is applied.
#[derive(Debug, Default)]
struct FilePlan {
    edits: Vec<TextEdit>,
    imports: BTreeSet<&'static str>,
    seeds: Vec<FuncKey>,
    diagnostics: Vec<Diagnostic>,
}

/// How a statement refers to a tracked identifier.
#[derive(Debug)]
enum References<'t> {
    None,
    /// Every reference is a bare argument of the statement's call.
    Modeled(Vec<Node<'t>>),
    Unmodeled,
}

impl InstrumentationManager<'_> {
    /// Pass 1 over every production file.
    pub fn inject(&mut self) -> Result<()> {
        let files: Vec<FileId> = self
            .program
            .file_ids()
            .filter(|id| !self.program.file(*id).is_test())
            .collect();

        for file in files {
            let plan = match self.plan_injections(file) {
                Ok(plan) => plan,
                Err(err) if err.is_file_scoped() => {
                    self.record_file_error(file, &err);
                    continue;
                }
                Err(err) => return Err(err),
            };
            for diagnostic in plan.diagnostics {
                self.sink.record(diagnostic);
            }
            let edit_count = plan.edits.len();
            if self.apply_batch(file, plan.edits, plan.imports)? || edit_count == 0 {
                self.seeds.extend(plan.seeds);
            }
        }

        info!(seeds = self.seeds.len(), "injection pass complete");
        Ok(())
    }

    fn plan_injections(&self, file_id: FileId) -> Result<FilePlan> {
        let file = self.program.file(file_id);
        let source = file.text();
        let root = file.root();
        let package = self.program.package_of(file_id);
        let imports = self.program.imports(file_id);
        let mut plan = FilePlan::default();

        for decl in function_decls(root, source) {
            let Some(body) = decl.body else {
                continue;
            };
            let is_main =
                package.name == "main" && decl.name == "main" && decl.receiver_type.is_none();
            let key = decl.key(package.id);
            let mut namer = ScopeNamer::for_function(&file.path, source, root, decl.node, &imports);

            for statements in statement_sequences(body) {
                let mut bindings: Vec<Binding> = Vec::new();

                for (i, stmt) in statements.iter().enumerate() {
                    self.substitute(&file.path, source, *stmt, &mut bindings, &mut plan);

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
                        if integration.scope() == Scope::MainOnly && !is_main {
                            continue;
                        }
                        if !integration.matches(&view) {
                            continue;
                        }
                        if integration.requires_handle() {
                            debug!(integration = integration.name(), function = %key, "deferred until propagation");
                            if !plan.seeds.contains(&key) {
                                plan.seeds.push(key.clone());
                            }
                            break;
                        }
                        if integration.is_instrumented(&view) {
                            debug!(integration = integration.name(), file = %file.path, "already instrumented");
                            break;
                        }
                        let mut ctx = GenerateContext {
                            agent: &self.config.agent_variable,
                            handle: &self.config.handle_name,
                            namer: &mut namer,
                        };
                        let injection = integration.generate(&view, &mut ctx)?;
                        if injection.edits.is_empty() {
                            break;
                        }
                        debug!(
                            integration = integration.name(),
                            file = %file.path,
                            line = stmt.start_position().row + 1,
                            "instrumented statement"
                        );
                        plan.edits.extend(injection_edits(source, *stmt, &injection));
                        plan.imports.extend(injection.imports.iter().copied());
                        if let Some(binding) = injection.binding {
                            bindings.push(binding);
                        }
                        break;
                    }
                }
            }
        }

        Ok(plan)
    }

    /// Rewrite references to tracked identifiers in `stmt`, then stop tracking any
    /// identifier the statement assigns.
    fn substitute(
        &self,
        path: &str,
        source: &str,
        stmt: Node<'_>,
        bindings: &mut Vec<Binding>,
        plan: &mut FilePlan,
    ) {
        if bindings.is_empty() {
            return;
        }
        for binding in bindings.iter() {
            match references(stmt, source, &binding.original) {
                References::None => {}
                References::Modeled(nodes) => {
                    for node in nodes {
                        plan.edits
                            .push(TextEdit::replace_node(node, binding.replacement.clone()));
                    }
                }
                References::Unmodeled => {
                    plan.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::InjectionAmbiguity,
                            format!(
                                "`{}` is used in a statement that is not rewritten; it still refers to the unwrapped value instead of `{}`",
                                binding.original, binding.replacement
                            ),
                        )
                        .at(path, stmt.start_position().row + 1),
                    );
                }
            }
        }
        let assigned = assigned_names(stmt, source);
        bindings.retain(|b| !assigned.contains(&b.original));
    }
}

/// Classify the references to `name` inside `stmt`.
fn references<'t>(stmt: Node<'t>, source: &str, name: &str) -> References<'t> {
    let targets: Vec<usize> = match stmt.kind() {
        "short_var_declaration" | "assignment_statement" => stmt
            .child_by_field_name("left")
            .map(|left| descendants(left).iter().map(|n| n.id()).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    let uses: Vec<Node<'t>> = descendants(stmt)
        .into_iter()
        .filter(|n| n.kind() == "identifier" && node_text(*n, source) == name)
        .filter(|n| !targets.contains(&n.id()))
        .collect();
    if uses.is_empty() {
        return References::None;
    }
    let Some(call) = statement_call(stmt) else {
        return References::Unmodeled;
    };
    let args: Vec<usize> = call_arguments(call).iter().map(|a| a.id()).collect();
    if uses.iter().all(|n| args.contains(&n.id())) {
        References::Modeled(uses)
    } else {
        References::Unmodeled
    }
}

/// Turn an injection into text edits around `stmt`.
pub(super) fn injection_edits(source: &str, stmt: Node<'_>, injection: &Injection) -> Vec<TextEdit> {
    injection
        .edits
        .iter()
        .map(|(placement, text)| match placement {
            Placement::Before => insert_before_statement(source, stmt, text),
            Placement::After => insert_after_statement(source, stmt, text),
            Placement::Replace => TextEdit::replace_node(stmt, text.clone()),
            Placement::At(offset) => TextEdit::insert(*offset, text.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::nodes::block_statements;
    use crate::syntax::GoParser;

    fn statements(src: &str) -> (tree_sitter::Tree, String) {
        let mut parser = GoParser::new().unwrap();
        (parser.parse(src).unwrap(), src.to_string())
    }

    #[test]
    fn test_references_modeled_and_unmodeled() {
        let (tree, src) = statements(
            "package main\n\nfunc main() {\n\tlog := slog.New(h)\n\tx := wrap(h.Clone())\n\th = other()\n\tfmt.Println(\"none\")\n}\n",
        );
        let block = descendants(tree.root_node())
            .into_iter()
            .find(|n| n.kind() == "block")
            .unwrap();
        let stmts = block_statements(block);

        assert!(matches!(references(stmts[0], &src, "h"), References::Modeled(ref v) if v.len() == 1));
        assert!(matches!(references(stmts[1], &src, "h"), References::Unmodeled));
        // Assignment target is not a reference.
        assert!(matches!(references(stmts[2], &src, "h"), References::None));
        assert!(matches!(references(stmts[3], &src, "h"), References::None));
    }

    #[test]
    fn test_references_in_nested_block_are_unmodeled() {
        let (tree, src) = statements(
            "package main\n\nfunc main() {\n\tif ok {\n\t\tslog.New(h)\n\t}\n}\n",
        );
        let block = descendants(tree.root_node())
            .into_iter()
            .find(|n| n.kind() == "block")
            .unwrap();
        let stmts = block_statements(block);
        assert!(matches!(references(stmts[0], &src, "h"), References::Unmodeled));
    }
}
