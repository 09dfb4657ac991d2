// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `log/slog` handlers wrapped with `nrslog`.

use super::{GenerateContext, Injection, Integration, Placement, Scope, StatementView};
use crate::error::Result;
use crate::syntax::nodes::{assigned_names, call_arguments, node_text, selector_call, statement_call};

const SLOG_IMPORT: &str = "log/slog";
const NRSLOG_IMPORT: &str = "github.com/newrelic/go-agent/v3/integrations/logcontext-v2/nrslog";

const HANDLER_CONSTRUCTORS: &[&str] = &["NewTextHandler", "NewJSONHandler"];

/// `h := slog.NewTextHandler(...)` gains `NRh := nrslog.WrapHandler(agent, h)`,
/// and later uses of `h` in the block switch to `NRh`.
pub struct SlogIntegration;

impl SlogIntegration {
    fn handler_name(stmt: &StatementView<'_, '_>) -> Option<String> {
        if !matches!(stmt.node.kind(), "short_var_declaration" | "assignment_statement") {
            return None;
        }
        let (_, func) = stmt.package_call(SLOG_IMPORT)?;
        if !HANDLER_CONSTRUCTORS.contains(&func) {
            return None;
        }
        assigned_names(stmt.node, stmt.source)
            .into_iter()
            .next()
            .filter(|name| name != "_")
    }
}

impl Integration for SlogIntegration {
    fn name(&self) -> &'static str {
        "slog"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[SLOG_IMPORT]
    }

    fn required_module(&self) -> &'static str {
        NRSLOG_IMPORT
    }

    fn scope(&self) -> Scope {
        Scope::MainOnly
    }

    fn matches(&self, stmt: &StatementView<'_, '_>) -> bool {
        Self::handler_name(stmt).is_some()
    }

    fn is_instrumented(&self, stmt: &StatementView<'_, '_>) -> bool {
        let (Some(handler), Some(next)) = (Self::handler_name(stmt), stmt.next) else {
            return false;
        };
        let Some(call) = statement_call(next) else {
            return false;
        };
        let wraps = selector_call(call, stmt.source)
            .map(|(_, field)| field == "WrapHandler")
            .unwrap_or(false);
        wraps
            && call_arguments(call)
                .last()
                .map(|arg| node_text(*arg, stmt.source) == handler)
                .unwrap_or(false)
    }

    fn generate(&self, stmt: &StatementView<'_, '_>, ctx: &mut GenerateContext<'_>) -> Result<Injection> {
        let handler = Self::handler_name(stmt).unwrap_or_default();
        let wrapped = ctx.namer.fresh(&format!("NR{}", handler))?;
        let nrslog = stmt.package_name(NRSLOG_IMPORT);
        Ok(Injection::default()
            .with_edit(
                Placement::After,
                format!("{} := {}.WrapHandler({}, {})", wrapped, nrslog, ctx.agent, handler),
            )
            .with_import(NRSLOG_IMPORT)
            .with_binding(handler, wrapped))
    }
}
