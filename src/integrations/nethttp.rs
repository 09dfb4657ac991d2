// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `net/http` server registrations and client requests.

use super::{
    GenerateContext, Injection, Integration, Placement, Scope, StatementView, NEWRELIC_IMPORT,
};
use crate::error::Result;
use crate::syntax::nodes::{call_arguments, node_text};

const HTTP_IMPORT: &str = "net/http";

const CLIENT_FUNCTIONS: &[&str] = &["Get", "Head", "Post", "PostForm"];

/// `http.HandleFunc(pattern, h)` becomes
/// `http.HandleFunc(newrelic.WrapHandleFunc(agent, pattern, h))`; `http.Handle` likewise.
pub struct HttpServerIntegration;

impl HttpServerIntegration {
    fn wrapper_for(func: &str) -> Option<&'static str> {
        match func {
            "HandleFunc" => Some("WrapHandleFunc"),
            "Handle" => Some("WrapHandle"),
            _ => None,
        }
    }
}

impl Integration for HttpServerIntegration {
    fn name(&self) -> &'static str {
        "net/http server"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[HTTP_IMPORT]
    }

    fn scope(&self) -> Scope {
        Scope::MainOnly
    }

    fn matches(&self, stmt: &StatementView<'_, '_>) -> bool {
        if stmt.node.kind() != "expression_statement" {
            return false;
        }
        match stmt.package_call(HTTP_IMPORT) {
            Some((call, func)) => {
                Self::wrapper_for(func).is_some() && !call_arguments(call).is_empty()
            }
            None => false,
        }
    }

    fn is_instrumented(&self, stmt: &StatementView<'_, '_>) -> bool {
        let Some((call, _)) = stmt.package_call(HTTP_IMPORT) else {
            return false;
        };
        call_arguments(call)
            .first()
            .map(|arg| {
                let text = node_text(*arg, stmt.source);
                text.contains(".WrapHandleFunc(") || text.contains(".WrapHandle(")
            })
            .unwrap_or(false)
    }

    fn generate(&self, stmt: &StatementView<'_, '_>, ctx: &mut GenerateContext<'_>) -> Result<Injection> {
        let Some((call, func)) = stmt.package_call(HTTP_IMPORT) else {
            return Ok(Injection::default());
        };
        let args = call_arguments(call);
        let (Some(wrapper), [first, .., last]) = (Self::wrapper_for(func), args.as_slice()) else {
            return Ok(Injection::default());
        };
        if args.len() != 2 {
            return Ok(Injection::default());
        }
        // Insertions around the original arguments, so the arguments themselves stay editable.
        let newrelic = stmt.package_name(NEWRELIC_IMPORT);
        Ok(Injection::default()
            .with_edit(
                Placement::At(first.start_byte()),
                format!("{}.{}({}, ", newrelic, wrapper, ctx.agent),
            )
            .with_edit(Placement::At(last.end_byte()), ")")
            .with_import(NEWRELIC_IMPORT))
    }
}

/// `http.Get(...)` and friends are timed with a segment on the current transaction.
pub struct HttpClientIntegration;

impl HttpClientIntegration {
    fn client_function<'a>(stmt: &StatementView<'_, 'a>) -> Option<&'a str> {
        if !matches!(
            stmt.node.kind(),
            "expression_statement" | "short_var_declaration" | "assignment_statement"
        ) {
            return None;
        }
        let (_, func) = stmt.package_call(HTTP_IMPORT)?;
        CLIENT_FUNCTIONS.contains(&func).then_some(func)
    }
}

impl Integration for HttpClientIntegration {
    fn name(&self) -> &'static str {
        "net/http client"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[HTTP_IMPORT]
    }

    fn requires_handle(&self) -> bool {
        true
    }

    fn matches(&self, stmt: &StatementView<'_, '_>) -> bool {
        Self::client_function(stmt).is_some()
    }

    fn is_instrumented(&self, stmt: &StatementView<'_, '_>) -> bool {
        stmt.prev
            .map(|prev| node_text(prev, stmt.source).contains(".StartSegment(\"http."))
            .unwrap_or(false)
    }

    fn generate(&self, stmt: &StatementView<'_, '_>, ctx: &mut GenerateContext<'_>) -> Result<Injection> {
        let Some(func) = Self::client_function(stmt) else {
            return Ok(Injection::default());
        };
        let segment = ctx.namer.fresh("nrSegment")?;
        Ok(Injection::default()
            .with_edit(
                Placement::Before,
                format!("{} := {}.StartSegment(\"http.{}\")", segment, ctx.handle, func),
            )
            .with_edit(Placement::After, format!("{}.End()", segment)))
    }
}
