// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gin routers get the `nrgin` middleware.

use super::{GenerateContext, Injection, Integration, Placement, Scope, StatementView};
use crate::error::Result;
use crate::syntax::nodes::{assigned_names, node_text};

const GIN_IMPORT: &str = "github.com/gin-gonic/gin";
const NRGIN_IMPORT: &str = "github.com/newrelic/go-agent/v3/integrations/nrgin";

/// `r := gin.Default()` / `gin.New()` gains `r.Use(nrgin.Middleware(agent))`.
pub struct GinIntegration;

impl GinIntegration {
    fn router_name(stmt: &StatementView<'_, '_>) -> Option<String> {
        if !matches!(stmt.node.kind(), "short_var_declaration" | "assignment_statement") {
            return None;
        }
        let (_, func) = stmt.package_call(GIN_IMPORT)?;
        if func != "Default" && func != "New" {
            return None;
        }
        assigned_names(stmt.node, stmt.source)
            .into_iter()
            .next()
            .filter(|name| name != "_")
    }
}

impl Integration for GinIntegration {
    fn name(&self) -> &'static str {
        "gin"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &[GIN_IMPORT]
    }

    fn required_module(&self) -> &'static str {
        NRGIN_IMPORT
    }

    fn scope(&self) -> Scope {
        Scope::MainOnly
    }

    fn matches(&self, stmt: &StatementView<'_, '_>) -> bool {
        Self::router_name(stmt).is_some()
    }

    fn is_instrumented(&self, stmt: &StatementView<'_, '_>) -> bool {
        stmt.next
            .map(|next| node_text(next, stmt.source).contains(".Middleware("))
            .unwrap_or(false)
    }

    fn generate(&self, stmt: &StatementView<'_, '_>, ctx: &mut GenerateContext<'_>) -> Result<Injection> {
        let router = Self::router_name(stmt).unwrap_or_default();
        let nrgin = stmt.package_name(NRGIN_IMPORT);
        Ok(Injection::default()
            .with_edit(
                Placement::After,
                format!("{}.Use({}.Middleware({}))", router, nrgin, ctx.agent),
            )
            .with_import(NRGIN_IMPORT))
    }
}
