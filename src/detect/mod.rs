// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Dependency detection: which integrations apply to the loaded program.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::integrations::{Catalog, NEWRELIC_MODULE};
use crate::program::Program;

/// Integrations activated by the program's imports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Catalog indices, in catalog order.
    pub active: Vec<usize>,
    /// Go modules providing the imports active integrations may add.
    pub required_modules: BTreeSet<String>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Match every import path in the program against the catalog's triggers.
///
/// Finding nothing is not an error: a warning is logged and recorded.
pub fn detect(program: &Program, catalog: &Catalog, sink: &mut DiagnosticSink) -> Detection {
    let import_paths = program.all_import_paths();
    let active = catalog.active_for(&import_paths);

    let mut required_modules = BTreeSet::new();
    for index in &active {
        if let Some(integration) = catalog.get(*index) {
            info!(integration = integration.name(), "integration active");
            required_modules.insert(integration.required_module().to_string());
        }
    }
    if !active.is_empty() {
        required_modules.insert(NEWRELIC_MODULE.to_string());
    } else {
        warn!(
            imports = import_paths.len(),
            "no supported libraries found; nothing will be instrumented"
        );
        sink.record(Diagnostic::new(
            DiagnosticKind::DetectionEmpty,
            "no supported library is imported by the selected packages",
        ));
    }

    Detection {
        active,
        required_modules,
    }
}
