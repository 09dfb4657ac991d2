// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Run-scoped diagnostics.
//!
//! Non-fatal findings are collected in a [`DiagnosticSink`] that is created for a
//! single run, handed to each stage, and flushed once at the end.

use serde::Serialize;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    #[default]
    Information,
}

impl DiagnosticSeverity {
    /// Get a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
        }
    }
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No supported library is imported anywhere.
    DetectionEmpty,
    /// A reference to a rebound identifier sits in a statement shape that is not rewritten.
    InjectionAmbiguity,
    /// A unique identifier could not be synthesized; the file's pending edits were dropped.
    IdentifierCollision,
    /// Edits for a file could not be combined; the file's pending edits were dropped.
    EditConflict,
    /// A match that needs a tracing handle is not reachable from any entry point.
    UnreachableMatch,
    /// A function on a propagation path cannot take a new parameter.
    PropagationBarrier,
}

impl DiagnosticKind {
    pub fn default_severity(self) -> DiagnosticSeverity {
        match self {
            Self::IdentifierCollision | Self::EditConflict => DiagnosticSeverity::Error,
            Self::DetectionEmpty | Self::InjectionAmbiguity | Self::PropagationBarrier => {
                DiagnosticSeverity::Warning
            }
            Self::UnreachableMatch => DiagnosticSeverity::Information,
        }
    }
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    /// Root-relative path of the file concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: usize) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Format as `file:line: severity: message`.
    pub fn format_line(&self) -> String {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                format!("{}:{}: {}: {}", file, line, self.severity, self.message)
            }
            (Some(file), None) => format!("{}: {}: {}", file, self.severity, self.message),
            _ => format!("{}: {}", self.severity, self.message),
        }
    }
}

/// Collects diagnostics for one run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(kind = ?diagnostic.kind, "{}", diagnostic.format_line());
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Log every collected diagnostic and hand them over, leaving the sink empty.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        for diagnostic in &self.diagnostics {
            match diagnostic.severity {
                DiagnosticSeverity::Error => tracing::error!("{}", diagnostic.format_line()),
                DiagnosticSeverity::Warning => tracing::warn!("{}", diagnostic.format_line()),
                DiagnosticSeverity::Information => tracing::info!("{}", diagnostic.format_line()),
            }
        }
        std::mem::take(&mut self.diagnostics)
    }
}
