// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end instrumentation run.
//!
//! [`Pipeline::run`] is synchronous and reports progress through a callback.
//! [`spawn_pipeline`] runs it on a blocking worker and forwards progress over a
//! channel for the CLI to render.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::callgraph::CallGraph;
use crate::config::InstrumentConfig;
use crate::detect::detect;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::engine::InstrumentationManager;
use crate::error::{InstrumentError, Result};
use crate::integrations::Catalog;
use crate::patch::{DiffEmitter, PatchSummary};
use crate::syntax::{LoadOptions, PackageLoader};
use crate::telemetry::StepSpan;

/// Step names, in run order.
pub const STEPS: [&str; 8] = [
    "Loading packages",
    "Detecting dependencies",
    "Tracing package calls",
    "Scanning application",
    "Instrumenting application",
    "Resolving unit tests",
    "Adding required modules",
    "Writing diff file",
];

/// Progress update emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A step started; `index` is zero-based.
    Step { index: usize, total: usize, name: &'static str },
    PackagesLoaded { packages: usize, files: usize },
    /// One file's diff was rendered.
    File { path: String, description: String },
}

/// Progress callback type.
pub type ProgressCallback<'a> = &'a (dyn Fn(ProgressEvent) + Send + Sync);

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub output_path: PathBuf,
    pub files_changed: usize,
    pub functions_rewritten: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    /// Go modules the instrumented code imports.
    pub required_modules: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Where the patch goes for a root and configuration.
pub fn output_path(root: &Path, config: &InstrumentConfig) -> PathBuf {
    let name = Path::new(&config.diff_file_name);
    if name.is_absolute() {
        name.to_path_buf()
    } else {
        root.join(name)
    }
}

/// The patch file must end in `.diff` and its directory must exist.
pub fn validate_output_path(path: &Path) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some("diff") {
        return Err(InstrumentError::output_path(path, "file name must end in .diff"));
    }
    if path.is_dir() {
        return Err(InstrumentError::output_path(path, "path is a directory"));
    }
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(InstrumentError::output_path(
            path,
            format!("directory {} does not exist", parent.display()),
        ));
    }
    Ok(())
}

/// One instrumentation run over a workspace.
pub struct Pipeline {
    root: PathBuf,
    config: InstrumentConfig,
    catalog: Catalog,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, config: InstrumentConfig) -> Self {
        Self {
            root: root.into(),
            config,
            catalog: Catalog::builtin(),
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    pub fn output_path(&self) -> PathBuf {
        output_path(&self.root, &self.config)
    }

    /// Run every step; nothing is written unless all of them succeed.
    pub fn run(&self, progress: ProgressCallback<'_>) -> Result<RunReport> {
        let output = self.output_path();
        validate_output_path(&output)?;

        let mut sink = DiagnosticSink::new();
        let step = |index: usize| {
            progress(ProgressEvent::Step {
                index,
                total: STEPS.len(),
                name: STEPS[index],
            });
            StepSpan::start(STEPS[index])
        };

        let span = step(0);
        let loader = PackageLoader::new(
            &self.root,
            LoadOptions {
                patterns: self.config.patterns.clone(),
                exclude: self.config.exclude.clone(),
            },
        )?;
        let loaded = loader.load();
        span.finish_with_result(&loaded);
        let mut program = loaded?;
        progress(ProgressEvent::PackagesLoaded {
            packages: program.packages().len(),
            files: program.file_count(),
        });

        let span = step(1);
        let detection = detect(&program, &self.catalog, &mut sink);
        span.finish(true);

        let span = step(2);
        let graph = CallGraph::build(&program, &self.config.handle_name);
        info!(functions = graph.len(), "call graph built");
        span.finish(true);

        let engine_config = self.config.engine();
        let mut manager = InstrumentationManager::new(
            &mut program,
            &self.catalog,
            &engine_config,
            detection,
            &mut sink,
        )?;

        let span = step(3);
        let result = manager.inject();
        span.finish_with_result(&result);
        result?;

        let span = step(4);
        let result = manager.propagate(&graph);
        span.finish_with_result(&result);
        result?;

        let span = step(5);
        let result = manager.resolve_tests(&graph);
        span.finish_with_result(&result);
        result?;

        let span = step(6);
        let result = manager.finish();
        span.finish_with_result(&result);
        let summary = result?;

        let span = step(7);
        let emitter = DiffEmitter::new();
        let written = emitter.emit(&program, &output, |file| {
            progress(ProgressEvent::File {
                path: file.path.clone(),
                description: format!(
                    "instrumented {} (+{} -{})",
                    file.path, file.lines_added, file.lines_removed
                ),
            });
        });
        span.finish_with_result(&written);
        let PatchSummary {
            lines_added,
            lines_removed,
            ..
        } = written?;

        Ok(RunReport {
            output_path: output,
            files_changed: summary.files_changed,
            functions_rewritten: summary.functions_rewritten,
            lines_added,
            lines_removed,
            required_modules: summary.required_modules,
            diagnostics: sink.flush(),
        })
    }
}

/// Run `pipeline` on a blocking worker, sending progress over `tx`.
///
/// A dropped receiver does not stop the run.
pub fn spawn_pipeline(
    pipeline: Pipeline,
    tx: mpsc::Sender<ProgressEvent>,
) -> JoinHandle<Result<RunReport>> {
    tokio::task::spawn_blocking(move || {
        let forward = move |event: ProgressEvent| {
            let _ = tx.blocking_send(event);
        };
        pipeline.run(&forward)
    })
}
