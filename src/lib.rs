// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! go-instrument - New Relic instrumentation for Go applications.
//!
//! Loads a Go workspace, finds the supported libraries it uses, rewrites the
//! source in memory to add New Relic instrumentation, and writes the result as
//! one unified-diff patch. Analyzed files are never modified.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`syntax`] - tree-sitter backed Go source model, byte-span edits, package loading
//! - [`program`] - Packages, files and per-file import tables
//! - [`callgraph`] - Whole-program call graph with entry points and reverse edges
//! - [`integrations`] - The `Integration` trait and the built-in library rules
//! - [`detect`] - Which integrations apply to a program
//! - [`engine`] - Injection, handle propagation, test call sites, bootstrap, imports
//! - [`patch`] - Unified diff rendering and the patch file write
//! - [`pipeline`] - The end-to-end run with progress events
//! - [`diagnostics`] - Non-fatal findings collected during a run
//! - [`config`] - Configuration loading and merging
//! - [`telemetry`] - Logging setup and step spans
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```rust,ignore
//! use go_instrument::config::{load_config, CliOptions};
//! use go_instrument::pipeline::Pipeline;
//!
//! let config = load_config(root, CliOptions::default())?;
//! let report = Pipeline::new(root, config).run(&|event| println!("{:?}", event))?;
//! println!("wrote {}", report.output_path.display());
//! ```

pub mod callgraph;
pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod integrations;
pub mod patch;
pub mod pipeline;
pub mod program;
pub mod syntax;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
pub use error::{ConfigError, InstrumentError, Result};
pub use pipeline::{Pipeline, ProgressEvent, RunReport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
