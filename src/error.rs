// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the instrumentation engine.
//!
//! Fatal conditions are modeled as [`InstrumentError`] variants and propagate with `?`.
//! Non-fatal conditions (no supported library found, a reference in an unmodeled
//! statement shape) are recorded in the [`crate::diagnostics::DiagnosticSink`] instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run, or (for [`InstrumentError::IdentifierCollision`]) a single file.
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("failed to load packages: {0}")]
    LoadFailure(String),

    #[error("invalid output path {path}: {reason}")]
    OutputPathInvalid { path: PathBuf, reason: String },

    #[error("failed to render {path}: {reason}")]
    SerializationFailure { path: String, reason: String },

    #[error("could not synthesize a unique name for {base} in {path} after {attempts} attempts")]
    IdentifierCollision {
        path: String,
        base: String,
        attempts: usize,
    },

    #[error("conflicting edits in {path}: {reason}")]
    EditConflict { path: String, reason: String },

    #[error("parser error: {0}")]
    Parser(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstrumentError {
    /// Create an output path error.
    pub fn output_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OutputPathInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error only invalidates the file it occurred in.
    ///
    /// File-scoped errors are recorded as diagnostics and the run continues with
    /// the remaining files.
    pub fn is_file_scoped(&self) -> bool {
        matches!(self, Self::IdentifierCollision { .. } | Self::EditConflict { .. })
    }
}

/// Errors that can occur while loading the workspace configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, InstrumentError>;
