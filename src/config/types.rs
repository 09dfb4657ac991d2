// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the workspace file format (JSON or YAML) and the resolved settings
//! a run uses.

use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;

/// Default name of the patch file written at the workspace root.
pub const DEFAULT_DIFF_FILE_NAME: &str = "new-relic-instrumentation.diff";

/// Workspace configuration.
/// Can be defined in .go-instrument.json or .go-instrument.yaml in the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Variable holding the New Relic application in `main`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_variable: Option<String>,

    /// Name of the transaction parameter threaded through call chains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_name: Option<String>,

    /// Application name reported to New Relic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Patch file name, relative to the workspace root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_file_name: Option<String>,

    /// Create the agent at the top of `main` when needed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_bootstrap: Option<bool>,

    /// Sub-paths to leave out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    /// Package patterns to instrument (`./...`, `./cmd/...`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,

    /// Verbose logging and diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

/// Fully resolved configuration with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentConfig {
    pub agent_variable: String,
    pub handle_name: String,
    pub app_name: Option<String>,
    pub diff_file_name: String,
    pub agent_bootstrap: bool,
    pub exclude: Vec<String>,
    pub patterns: Vec<String>,
    pub debug: bool,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            agent_variable: engine.agent_variable,
            handle_name: engine.handle_name,
            app_name: engine.app_name,
            diff_file_name: DEFAULT_DIFF_FILE_NAME.to_string(),
            agent_bootstrap: engine.agent_bootstrap,
            exclude: Vec::new(),
            patterns: Vec::new(),
            debug: false,
        }
    }
}

impl InstrumentConfig {
    /// Names and switches for the engine.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            agent_variable: self.agent_variable.clone(),
            handle_name: self.handle_name.clone(),
            app_name: self.app_name.clone(),
            agent_bootstrap: self.agent_bootstrap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_config_camel_case() {
        let config: WorkspaceConfig = serde_json::from_str(
            r#"{"agentVariable": "App", "handleName": "txn", "agentBootstrap": false}"#,
        )
        .unwrap();
        assert_eq!(config.agent_variable.as_deref(), Some("App"));
        assert_eq!(config.handle_name.as_deref(), Some("txn"));
        assert_eq!(config.agent_bootstrap, Some(false));
        assert!(config.exclude.is_none());
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let config = WorkspaceConfig {
            app_name: Some("checkout".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"appName":"checkout"}"#);
    }

    #[test]
    fn test_resolved_defaults() {
        let config = InstrumentConfig::default();
        assert_eq!(config.diff_file_name, DEFAULT_DIFF_FILE_NAME);
        assert_eq!(config.engine(), EngineConfig::default());
        assert!(!config.debug);
    }
}
