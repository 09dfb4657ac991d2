// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use crate::error::ConfigError;
use crate::syntax::nodes::is_identifier;

use super::types::{InstrumentConfig, WorkspaceConfig};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub output: Option<String>,
    pub app_name: Option<String>,
    pub exclude: Option<Vec<String>>,
    pub patterns: Option<Vec<String>>,
    pub no_bootstrap: bool,
    pub debug: bool,
}

/// Merge configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. Workspace config (.go-instrument.json / .yaml)
/// 3. Default values
pub fn merge_config(workspace: Option<WorkspaceConfig>, cli: CliOptions) -> InstrumentConfig {
    let mut result = InstrumentConfig::default();

    if let Some(config) = workspace {
        apply_workspace_config(&mut result, &config);
    }

    apply_cli_options(&mut result, &cli);

    result
}

fn apply_workspace_config(result: &mut InstrumentConfig, config: &WorkspaceConfig) {
    if let Some(ref agent_variable) = config.agent_variable {
        result.agent_variable = agent_variable.clone();
    }

    if let Some(ref handle_name) = config.handle_name {
        result.handle_name = handle_name.clone();
    }

    if config.app_name.is_some() {
        result.app_name = config.app_name.clone();
    }

    if let Some(ref diff_file_name) = config.diff_file_name {
        result.diff_file_name = diff_file_name.clone();
    }

    if let Some(agent_bootstrap) = config.agent_bootstrap {
        result.agent_bootstrap = agent_bootstrap;
    }

    if let Some(ref exclude) = config.exclude {
        for path in exclude {
            if !result.exclude.contains(path) {
                result.exclude.push(path.clone());
            }
        }
    }

    if let Some(ref patterns) = config.patterns {
        result.patterns = patterns.clone();
    }

    if let Some(debug) = config.debug {
        result.debug = debug;
    }
}

fn apply_cli_options(result: &mut InstrumentConfig, cli: &CliOptions) {
    if let Some(ref output) = cli.output {
        result.diff_file_name = output.clone();
    }

    if cli.app_name.is_some() {
        result.app_name = cli.app_name.clone();
    }

    if let Some(ref exclude) = cli.exclude {
        for path in exclude {
            if !result.exclude.contains(path) {
                result.exclude.push(path.clone());
            }
        }
    }

    if let Some(ref patterns) = cli.patterns {
        if !patterns.is_empty() {
            result.patterns = patterns.clone();
        }
    }

    if cli.no_bootstrap {
        result.agent_bootstrap = false;
    }

    if cli.debug {
        result.debug = true;
    }
}

/// Check values that end up in generated Go code.
pub fn validate_config(config: &InstrumentConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("agentVariable", &config.agent_variable),
        ("handleName", &config.handle_name),
    ] {
        if !is_identifier(value) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("`{}` is not a Go identifier", value),
            });
        }
    }
    if config.agent_variable == config.handle_name {
        return Err(ConfigError::InvalidValue {
            field: "handleName".to_string(),
            message: "must differ from agentVariable".to_string(),
        });
    }
    if config.diff_file_name.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "diffFileName".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if let Some(app_name) = &config.app_name {
        if app_name.contains('"') || app_name.contains('\\') || app_name.contains('\n') {
            return Err(ConfigError::InvalidValue {
                field: "appName".to_string(),
                message: "must not contain quotes, backslashes or newlines".to_string(),
            });
        }
    }
    Ok(())
}
