// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module.
//!
//! Handles loading, merging, and validation of configuration from two sources:
//! - Workspace config: .go-instrument.json, .go-instrument.yaml or .go-instrument.yml
//! - CLI options: command-line arguments
//!
//! Configuration is merged with precedence (CLI > workspace > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{load_config_file, load_workspace_config, CONFIG_FILES};

pub use merger::{merge_config, validate_config, CliOptions};

pub use types::{InstrumentConfig, WorkspaceConfig, DEFAULT_DIFF_FILE_NAME};

use crate::error::ConfigError;
use std::path::Path;

/// Load, merge and validate the configuration for a workspace.
pub fn load_config(
    workspace_root: &Path,
    cli_options: CliOptions,
) -> Result<InstrumentConfig, ConfigError> {
    let workspace = load_workspace_config(workspace_root)?;
    let config = merge_config(workspace, cli_options);
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), CliOptions::default()).unwrap();
        assert_eq!(config, InstrumentConfig::default());
    }

    #[test]
    fn test_load_config_rejects_invalid_identifier() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".go-instrument.json"),
            r#"{"agentVariable": "1app"}"#,
        )
        .unwrap();
        let result = load_config(temp.path(), CliOptions::default());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
