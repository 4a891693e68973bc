// Configuration structs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pipeline configuration
///
/// Every field has a default so a partial TOML file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Glob patterns for paths whose file operations run without prompting.
    /// Evaluated in order against the canonical absolute path; `~` is expanded.
    pub auto_allowed_paths: Vec<String>,

    /// Regular expressions for commands that run without prompting.
    /// Each pattern must match the whole (trimmed) command.
    pub auto_execute_commands: Vec<String>,

    /// Disable the `command` tool entirely
    pub no_commands: bool,

    /// Send command output back without asking a second time
    pub auto_send: bool,

    /// Maximum number of output lines kept per stream (0 = unlimited)
    pub max_output_lines: usize,

    /// Maximum number of output characters kept per stream (0 = unlimited)
    pub max_output_size: usize,

    /// Default command timeout in seconds, used when a request gives none
    pub command_timeout_secs: f64,

    /// Writes and copies fail if they would leave less free space than this (bytes, 0 = off)
    pub min_disk_space_left: u64,

    /// Enabled plugins, keyed by name, with their own settings table
    pub plugins: BTreeMap<String, toml::Table>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_allowed_paths: Vec::new(),
            auto_execute_commands: Vec::new(),
            no_commands: false,
            auto_send: false,
            max_output_lines: 200,
            max_output_size: 20_000,
            command_timeout_secs: 10.0,
            min_disk_space_left: 0,
            plugins: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.auto_allowed_paths.is_empty());
        assert!(config.auto_execute_commands.is_empty());
        assert!(!config.no_commands);
        assert!(!config.auto_send);
        assert_eq!(config.command_timeout_secs, 10.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            auto_execute_commands = ['^ls\s*.*$']
            max_output_lines = 12

            [plugins.shellcheck]
            "#,
        )
        .unwrap();

        assert_eq!(config.auto_execute_commands, vec![r"^ls\s*.*$".to_string()]);
        assert_eq!(config.max_output_lines, 12);
        assert_eq!(config.max_output_size, 20_000);
        assert!(config.plugins["shellcheck"].is_empty());
        assert!(!config.plugins.contains_key("tree"));
    }
}
