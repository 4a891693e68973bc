// Auto-approval matcher
//
// Decides whether a request may skip the consent prompt. File operations are
// matched against path globs, commands against regexes. Rules are compiled
// once at startup; evaluation is pure.

use glob::{MatchOptions, Pattern};
use regex::Regex;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::errors::ConfigurationError;
use crate::tools::filesystem;
use crate::tools::types::ToolRequest;

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled auto-approval rules, kept in configuration order
#[derive(Debug, Clone, Default)]
pub struct AutoApprovalRules {
    path_globs: Vec<Pattern>,
    command_patterns: Vec<Regex>,
}

impl AutoApprovalRules {
    /// Compile globs and regexes; regexes are anchored to match the whole command
    pub fn compile<P, C>(paths: P, commands: C) -> Result<Self, ConfigurationError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let mut path_globs = Vec::new();
        for raw in paths {
            let raw = raw.as_ref();
            let expanded = filesystem::expand_user(raw);
            let pattern = Pattern::new(&expanded.to_string_lossy()).map_err(|source| {
                ConfigurationError::InvalidGlob {
                    pattern: raw.to_string(),
                    source,
                }
            })?;
            path_globs.push(pattern);
        }

        let mut command_patterns = Vec::new();
        for raw in commands {
            let raw = raw.as_ref();
            let regex = Regex::new(&format!("^(?:{})$", raw)).map_err(|source| {
                ConfigurationError::InvalidRegex {
                    pattern: raw.to_string(),
                    source,
                }
            })?;
            command_patterns.push(regex);
        }

        debug!(
            "Compiled {} path rule(s) and {} command rule(s)",
            path_globs.len(),
            command_patterns.len()
        );
        Ok(Self {
            path_globs,
            command_patterns,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        Self::compile(&config.auto_allowed_paths, &config.auto_execute_commands)
    }

    pub fn is_empty(&self) -> bool {
        self.path_globs.is_empty() && self.command_patterns.is_empty()
    }

    /// Whether `request` may run without asking
    #[instrument(skip(self, request), fields(kind = %request.kind()))]
    pub fn evaluate(&self, request: &ToolRequest) -> bool {
        let approved = match request.command() {
            Some(command) => self.command_matches(command),
            None => {
                let paths = request.paths();
                !paths.is_empty() && paths.iter().all(|p| self.path_matches(p))
            }
        };
        debug!(approved, "auto-approval evaluated");
        approved
    }

    /// Match a user-supplied path after expansion and lexical normalisation
    pub fn path_matches(&self, path: &str) -> bool {
        let absolute = filesystem::absolute_path(path);
        self.path_globs
            .iter()
            .any(|glob| glob.matches_path_with(&absolute, GLOB_OPTIONS))
    }

    pub fn command_matches(&self, command: &str) -> bool {
        let command = command.trim();
        self.command_patterns.iter().any(|re| re.is_match(command))
    }
}
