// Shellcheck plugin - rejects obviously destructive commands
//
// A before-hook on `command` requests. Built-in patterns cover recursive
// deletion of / or ~, filesystem creation, raw device writes and fork bombs;
// more can be added with `extra_patterns` in the plugin's config table.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

use super::{Plugin, PluginRegistrar};
use crate::errors::{ConfigurationError, HookRejection};
use crate::tools::hooks::{BeforeHook, HookContext, HookFilter};
use crate::tools::types::{ToolKind, ToolRequest};

const PLUGIN_NAME: &str = "shellcheck";

const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    (
        r"\brm\s+(?:-[a-zA-Z]*\s+)*-[a-zA-Z]*[rR][a-zA-Z]*\s+(?:-[a-zA-Z]*\s+)*(?:/|/\*|~/?)(?:\s|$|;)",
        "recursive delete of / or ~",
    ),
    (r"\bmkfs(?:\.\w+)?\b", "filesystem creation"),
    (r"\bdd\b.*\bof=/dev/", "raw device write"),
    (r">\s*/dev/(?:sd|hd|nvme|disk|mmcblk)", "device overwrite"),
    (r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:", "fork bomb"),
    (r"\bchmod\s+(?:-R\s+)?777\s+/(?:\s|$)", "world-writable root"),
];

struct Rule {
    regex: Regex,
    label: String,
}

pub struct ShellcheckPlugin {
    hook: Arc<ShellcheckHook>,
}

impl ShellcheckPlugin {
    /// Built-in rules plus `extra_patterns` (list of regexes) from the plugin table
    pub fn from_table(table: &toml::Table) -> Result<Self, ConfigurationError> {
        let misconfigured = |reason: String| ConfigurationError::Plugin {
            plugin: PLUGIN_NAME.to_string(),
            reason,
        };

        let mut rules = Vec::new();
        for (pattern, label) in DANGEROUS_PATTERNS {
            let regex = Regex::new(pattern).map_err(|e| misconfigured(e.to_string()))?;
            rules.push(Rule {
                regex,
                label: label.to_string(),
            });
        }

        if let Some(extra) = table.get("extra_patterns") {
            let extra = extra
                .as_array()
                .ok_or_else(|| misconfigured("extra_patterns must be a list".to_string()))?;
            for value in extra {
                let pattern = value.as_str().ok_or_else(|| {
                    misconfigured("extra_patterns entries must be strings".to_string())
                })?;
                let regex = Regex::new(pattern)
                    .map_err(|e| misconfigured(format!("bad pattern '{}': {}", pattern, e)))?;
                rules.push(Rule {
                    regex,
                    label: pattern.to_string(),
                });
            }
        }

        Ok(Self {
            hook: Arc::new(ShellcheckHook { rules }),
        })
    }
}

impl Plugin for ShellcheckPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn register_hooks(&self, registrar: &mut PluginRegistrar<'_>) -> Result<(), ConfigurationError> {
        registrar.before(HookFilter::only([ToolKind::Command]), self.hook.clone())
    }
}

struct ShellcheckHook {
    rules: Vec<Rule>,
}

impl ShellcheckHook {
    fn check(&self, command: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.regex.is_match(command))
    }
}

#[async_trait]
impl BeforeHook for ShellcheckHook {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    async fn before(
        &self,
        _ctx: HookContext<'_>,
        request: ToolRequest,
    ) -> Result<ToolRequest, HookRejection> {
        if let Some(command) = request.command() {
            if let Some(rule) = self.check(command) {
                warn!("Blocked command '{}' ({})", command, rule.label);
                return Err(HookRejection::new(format!(
                    "command `{}` matches dangerous pattern: {}",
                    command, rule.label
                )));
            }
        }
        Ok(request)
    }
}
