// Redact-home plugin - replaces the user's home directory with `~` in results

use async_trait::async_trait;
use std::sync::Arc;

use super::{Plugin, PluginRegistrar};
use crate::errors::ConfigurationError;
use crate::tools::hooks::{AfterHook, HookContext, HookFilter};
use crate::tools::results::ToolResult;
use crate::tools::types::ToolRequest;

const PLUGIN_NAME: &str = "redact_home";

pub struct RedactHomePlugin {
    hook: Arc<RedactHomeHook>,
}

impl RedactHomePlugin {
    pub fn new(home: impl Into<String>) -> Self {
        let home = home.into().trim_end_matches('/').to_string();
        Self {
            hook: Arc::new(RedactHomeHook { home }),
        }
    }

    pub fn from_env() -> Result<Self, ConfigurationError> {
        let home = dirs::home_dir().ok_or_else(|| ConfigurationError::Plugin {
            plugin: PLUGIN_NAME.to_string(),
            reason: "cannot determine the home directory".to_string(),
        })?;
        Ok(Self::new(home.display().to_string()))
    }
}

impl Plugin for RedactHomePlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn register_hooks(&self, registrar: &mut PluginRegistrar<'_>) -> Result<(), ConfigurationError> {
        registrar.after(HookFilter::all(), self.hook.clone())
    }
}

struct RedactHomeHook {
    home: String,
}

impl RedactHomeHook {
    fn redact_path(&self, path: &str) -> Option<String> {
        if self.home.is_empty() {
            return None;
        }
        if path == self.home {
            return Some("~".to_string());
        }
        path.strip_prefix(&self.home)
            .filter(|rest| rest.starts_with('/'))
            .map(|rest| format!("~{}", rest))
    }
}

#[async_trait]
impl AfterHook for RedactHomeHook {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    async fn after(
        &self,
        _ctx: HookContext<'_>,
        _request: &ToolRequest,
        mut result: ToolResult,
    ) -> ToolResult {
        if let Some(payload) = result.payload.as_mut() {
            payload.rewrite_paths(&|p: &str| self.redact_path(p));
        }
        if let Some(error) = result.error.as_mut() {
            *error = error.replace(&format!("{}/", self.home), "~/");
        }
        result
    }
}
