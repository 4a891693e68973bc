// Plugin loading
//
// Plugins are compiled in and enabled by listing them under `[plugins]` in
// the configuration. Loading happens once at startup in two passes: every
// enabled plugin contributes its tool types first, then its hooks, so a hook
// may filter on a kind another plugin provides.

mod redact_home;
mod shellcheck;
mod tree;

pub use redact_home::RedactHomePlugin;
pub use shellcheck::ShellcheckPlugin;
pub use tree::TreePlugin;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::ConfigurationError;
use crate::tools::hooks::{AfterHook, BeforeHook, HookChain, HookFilter};
use crate::tools::registry::{ToolRegistry, ToolSpec};

/// Handle a plugin uses to attach its hooks
pub struct PluginRegistrar<'a> {
    plugin: &'a str,
    registry: &'a ToolRegistry,
    hooks: &'a mut HookChain,
}

impl<'a> PluginRegistrar<'a> {
    pub fn new(plugin: &'a str, registry: &'a ToolRegistry, hooks: &'a mut HookChain) -> Self {
        Self {
            plugin,
            registry,
            hooks,
        }
    }

    pub fn before(
        &mut self,
        filter: HookFilter,
        hook: Arc<dyn BeforeHook>,
    ) -> Result<(), ConfigurationError> {
        self.hooks
            .register_before(self.plugin, filter, hook, self.registry)
    }

    pub fn after(
        &mut self,
        filter: HookFilter,
        hook: Arc<dyn AfterHook>,
    ) -> Result<(), ConfigurationError> {
        self.hooks
            .register_after(self.plugin, filter, hook, self.registry)
    }
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Extra tool types this plugin provides
    fn tools(&self) -> Vec<ToolSpec> {
        Vec::new()
    }

    fn register_hooks(&self, _registrar: &mut PluginRegistrar<'_>) -> Result<(), ConfigurationError> {
        Ok(())
    }
}

/// Instantiate the plugins enabled in `config`, in name order
pub fn builtin_plugins(config: &Config) -> Result<Vec<Box<dyn Plugin>>, ConfigurationError> {
    let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();
    for (name, table) in &config.plugins {
        match name.as_str() {
            "tree" => plugins.push(Box::new(TreePlugin)),
            "shellcheck" => plugins.push(Box::new(ShellcheckPlugin::from_table(table)?)),
            "redact_home" => plugins.push(Box::new(RedactHomePlugin::from_env()?)),
            other => warn!("Unknown plugin '{}' in configuration, ignoring", other),
        }
    }
    Ok(plugins)
}

/// Register the given plugins' tools, then their hooks
pub fn register_plugins(
    plugins: &[Box<dyn Plugin>],
    registry: &mut ToolRegistry,
    hooks: &mut HookChain,
) -> Result<(), ConfigurationError> {
    for plugin in plugins {
        for spec in plugin.tools() {
            registry.register(spec)?;
        }
    }

    for plugin in plugins {
        let mut registrar = PluginRegistrar::new(plugin.name(), registry, hooks);
        plugin.register_hooks(&mut registrar)?;
        info!("Loaded plugin '{}'", plugin.name());
    }
    Ok(())
}

/// Load every plugin enabled in `config`; returns their names
pub fn load_plugins(
    config: &Config,
    registry: &mut ToolRegistry,
    hooks: &mut HookChain,
) -> Result<Vec<String>, ConfigurationError> {
    let plugins = builtin_plugins(config)?;
    register_plugins(&plugins, registry, hooks)?;
    Ok(plugins.iter().map(|p| p.name().to_string()).collect())
}
