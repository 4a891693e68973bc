// Before/after hook chain
//
// Hooks are registered at startup with an optional set of request kinds and
// run in registration order. Before-hooks may rewrite or veto a request;
// after-hooks may rewrite a result but never turn a failure into a success.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::{ConfigurationError, HookRejection};
use crate::interface::Interface;
use crate::tools::registry::ToolRegistry;
use crate::tools::results::ToolResult;
use crate::tools::types::{ToolKind, ToolRequest};

/// What a hook can see besides the request itself
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    pub config: &'a Config,
    pub interface: &'a dyn Interface,
}

#[async_trait]
pub trait BeforeHook: Send + Sync {
    fn name(&self) -> &str;

    /// Return the request to pass on (possibly rewritten) or reject it
    async fn before(
        &self,
        ctx: HookContext<'_>,
        request: ToolRequest,
    ) -> Result<ToolRequest, HookRejection>;
}

#[async_trait]
pub trait AfterHook: Send + Sync {
    fn name(&self) -> &str;

    async fn after(
        &self,
        ctx: HookContext<'_>,
        request: &ToolRequest,
        result: ToolResult,
    ) -> ToolResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

/// Which request kinds a hook applies to; `None` means all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookFilter(Option<HashSet<ToolKind>>);

impl HookFilter {
    pub fn all() -> Self {
        Self(None)
    }

    pub fn only<I: IntoIterator<Item = ToolKind>>(kinds: I) -> Self {
        Self(Some(kinds.into_iter().collect()))
    }

    pub fn matches(&self, kind: ToolKind) -> bool {
        match &self.0 {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }

    fn kinds(&self) -> impl Iterator<Item = &ToolKind> {
        self.0.iter().flatten()
    }
}

struct Registration<H: ?Sized> {
    plugin: String,
    filter: HookFilter,
    hook: Arc<H>,
}

#[derive(Default)]
pub struct HookChain {
    before: Vec<Registration<dyn BeforeHook>>,
    after: Vec<Registration<dyn AfterHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_filter(
        hook: &str,
        filter: &HookFilter,
        registry: &ToolRegistry,
    ) -> Result<(), ConfigurationError> {
        if let Some(kind) = filter.kinds().find(|k| !registry.contains(**k)) {
            return Err(ConfigurationError::UnknownHookFilter {
                hook: hook.to_string(),
                kind: kind.to_string(),
            });
        }
        Ok(())
    }

    pub fn register_before(
        &mut self,
        plugin: &str,
        filter: HookFilter,
        hook: Arc<dyn BeforeHook>,
        registry: &ToolRegistry,
    ) -> Result<(), ConfigurationError> {
        Self::check_filter(hook.name(), &filter, registry)?;
        debug!("Registered before-hook '{}' from plugin '{}'", hook.name(), plugin);
        self.before.push(Registration {
            plugin: plugin.to_string(),
            filter,
            hook,
        });
        Ok(())
    }

    pub fn register_after(
        &mut self,
        plugin: &str,
        filter: HookFilter,
        hook: Arc<dyn AfterHook>,
        registry: &ToolRegistry,
    ) -> Result<(), ConfigurationError> {
        Self::check_filter(hook.name(), &filter, registry)?;
        debug!("Registered after-hook '{}' from plugin '{}'", hook.name(), plugin);
        self.after.push(Registration {
            plugin: plugin.to_string(),
            filter,
            hook,
        });
        Ok(())
    }

    pub fn len(&self, phase: HookPhase) -> usize {
        match phase {
            HookPhase::Before => self.before.len(),
            HookPhase::After => self.after.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Run matching before-hooks in order; the first rejection stops the chain
    pub async fn run_before(
        &self,
        ctx: HookContext<'_>,
        mut request: ToolRequest,
    ) -> Result<ToolRequest, HookRejection> {
        for reg in &self.before {
            // An earlier hook may have changed the kind
            if !reg.filter.matches(request.kind()) {
                continue;
            }
            debug!(hook = reg.hook.name(), plugin = %reg.plugin, "running before-hook");
            request = reg
                .hook
                .before(ctx, request)
                .await
                .map_err(|rejection| rejection.attributed_to(reg.hook.name()))?;
        }
        Ok(request)
    }

    /// Run matching after-hooks in order
    pub async fn run_after(
        &self,
        ctx: HookContext<'_>,
        request: &ToolRequest,
        mut result: ToolResult,
    ) -> ToolResult {
        for reg in self.after.iter().filter(|r| r.filter.matches(request.kind())) {
            debug!(hook = reg.hook.name(), plugin = %reg.plugin, "running after-hook");
            let was_failure = !result.accepted;
            let original_error = result.error.clone();

            result = reg.hook.after(ctx, request, result).await;

            if was_failure && result.accepted {
                warn!(
                    "After-hook '{}' tried to mark a failed request as accepted; reverting",
                    reg.hook.name()
                );
                result.accepted = false;
                result.error = original_error;
            }
        }
        result
    }
}
