// Pipeline orchestrator
//
// Takes one batch of raw payloads from the model and produces one result per
// payload, in order. Each request is handled on its own: validation, consent,
// hooks and execution failures become negative results and never stop the
// batch. Only an aborted interaction (Ctrl-C, EOF) ends it early.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::errors::{ConfigurationError, PipelineError, ValidationError};
use crate::interface::Interface;
use crate::plugins;
use crate::tools::executor::ToolExecutor;
use crate::tools::hooks::{HookChain, HookContext};
use crate::tools::pattern_matcher::AutoApprovalRules;
use crate::tools::permissions::{ConsentDecision, ConsentResolver};
use crate::tools::registry::ToolRegistry;
use crate::tools::results::ToolResult;
use crate::tools::types::{timeout_is_valid, ToolRequest, MAX_COMMAND_TIMEOUT_SECS};

pub struct Pipeline {
    config: Arc<Config>,
    registry: Arc<ToolRegistry>,
    hooks: Arc<HookChain>,
    rules: AutoApprovalRules,
    resolver: ConsentResolver,
    executor: ToolExecutor,
}

impl Pipeline {
    /// Assemble a pipeline from an already populated registry and hook chain
    pub fn new(
        config: Config,
        registry: ToolRegistry,
        hooks: HookChain,
    ) -> Result<Self, ConfigurationError> {
        if !timeout_is_valid(config.command_timeout_secs) {
            return Err(ConfigurationError::InvalidTimeout {
                value: config.command_timeout_secs,
                max: MAX_COMMAND_TIMEOUT_SECS,
            });
        }
        let rules = AutoApprovalRules::from_config(&config)?;
        Ok(Self {
            resolver: ConsentResolver::from_config(&config),
            executor: ToolExecutor::from_config(&config),
            rules,
            config: Arc::new(config),
            registry: Arc::new(registry),
            hooks: Arc::new(hooks),
        })
    }

    /// Built-in tools plus every plugin enabled in `config`
    pub fn from_config(config: Config) -> Result<Self, ConfigurationError> {
        let mut registry = ToolRegistry::with_builtin_tools(&config);
        let mut hooks = HookChain::new();
        plugins::load_plugins(&config, &mut registry, &mut hooks)?;
        Self::new(config, registry, hooks)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Process every payload in order
    #[instrument(skip(self, payloads, interface), fields(count = payloads.len()))]
    pub async fn process_batch(
        &self,
        payloads: &[Value],
        interface: &dyn Interface,
    ) -> Result<Vec<ToolResult>, PipelineError> {
        info!("Processing {} request(s)", payloads.len());
        let mut results = Vec::with_capacity(payloads.len());
        for raw in payloads {
            results.push(self.process_request(raw, interface).await?);
        }
        Ok(results)
    }

    /// Run one payload through the whole pipeline
    #[instrument(skip(self, raw, interface))]
    pub async fn process_request(
        &self,
        raw: &Value,
        interface: &dyn Interface,
    ) -> Result<ToolResult, PipelineError> {
        let request = match self.registry.validate(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid request: {}", e);
                interface.display_error(&e.to_string());
                return Ok(ToolResult::invalid(raw, &e));
            }
        };

        for line in request.describe() {
            interface.display_text(&line);
        }

        let decision = self.consent(&request, interface).await?;
        if !decision.is_approved() {
            return Ok(self.finish(ToolResult::denied(&request, decision), interface));
        }

        let ctx = HookContext {
            config: &self.config,
            interface,
        };
        let (request, decision) = match self.hooks.run_before(ctx, request.clone()).await {
            Ok(rewritten) if rewritten == request => (request, decision),
            Ok(rewritten) => match self.reconsent(rewritten, interface).await? {
                Ok(approved) => approved,
                Err(result) => return Ok(self.finish(result, interface)),
            },
            Err(rejection) => {
                warn!("{}", rejection);
                let result = ToolResult::rejected(&request, decision, &rejection);
                return Ok(self.finish(result, interface));
            }
        };

        let result = self.executor.execute(&request, &decision).await;
        let result = self.hooks.run_after(ctx, &request, result).await;
        let result = self
            .resolver
            .release_output(&decision, result, interface)
            .await
            .map_err(PipelineError::Aborted)?;

        Ok(self.finish(result, interface))
    }

    async fn consent(
        &self,
        request: &ToolRequest,
        interface: &dyn Interface,
    ) -> Result<ConsentDecision, PipelineError> {
        let auto_approved = self.rules.evaluate(request);
        self.resolver
            .resolve(request, auto_approved, interface)
            .await
            .map_err(PipelineError::Aborted)
    }

    /// A before-hook changed the request: check it again and ask again
    async fn reconsent(
        &self,
        rewritten: ToolRequest,
        interface: &dyn Interface,
    ) -> Result<Result<(ToolRequest, ConsentDecision), ToolResult>, PipelineError> {
        debug!("Request rewritten by a hook, resolving consent again");

        let rewritten = match rewritten.normalized() {
            Ok(request) if self.registry.contains(request.kind()) => request,
            Ok(request) => {
                let error = ValidationError::UnknownType(request.kind().to_string());
                return Ok(Err(ToolResult::invalid(&request.to_value(), &error)));
            }
            Err(error) => {
                return Ok(Err(ToolResult::invalid(&Value::Null, &error)));
            }
        };

        interface.display_text("Request was modified before execution:");
        for line in rewritten.describe() {
            interface.display_text(&line);
        }

        let decision = self.consent(&rewritten, interface).await?;
        if decision.is_approved() {
            Ok(Ok((rewritten, decision)))
        } else {
            Ok(Err(ToolResult::denied(&rewritten, decision)))
        }
    }

    fn finish(&self, result: ToolResult, interface: &dyn Interface) -> ToolResult {
        match (&result.error, result.accepted) {
            (_, true) => interface.display_text(&format!("[ {} ] done", result.title)),
            (Some(error), false) => interface.display_error(error),
            (None, false) => interface.display_error("request was not accepted"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::ScriptedInterface;
    use serde_json::json;

    #[tokio::test]
    async fn test_invalid_payload_does_not_prompt() {
        let pipeline = Pipeline::from_config(Config::default()).unwrap();
        let iface = ScriptedInterface::new(Vec::<String>::new());
        let result = pipeline
            .process_request(&json!({"title": "scrape", "comment": "x"}), &iface)
            .await
            .unwrap();
        assert!(!result.accepted);
        assert!(iface.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_denied_request_displays_header_then_error() {
        let pipeline = Pipeline::from_config(Config::default()).unwrap();
        let iface = ScriptedInterface::new(["n"]);
        let result = pipeline
            .process_request(
                &json!({"title": "command", "comment": "list", "command": "ls"}),
                &iface,
            )
            .await
            .unwrap();
        assert!(!result.accepted);
        let output = iface.output();
        assert!(output[0].contains("[ command ] list"));
        assert!(output.iter().any(|l| l.contains("declined")));
    }

    #[test]
    fn test_unusable_default_timeout_fails_construction() {
        for value in [f64::INFINITY, 1e20] {
            let config = Config {
                command_timeout_secs: value,
                ..Default::default()
            };
            assert!(matches!(
                Pipeline::from_config(config),
                Err(ConfigurationError::InvalidTimeout { .. })
            ));
        }
    }

    #[test]
    fn test_bad_rule_fails_construction() {
        let config = Config {
            auto_execute_commands: vec!["(".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            Pipeline::from_config(config),
            Err(ConfigurationError::InvalidRegex { .. })
        ));
    }
}
