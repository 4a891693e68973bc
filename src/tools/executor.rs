// Tool execution engine
//
// Dispatches an approved request to its implementation and wraps the outcome
// in a ToolResult. Consent is decided before this point; denied requests
// never get here.

use tracing::{error, info, instrument};

use crate::config::Config;
use crate::tools::implementations::command::CommandLimits;
use crate::tools::implementations::transfer::TransferMode;
use crate::tools::implementations::{self, Execution};
use crate::tools::permissions::ConsentDecision;
use crate::tools::results::ToolResult;
use crate::tools::types::ToolRequest;

/// Limits applied while executing
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    pub command: CommandLimits,
    pub min_disk_space_left: u64,
}

impl ExecutionLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            command: CommandLimits {
                timeout_secs: config.command_timeout_secs,
                max_output_lines: config.max_output_lines,
                max_output_size: config.max_output_size,
            },
            min_disk_space_left: config.min_disk_space_left,
        }
    }
}

/// Tool executor - runs approved requests
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    limits: ExecutionLimits,
}

impl ToolExecutor {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ExecutionLimits::from_config(config))
    }

    /// Execute an approved request
    #[instrument(skip(self, request, decision), fields(kind = %request.kind()))]
    pub async fn execute(&self, request: &ToolRequest, decision: &ConsentDecision) -> ToolResult {
        if let ConsentDecision::Denied { .. } = decision {
            return ToolResult::denied(request, decision.clone());
        }

        let (payload, failure): Execution = match request {
            ToolRequest::Read(r) => implementations::read::execute(r, decision),
            ToolRequest::Write(w) => {
                implementations::write::execute(w, self.limits.min_disk_space_left)
            }
            ToolRequest::Move(t) => implementations::transfer::execute(
                t,
                TransferMode::Move,
                self.limits.min_disk_space_left,
            ),
            ToolRequest::Copy(t) => implementations::transfer::execute(
                t,
                TransferMode::Copy,
                self.limits.min_disk_space_left,
            ),
            ToolRequest::Delete(d) => implementations::delete::execute(d),
            ToolRequest::Command(c) => {
                implementations::command::execute(c, &self.limits.command).await
            }
            ToolRequest::Tree(t) => implementations::tree::execute(t),
        };

        match &failure {
            Some(e) => error!("Tool execution failed: {}", e),
            None => info!("Tool executed successfully"),
        }
        ToolResult::executed(request, decision.clone(), payload, failure)
    }
}
