// Tool request handling
//
// Typed requests from the model, the consent pipeline that gates them and the
// implementations that carry them out.

pub mod executor;
pub mod filesystem;
pub mod hooks;
pub mod implementations;
pub mod output;
pub mod pattern_matcher;
pub mod permissions;
pub mod pipeline;
pub mod registry;
pub mod results;
pub mod types;

pub use executor::{ExecutionLimits, ToolExecutor};
pub use hooks::{AfterHook, BeforeHook, HookChain, HookContext, HookFilter, HookPhase};
pub use pattern_matcher::AutoApprovalRules;
pub use permissions::{ConsentDecision, ConsentPolicy, ConsentResolver, ConsentState};
pub use pipeline::Pipeline;
pub use registry::{ToolRegistry, ToolSpec};
pub use results::{ResultPayload, ToolResult};
pub use types::{ToolDefinition, ToolKind, ToolRequest};
