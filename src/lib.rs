// toolgate - consent pipeline for model-issued tool requests
// Library exports

pub mod config;
pub mod errors;
pub mod interface;
pub mod plugins;
pub mod tools;

pub use config::Config;
pub use errors::{
    ConfigurationError, ExecutionError, HookRejection, InteractionError, PipelineError,
    ValidationError,
};
pub use interface::{Interface, ScriptedInterface, TerminalInterface};
pub use tools::{ConsentDecision, Pipeline, ToolRequest, ToolResult};
