// Tool implementations
//
// One module per request kind. Each exposes a `spec()` for the registry and
// an `execute` that never panics on filesystem or process faults: it returns
// whatever payload it could build plus the error, if any.

use crate::errors::ExecutionError;
use crate::tools::results::ResultPayload;

pub mod command;
pub mod delete;
pub mod read;
pub mod transfer;
pub mod tree;
pub mod write;

/// Payload plus the fault that stopped the operation, if any
pub type Execution = (ResultPayload, Option<ExecutionError>);
