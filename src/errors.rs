// Error taxonomy for the consent pipeline
//
// Validation, execution and hook errors are recovered per request and turned
// into negative tool results. Configuration errors are fatal at startup and
// interaction aborts are the only errors that stop a whole batch.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A raw payload could not be turned into a typed request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("request payload must be a JSON object")]
    NotAnObject,

    #[error("request payload is missing the `title` discriminator")]
    MissingTitle,

    #[error("unknown tool type '{0}'")]
    UnknownType(String),

    #[error("malformed '{title}' request: {reason}")]
    Malformed { title: String, reason: String },

    #[error("'{title}' request has an empty `{field}`")]
    EmptyField { title: String, field: &'static str },

    #[error("'{title}' request field `{field}` must be between {min} and {max}, got {value}")]
    OutOfRange {
        title: String,
        field: &'static str,
        min: u32,
        max: u32,
        value: u32,
    },

    #[error("'{title}' request `timeout` must be a finite number of seconds up to {max}, got {value}")]
    InvalidTimeout { title: String, value: f64, max: f64 },
}

/// Tool type registration failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("tool type '{0}' is already registered")]
    DuplicateType(String),
}

/// A filesystem or process fault while executing an approved request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("refusing to overwrite existing path: {}", .0.display())]
    WouldOverwrite(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot move or copy {} into itself ({})", .path.display(), .destination.display())]
    IntoItself { path: PathBuf, destination: PathBuf },

    #[error("command timed out after {secs:.1}s")]
    Timeout { secs: f64 },

    #[error("unusable command timeout: {secs}")]
    InvalidTimeout { secs: f64 },

    #[error("command exited with status {code}")]
    NonZeroExit { code: i32 },

    #[error("command was terminated by a signal")]
    Terminated,

    #[error("not enough disk space at {}: {available} bytes free, {required} bytes required", .path.display())]
    InsufficientSpace {
        path: PathBuf,
        available: u64,
        required: u64,
    },

    #[error("{context}: {message}")]
    Io { context: String, message: String },
}

impl ExecutionError {
    /// Map an io error on `path` onto the typed variants
    pub fn from_io(err: &io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ExecutionError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => {
                ExecutionError::PermissionDenied(path.to_path_buf())
            }
            io::ErrorKind::AlreadyExists => ExecutionError::WouldOverwrite(path.to_path_buf()),
            _ => ExecutionError::Io {
                context: path.display().to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn io(context: impl Into<String>, err: &io::Error) -> Self {
        ExecutionError::Io {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

/// A before-hook vetoed a request
#[derive(Debug, Clone, PartialEq, Error)]
#[error("rejected by hook '{hook}': {reason}")]
pub struct HookRejection {
    pub hook: String,
    pub reason: String,
}

impl HookRejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            hook: String::new(),
            reason: reason.into(),
        }
    }

    /// Attribute the rejection to a hook unless the hook already named itself
    pub fn attributed_to(mut self, hook: &str) -> Self {
        if self.hook.is_empty() {
            self.hook = hook.to_string();
        }
        self
    }
}

/// Startup configuration problems: malformed rules, bad hook filters, plugin setup
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid auto-approval glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("invalid auto-approval regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("command_timeout_secs must be a finite number of seconds up to {max}, got {value}")]
    InvalidTimeout { value: f64, max: f64 },

    #[error("hook '{hook}' filters on tool type '{kind}', which is not registered")]
    UnknownHookFilter { hook: String, kind: String },

    #[error("plugin '{plugin}' is misconfigured: {reason}")]
    Plugin { plugin: String, reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// The interaction surface could not produce an answer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InteractionError {
    /// The user ended the session (Ctrl-C, EOF)
    #[error("interaction aborted by user")]
    Aborted,

    /// No answer can be obtained (non-interactive run, exhausted script, broken terminal)
    #[error("interaction unavailable: {0}")]
    Unavailable(String),
}

/// Batch-level failure; everything else is folded into per-request results
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("batch aborted: {0}")]
    Aborted(InteractionError),
}
