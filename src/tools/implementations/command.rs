// Command tool - runs a shell command and captures its output
//
// Commands run under `sh -c` with a timeout. The child is killed if the
// timeout fires or the caller drops the future. A timeout of zero or less
// launches the command detached and returns immediately without output.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::Execution;
use crate::errors::ExecutionError;
use crate::tools::output::truncate_output;
use crate::tools::registry::ToolSpec;
use crate::tools::results::{CommandOutcome, ResultPayload};
use crate::tools::types::{CommandRequest, ObjectSchema, ToolKind};

/// Output caps and the fallback timeout
#[derive(Debug, Clone, Copy)]
pub struct CommandLimits {
    pub timeout_secs: f64,
    pub max_output_lines: usize,
    pub max_output_size: usize,
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        kind: ToolKind::Command,
        description: "Run a shell command (sh -c) and return its stdout, stderr and exit code. \
                      Use timeout <= 0 to start a long-running program in the background."
            .to_string(),
        input_schema: ObjectSchema::fields(&[
            ("command", "string", "The shell command to run", true),
            (
                "timeout",
                "number",
                "Seconds before the command is killed; <= 0 runs it detached",
                false,
            ),
        ]),
        result_schema: ObjectSchema::result(&[
            ("success", "boolean"),
            ("stdout", "string"),
            ("stderr", "string"),
            ("exit_code", "integer"),
            ("truncated", "boolean"),
        ]),
    }
}

pub async fn execute(request: &CommandRequest, limits: &CommandLimits) -> Execution {
    let timeout = request.timeout.unwrap_or(limits.timeout_secs);
    if timeout <= 0.0 {
        return spawn_detached(&request.command);
    }
    let Ok(limit) = Duration::try_from_secs_f64(timeout) else {
        return (
            ResultPayload::Command(CommandOutcome::not_run()),
            Some(ExecutionError::InvalidTimeout { secs: timeout }),
        );
    };

    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(&request.command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return (
                ResultPayload::Command(CommandOutcome::not_run()),
                Some(ExecutionError::io("failed to spawn sh", &e)),
            )
        }
    };

    // Dropping the wait future on timeout drops the child, which kills it
    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return (
                ResultPayload::Command(CommandOutcome::not_run()),
                Some(ExecutionError::io("failed to collect command output", &e)),
            )
        }
        Err(_) => {
            warn!("Command timed out after {}s: {}", timeout, request.command);
            return (
                ResultPayload::Command(CommandOutcome::not_run()),
                Some(ExecutionError::Timeout { secs: timeout }),
            );
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let (stdout, stdout_cut) =
        truncate_output(&stdout, limits.max_output_lines, limits.max_output_size);
    let (stderr, stderr_cut) =
        truncate_output(&stderr, limits.max_output_lines, limits.max_output_size);

    let exit_code = output.status.code();
    debug!(?exit_code, "command finished");

    let error = match exit_code {
        Some(0) => None,
        Some(code) => Some(ExecutionError::NonZeroExit { code }),
        None => Some(ExecutionError::Terminated),
    };

    let outcome = CommandOutcome {
        success: output.status.success(),
        stdout: Some(stdout),
        stderr: Some(stderr),
        exit_code,
        truncated: stdout_cut || stderr_cut,
    };
    (ResultPayload::Command(outcome), error)
}

fn spawn_detached(command_line: &str) -> Execution {
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // Own process group so terminal signals aimed at us do not reach it
    #[cfg(unix)]
    command.process_group(0);

    match command.spawn() {
        Ok(child) => {
            info!(pid = ?child.id(), "Started detached command: {}", command_line);
            let outcome = CommandOutcome {
                success: true,
                ..CommandOutcome::not_run()
            };
            (ResultPayload::Command(outcome), None)
        }
        Err(e) => (
            ResultPayload::Command(CommandOutcome::not_run()),
            Some(ExecutionError::io("failed to spawn sh", &e)),
        ),
    }
}
