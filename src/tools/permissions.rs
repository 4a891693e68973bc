// Consent resolution for tool requests
//
// Each request walks a small state machine: auto-approval short-circuits,
// otherwise the user is asked through the interaction surface. Reads get a
// richer menu (send, inspect first, metadata only, skip).

use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::errors::{ExecutionError, InteractionError};
use crate::interface::Interface;
use crate::tools::filesystem;
use crate::tools::output::truncate_output;
use crate::tools::results::{ContentEncoding, ToolResult, HIDDEN};
use crate::tools::types::{ReadRequest, ToolKind, ToolRequest};

const READ_CHOICES: [&str; 4] = [
    "Send content and metadata",
    "Inspect content first",
    "Send metadata only",
    "Skip",
];

/// Outcome of consent resolution for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentDecision {
    /// Matched an auto-approval rule; no prompt was shown
    AutoApproved,

    /// The user approved the full operation
    ApprovedFull,

    /// The user allowed metadata but not file content
    ApprovedMetadataOnly,

    /// Policy or the user declined
    Denied { reason: String },
}

impl ConsentDecision {
    pub fn denied(reason: impl Into<String>) -> Self {
        ConsentDecision::Denied {
            reason: reason.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        !matches!(self, ConsentDecision::Denied { .. })
    }

    /// Whether file content may be returned
    pub fn allows_content(&self) -> bool {
        matches!(
            self,
            ConsentDecision::AutoApproved | ConsentDecision::ApprovedFull
        )
    }
}

/// Resolver state; `Resolved` is terminal
#[derive(Debug, Clone, PartialEq)]
pub enum ConsentState {
    Start,
    PendingManualConsent,
    PendingSecondaryConfirmation,
    Resolved(ConsentDecision),
}

/// Policy switches that affect consent
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsentPolicy {
    pub no_commands: bool,
    pub auto_send: bool,
    /// Caps for content shown to the user (0 = unlimited)
    pub max_display_lines: usize,
    pub max_display_chars: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConsentResolver {
    policy: ConsentPolicy,
}

impl ConsentResolver {
    pub fn new(policy: ConsentPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ConsentPolicy {
            no_commands: config.no_commands,
            auto_send: config.auto_send,
            max_display_lines: config.max_output_lines,
            max_display_chars: config.max_output_size,
        })
    }

    /// Drive the state machine to a decision. Never executes the operation.
    ///
    /// Only `InteractionError::Aborted` escapes; an unavailable surface
    /// resolves to `Denied`.
    #[instrument(skip(self, request, interface), fields(kind = %request.kind()))]
    pub async fn resolve(
        &self,
        request: &ToolRequest,
        auto_approved: bool,
        interface: &dyn Interface,
    ) -> Result<ConsentDecision, InteractionError> {
        let mut state = ConsentState::Start;
        loop {
            state = match state {
                ConsentState::Resolved(decision) => {
                    info!(?decision, "consent resolved");
                    return Ok(decision);
                }
                other => match self.step(other, request, auto_approved, interface).await {
                    Ok(next) => next,
                    Err(InteractionError::Unavailable(reason)) => {
                        warn!("Consent unavailable: {}", reason);
                        ConsentState::Resolved(ConsentDecision::denied(format!(
                            "consent could not be obtained: {}",
                            reason
                        )))
                    }
                    Err(e) => return Err(e),
                },
            };
        }
    }

    async fn step(
        &self,
        state: ConsentState,
        request: &ToolRequest,
        auto_approved: bool,
        interface: &dyn Interface,
    ) -> Result<ConsentState, InteractionError> {
        let next = match state {
            ConsentState::Start => {
                if request.kind() == ToolKind::Command && self.policy.no_commands {
                    ConsentState::Resolved(ConsentDecision::denied("commands are disabled"))
                } else if auto_approved {
                    ConsentState::Resolved(ConsentDecision::AutoApproved)
                } else if !interface.is_interactive() {
                    ConsentState::Resolved(ConsentDecision::denied(
                        "not auto-approved and no interactive user to ask",
                    ))
                } else {
                    ConsentState::PendingManualConsent
                }
            }
            ConsentState::PendingManualConsent => match request {
                ToolRequest::Read(read) => self.ask_read(read, interface).await?,
                other => {
                    let question = approval_question(other);
                    if interface.ask_yes_no(&question).await? {
                        ConsentState::Resolved(ConsentDecision::ApprovedFull)
                    } else {
                        ConsentState::Resolved(ConsentDecision::denied("user declined"))
                    }
                }
            },
            ConsentState::PendingSecondaryConfirmation => match request {
                ToolRequest::Read(read) => self.confirm_after_inspect(read, interface).await?,
                // Only reads have an inspect step
                _ => ConsentState::PendingManualConsent,
            },
            resolved @ ConsentState::Resolved(_) => resolved,
        };
        debug!(?next, "consent step");
        Ok(next)
    }

    async fn ask_read(
        &self,
        read: &ReadRequest,
        interface: &dyn Interface,
    ) -> Result<ConsentState, InteractionError> {
        let path = filesystem::absolute_path(&read.path);

        // Nothing to ask about
        if !filesystem::exists(&path) {
            let reason = ExecutionError::NotFound(path).to_string();
            return Ok(ConsentState::Resolved(ConsentDecision::denied(reason)));
        }

        if read.metadata_only || filesystem::is_dir(&path) {
            let question = format!("Allow sending metadata for {}?", path.display());
            return Ok(if interface.ask_yes_no(&question).await? {
                ConsentState::Resolved(ConsentDecision::ApprovedMetadataOnly)
            } else {
                ConsentState::Resolved(ConsentDecision::denied("user declined"))
            });
        }

        let question = format!("Allow reading {}?", path.display());
        let state = match interface.ask_choice(&question, &READ_CHOICES).await? {
            0 => ConsentState::Resolved(ConsentDecision::ApprovedFull),
            1 => ConsentState::PendingSecondaryConfirmation,
            2 => ConsentState::Resolved(ConsentDecision::ApprovedMetadataOnly),
            _ => ConsentState::Resolved(ConsentDecision::denied("user skipped the read")),
        };
        Ok(state)
    }

    async fn confirm_after_inspect(
        &self,
        read: &ReadRequest,
        interface: &dyn Interface,
    ) -> Result<ConsentState, InteractionError> {
        let path = filesystem::absolute_path(&read.path);
        if let Err(e) = self.preview_file(&path, interface) {
            interface.display_error(&e);
            return Ok(ConsentState::Resolved(ConsentDecision::denied(e)));
        }

        let state = if interface.ask_yes_no("Send this content?").await? {
            ConsentState::Resolved(ConsentDecision::ApprovedFull)
        } else {
            ConsentState::Resolved(ConsentDecision::denied("user declined after inspecting"))
        };
        Ok(state)
    }

    /// Show the user what goes back to the model. Output of a manually
    /// approved command is only sent if the user agrees (unless `auto_send`);
    /// on refusal stdout becomes `<hidden>` and stderr is dropped.
    pub async fn release_output(
        &self,
        decision: &ConsentDecision,
        mut result: ToolResult,
        interface: &dyn Interface,
    ) -> Result<ToolResult, InteractionError> {
        if let Some(read) = result.payload.as_ref().and_then(|p| p.as_read()) {
            // Manually approved content was either inspected or sent knowingly
            if *decision == ConsentDecision::AutoApproved {
                match (read.content.as_deref(), read.encoding) {
                    (Some(content), Some(ContentEncoding::Base64)) => {
                        interface.display_text(&format!(
                            "{} is binary ({} bytes base64 encoded)",
                            read.absolute_path,
                            content.len()
                        ))
                    }
                    (Some(content), _) => {
                        self.display_capped(&read.absolute_path, content, interface)
                    }
                    (None, _) => {}
                }
            }
            return Ok(result);
        }

        let Some(outcome) = result.payload.as_mut().and_then(|p| p.as_command_mut()) else {
            return Ok(result);
        };
        if outcome.stdout.is_none() && outcome.stderr.is_none() {
            return Ok(result);
        }

        if let Some(stdout) = outcome.stdout.as_deref().filter(|s| !s.is_empty()) {
            interface.display_block("stdout", stdout);
        }
        if let Some(stderr) = outcome.stderr.as_deref().filter(|s| !s.is_empty()) {
            interface.display_block("stderr", stderr);
        }

        if self.policy.auto_send || *decision != ConsentDecision::ApprovedFull {
            return Ok(result);
        }

        let send = match interface.ask_yes_no("Allow sending output?").await {
            Ok(send) => send,
            Err(InteractionError::Unavailable(reason)) => {
                warn!("Output release unavailable, hiding output: {}", reason);
                false
            }
            Err(e) => return Err(e),
        };

        if !send {
            outcome.stdout = Some(HIDDEN.to_string());
            outcome.stderr = None;
        }
        Ok(result)
    }

    fn display_capped(&self, title: &str, content: &str, interface: &dyn Interface) {
        let (shown, _) = truncate_output(
            content,
            self.policy.max_display_lines,
            self.policy.max_display_chars,
        );
        interface.display_block(title, &shown);
    }

    fn preview_file(&self, path: &Path, interface: &dyn Interface) -> Result<(), String> {
        let (content, encoding) = filesystem::read_file(path).map_err(|e| e.to_string())?;
        match encoding {
            ContentEncoding::Text => {
                self.display_capped(&path.display().to_string(), &content, interface)
            }
            ContentEncoding::Base64 => interface.display_text(&format!(
                "{} is binary ({} bytes base64 encoded)",
                path.display(),
                content.len()
            )),
        }
        Ok(())
    }
}

/// Yes/no question shown for non-read requests
fn approval_question(request: &ToolRequest) -> String {
    match request {
        ToolRequest::Write(w) => {
            let what = if w.is_directory { "directory" } else { "file" };
            format!(
                "Allow creating {} {}?",
                what,
                filesystem::absolute_path(&w.path).display()
            )
        }
        ToolRequest::Move(t) => format!(
            "Allow moving {} to {}?",
            filesystem::absolute_path(&t.source_path).display(),
            filesystem::absolute_path(&t.destination_path).display()
        ),
        ToolRequest::Copy(t) => format!(
            "Allow copying {} to {}?",
            filesystem::absolute_path(&t.source_path).display(),
            filesystem::absolute_path(&t.destination_path).display()
        ),
        ToolRequest::Delete(d) => format!(
            "Allow deleting {}?",
            filesystem::absolute_path(&d.path).display()
        ),
        ToolRequest::Command(c) => format!("Allow running `{}`?", c.command),
        ToolRequest::Tree(t) => format!(
            "Allow listing the tree under {}?",
            filesystem::absolute_path(&t.path).display()
        ),
        ToolRequest::Read(r) => format!(
            "Allow reading {}?",
            filesystem::absolute_path(&r.path).display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::ScriptedInterface;
    use crate::tools::results::{CommandOutcome, ResultPayload};
    use crate::tools::types::{CommandRequest, DeleteRequest};
    use tempfile::TempDir;

    fn read(path: &str, metadata_only: bool) -> ToolRequest {
        ToolRequest::Read(ReadRequest {
            comment: "look".to_string(),
            path: path.to_string(),
            metadata_only,
        })
    }

    fn command(cmd: &str) -> ToolRequest {
        ToolRequest::Command(CommandRequest {
            comment: "run".to_string(),
            command: cmd.to_string(),
            timeout: None,
        })
    }

    fn file_fixture() -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, "echo hi\n").unwrap();
        let path = path.display().to_string();
        (dir, path)
    }

    #[tokio::test]
    async fn test_auto_approved_never_prompts() {
        let iface = ScriptedInterface::new(Vec::<String>::new());
        let decision = ConsentResolver::default()
            .resolve(&command("ls"), true, &iface)
            .await
            .unwrap();
        assert_eq!(decision, ConsentDecision::AutoApproved);
        assert!(iface.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_no_commands_denies_even_auto_approved() {
        let resolver = ConsentResolver::new(ConsentPolicy {
            no_commands: true,
            ..Default::default()
        });
        let iface = ScriptedInterface::new(["y"]);
        let decision = resolver.resolve(&command("ls"), true, &iface).await.unwrap();
        assert!(!decision.is_approved());
        assert!(iface.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_non_interactive_denies() {
        let iface = ScriptedInterface::non_interactive();
        let decision = ConsentResolver::default()
            .resolve(&command("ls"), false, &iface)
            .await
            .unwrap();
        assert!(matches!(decision, ConsentDecision::Denied { .. }));
    }

    #[tokio::test]
    async fn test_yes_no_for_other_kinds() {
        let delete = ToolRequest::Delete(DeleteRequest {
            comment: "clean".to_string(),
            path: "/tmp/x".to_string(),
        });
        let iface = ScriptedInterface::new(["y", "n"]);
        let resolver = ConsentResolver::default();
        assert_eq!(
            resolver.resolve(&delete, false, &iface).await.unwrap(),
            ConsentDecision::ApprovedFull
        );
        assert!(!resolver
            .resolve(&delete, false, &iface)
            .await
            .unwrap()
            .is_approved());
        assert!(iface.prompts()[0].contains("deleting"));
    }

    #[tokio::test]
    async fn test_read_menu_choices() {
        let (_dir, path) = file_fixture();
        let resolver = ConsentResolver::default();
        let request = read(&path, false);

        let iface = ScriptedInterface::new(["1", "3", "4"]);
        assert_eq!(
            resolver.resolve(&request, false, &iface).await.unwrap(),
            ConsentDecision::ApprovedFull
        );
        assert_eq!(
            resolver.resolve(&request, false, &iface).await.unwrap(),
            ConsentDecision::ApprovedMetadataOnly
        );
        assert!(matches!(
            resolver.resolve(&request, false, &iface).await.unwrap(),
            ConsentDecision::Denied { .. }
        ));
    }

    #[tokio::test]
    async fn test_inspect_shows_content_then_confirms() {
        let (_dir, path) = file_fixture();
        let iface = ScriptedInterface::new(["inspect", "y"]);
        let decision = ConsentResolver::default()
            .resolve(&read(&path, false), false, &iface)
            .await
            .unwrap();
        assert_eq!(decision, ConsentDecision::ApprovedFull);
        assert!(iface.output().iter().any(|l| l.contains("echo hi")));
        assert_eq!(iface.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_inspect_preview_is_capped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.log");
        let content: String = (1..=50).map(|i| format!("entry {}\n", i)).collect();
        std::fs::write(&path, content).unwrap();

        let resolver = ConsentResolver::new(ConsentPolicy {
            max_display_lines: 4,
            ..Default::default()
        });
        let iface = ScriptedInterface::new(["inspect", "n"]);
        resolver
            .resolve(&read(&path.display().to_string(), false), false, &iface)
            .await
            .unwrap();

        let output = iface.output();
        assert!(output.iter().any(|l| l.contains("46 lines truncated")));
        assert!(!output.iter().any(|l| l == "entry 25"));
    }

    #[tokio::test]
    async fn test_missing_read_target_is_denied_without_prompt() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.txt").display().to_string();
        let iface = ScriptedInterface::new(["1"]);
        let decision = ConsentResolver::default()
            .resolve(&read(&missing, false), false, &iface)
            .await
            .unwrap();
        match decision {
            ConsentDecision::Denied { reason } => assert!(reason.contains("does not exist")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(iface.prompts().is_empty());
        assert_eq!(iface.remaining_answers(), 1);
    }

    #[tokio::test]
    async fn test_metadata_only_and_directory_reads_are_yes_no() {
        let (dir, path) = file_fixture();
        let resolver = ConsentResolver::default();
        let iface = ScriptedInterface::new(["y", "y"]);

        assert_eq!(
            resolver
                .resolve(&read(&path, true), false, &iface)
                .await
                .unwrap(),
            ConsentDecision::ApprovedMetadataOnly
        );
        let dir_path = dir.path().display().to_string();
        assert_eq!(
            resolver
                .resolve(&read(&dir_path, false), false, &iface)
                .await
                .unwrap(),
            ConsentDecision::ApprovedMetadataOnly
        );
    }

    #[tokio::test]
    async fn test_exhausted_script_denies_instead_of_failing() {
        let iface = ScriptedInterface::new(Vec::<String>::new());
        let decision = ConsentResolver::default()
            .resolve(&command("ls"), false, &iface)
            .await
            .unwrap();
        assert!(!decision.is_approved());
    }

    fn command_result(stdout: &str) -> ToolResult {
        ToolResult::executed(
            &command("echo secret"),
            ConsentDecision::ApprovedFull,
            ResultPayload::Command(CommandOutcome {
                success: true,
                stdout: Some(stdout.to_string()),
                stderr: Some("warn".to_string()),
                exit_code: Some(0),
                truncated: false,
            }),
            None,
        )
    }

    #[tokio::test]
    async fn test_release_output_hides_on_refusal() {
        let iface = ScriptedInterface::new(["n"]);
        let result = ConsentResolver::default()
            .release_output(&ConsentDecision::ApprovedFull, command_result("secret"), &iface)
            .await
            .unwrap();
        let outcome = result.payload.as_ref().unwrap().as_command().unwrap();
        assert_eq!(outcome.stdout.as_deref(), Some(HIDDEN));
        assert!(outcome.stderr.is_none());
        assert!(result.accepted);
    }

    #[tokio::test]
    async fn test_release_prompt_skipped_for_auto_send_and_auto_approved() {
        let iface = ScriptedInterface::new(Vec::<String>::new());
        let auto_send = ConsentResolver::new(ConsentPolicy {
            auto_send: true,
            ..Default::default()
        });
        let result = auto_send
            .release_output(&ConsentDecision::ApprovedFull, command_result("x"), &iface)
            .await
            .unwrap();
        assert_eq!(
            result.payload.unwrap().as_command().unwrap().stdout.as_deref(),
            Some("x")
        );

        let result = ConsentResolver::default()
            .release_output(&ConsentDecision::AutoApproved, command_result("y"), &iface)
            .await
            .unwrap();
        assert_eq!(
            result.payload.unwrap().as_command().unwrap().stdout.as_deref(),
            Some("y")
        );
        assert!(iface.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_auto_approved_output_is_shown_without_prompt() {
        let iface = ScriptedInterface::new(Vec::<String>::new());
        let result = ConsentResolver::default()
            .release_output(
                &ConsentDecision::AutoApproved,
                command_result("VISIBLE_MARKER"),
                &iface,
            )
            .await
            .unwrap();
        assert!(iface.output().iter().any(|l| l.contains("VISIBLE_MARKER")));
        assert!(iface.prompts().is_empty());
        assert_eq!(
            result.payload.unwrap().as_command().unwrap().stdout.as_deref(),
            Some("VISIBLE_MARKER")
        );
    }
}
