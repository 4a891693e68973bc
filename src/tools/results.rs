// Tool results returned to the model
//
// A result mirrors its request's fields and adds `accepted`, `error` and a
// kind-specific payload. Denied and failed requests still produce a result.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{ExecutionError, HookRejection, ValidationError};
use crate::tools::permissions::ConsentDecision;
use crate::tools::types::ToolRequest;

/// Placeholder sent instead of output the user chose not to share
pub const HIDDEN: &str = "<hidden>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Text,
    Base64,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub modified: String,
}

/// Fixed metadata key set for files and directories
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub path: String,
    pub size: u64,
    pub modified: String,
    pub is_directory: bool,
    pub owner: String,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<Vec<DirEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadOutcome {
    pub absolute_path: String,
    pub metadata: Option<Metadata>,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<ContentEncoding>,
}

/// Write and delete outcome: state before and after the mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub absolute_path: String,
    pub previous_metadata: Option<Metadata>,
    pub metadata: Option<Metadata>,
}

/// Move and copy outcome: source state before, destination state after
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferOutcome {
    pub absolute_source_path: String,
    pub absolute_destination_path: String,
    pub previous_metadata: Option<Metadata>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
    pub truncated: bool,
}

impl CommandOutcome {
    pub fn not_run() -> Self {
        Self {
            success: false,
            stdout: None,
            stderr: None,
            exit_code: None,
            truncated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeOutcome {
    pub absolute_path: String,
    pub tree_output: String,
    pub total_files: usize,
    pub total_dirs: usize,
    pub max_depth_reached: bool,
}

/// Kind-specific result fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultPayload {
    Read(ReadOutcome),
    File(FileOutcome),
    Transfer(TransferOutcome),
    Command(CommandOutcome),
    Tree(TreeOutcome),
}

impl ResultPayload {
    pub fn as_read(&self) -> Option<&ReadOutcome> {
        match self {
            ResultPayload::Read(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_command(&self) -> Option<&CommandOutcome> {
        match self {
            ResultPayload::Command(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_command_mut(&mut self) -> Option<&mut CommandOutcome> {
        match self {
            ResultPayload::Command(c) => Some(c),
            _ => None,
        }
    }

    /// Apply `rewrite` to every path string in the payload, metadata included
    pub fn rewrite_paths(&mut self, rewrite: &dyn Fn(&str) -> Option<String>) {
        fn apply(value: &mut String, rewrite: &dyn Fn(&str) -> Option<String>) {
            if let Some(new_value) = rewrite(value) {
                *value = new_value;
            }
        }
        fn apply_meta(meta: &mut Option<Metadata>, rewrite: &dyn Fn(&str) -> Option<String>) {
            if let Some(meta) = meta {
                apply(&mut meta.path, rewrite);
            }
        }

        match self {
            ResultPayload::Read(r) => {
                apply(&mut r.absolute_path, rewrite);
                apply_meta(&mut r.metadata, rewrite);
            }
            ResultPayload::File(f) => {
                apply(&mut f.absolute_path, rewrite);
                apply_meta(&mut f.previous_metadata, rewrite);
                apply_meta(&mut f.metadata, rewrite);
            }
            ResultPayload::Transfer(t) => {
                apply(&mut t.absolute_source_path, rewrite);
                apply(&mut t.absolute_destination_path, rewrite);
                apply_meta(&mut t.previous_metadata, rewrite);
                apply_meta(&mut t.metadata, rewrite);
            }
            ResultPayload::Tree(t) => apply(&mut t.absolute_path, rewrite),
            ResultPayload::Command(_) => {}
        }
    }
}

/// Result of one pipeline pass over one request
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Discriminator as received, kept even when validation failed
    pub title: String,
    /// The request this result answers (read-only, for correlation)
    pub request: Option<ToolRequest>,
    /// Consent outcome, `None` when the request never reached the resolver
    pub decision: Option<ConsentDecision>,
    pub accepted: bool,
    pub error: Option<String>,
    pub payload: Option<ResultPayload>,
}

impl ToolResult {
    /// The payload never parsed into a request
    pub fn invalid(raw: &Value, error: &ValidationError) -> Self {
        let title = raw
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        Self {
            title,
            request: None,
            decision: None,
            accepted: false,
            error: Some(error.to_string()),
            payload: None,
        }
    }

    /// Consent was refused; the request never executed
    pub fn denied(request: &ToolRequest, decision: ConsentDecision) -> Self {
        let reason = match &decision {
            ConsentDecision::Denied { reason } => reason.clone(),
            _ => "request was not approved".to_string(),
        };
        Self {
            title: request.kind().to_string(),
            request: Some(request.clone()),
            decision: Some(decision),
            accepted: false,
            error: Some(reason),
            payload: None,
        }
    }

    /// A before-hook vetoed the request
    pub fn rejected(
        request: &ToolRequest,
        decision: ConsentDecision,
        rejection: &HookRejection,
    ) -> Self {
        Self {
            title: request.kind().to_string(),
            request: Some(request.clone()),
            decision: Some(decision),
            accepted: false,
            error: Some(rejection.to_string()),
            payload: None,
        }
    }

    /// The request executed; `error` decides whether it counts as accepted
    pub fn executed(
        request: &ToolRequest,
        decision: ConsentDecision,
        payload: ResultPayload,
        error: Option<ExecutionError>,
    ) -> Self {
        Self {
            title: request.kind().to_string(),
            request: Some(request.clone()),
            decision: Some(decision),
            accepted: error.is_none(),
            error: error.map(|e| e.to_string()),
            payload: Some(payload),
        }
    }

    /// Wire shape: request fields, then `accepted`/`error`, then payload fields
    pub fn to_value(&self) -> Value {
        let mut map = match self.request.as_ref().map(ToolRequest::to_value) {
            Some(Value::Object(map)) => map,
            _ => {
                let mut map = Map::new();
                map.insert("title".to_string(), Value::String(self.title.clone()));
                map
            }
        };

        map.insert("accepted".to_string(), Value::Bool(self.accepted));
        map.insert(
            "error".to_string(),
            self.error.clone().map(Value::String).unwrap_or(Value::Null),
        );

        if let Some(payload) = &self.payload {
            if let Ok(Value::Object(fields)) = serde_json::to_value(payload) {
                for (key, value) in fields {
                    map.insert(key, value);
                }
            }
        }

        Value::Object(map)
    }
}

impl Serialize for ToolResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::{CommandRequest, ReadRequest};
    use serde_json::json;

    fn read_request() -> ToolRequest {
        ToolRequest::Read(ReadRequest {
            comment: "check script".to_string(),
            path: "~/run.sh".to_string(),
            metadata_only: false,
        })
    }

    fn metadata(path: &str) -> Metadata {
        Metadata {
            path: path.to_string(),
            size: 12,
            modified: "2024-01-01T00:00:00+00:00".to_string(),
            is_directory: false,
            owner: "user".to_string(),
            group: "users".to_string(),
            listing: None,
        }
    }

    #[test]
    fn test_invalid_result_keeps_title() {
        let raw = json!({"title": "scrape", "comment": "web"});
        let result = ToolResult::invalid(&raw, &ValidationError::UnknownType("scrape".into()));
        let value = result.to_value();
        assert_eq!(value["title"], "scrape");
        assert_eq!(value["accepted"], false);
        assert!(value["error"].as_str().unwrap().contains("scrape"));
    }

    #[test]
    fn test_denied_result_has_reason() {
        let result = ToolResult::denied(
            &read_request(),
            ConsentDecision::Denied {
                reason: "user declined".to_string(),
            },
        );
        assert!(!result.accepted);
        assert_eq!(result.error.as_deref(), Some("user declined"));
        assert!(result.payload.is_none());
    }

    #[test]
    fn test_metadata_only_read_serializes_null_content() {
        let payload = ResultPayload::Read(ReadOutcome {
            absolute_path: "/home/user/run.sh".to_string(),
            metadata: Some(metadata("/home/user/run.sh")),
            content: None,
            encoding: None,
        });
        let result = ToolResult::executed(
            &read_request(),
            ConsentDecision::ApprovedMetadataOnly,
            payload,
            None,
        );

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["title"], "read");
        assert_eq!(value["path"], "~/run.sh");
        assert_eq!(value["accepted"], true);
        assert_eq!(value["error"], Value::Null);
        assert_eq!(value["content"], Value::Null);
        assert_eq!(value["metadata"]["owner"], "user");
        assert!(value.get("encoding").is_none());
    }

    #[test]
    fn test_execution_error_marks_not_accepted() {
        let request = ToolRequest::Command(CommandRequest {
            comment: "fail".to_string(),
            command: "false".to_string(),
            timeout: None,
        });
        let payload = ResultPayload::Command(CommandOutcome {
            success: false,
            stdout: Some(String::new()),
            stderr: Some(String::new()),
            exit_code: Some(1),
            truncated: false,
        });
        let result = ToolResult::executed(
            &request,
            ConsentDecision::ApprovedFull,
            payload,
            Some(ExecutionError::NonZeroExit { code: 1 }),
        );
        assert!(!result.accepted);
        let value = result.to_value();
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["command"], "false");
        assert!(value["error"].as_str().unwrap().contains("status 1"));
    }

    #[test]
    fn test_rewrite_paths_touches_metadata() {
        let mut payload = ResultPayload::File(FileOutcome {
            absolute_path: "/home/user/a".to_string(),
            previous_metadata: None,
            metadata: Some(metadata("/home/user/a")),
        });
        payload.rewrite_paths(&|p: &str| p.strip_prefix("/home/user").map(|rest| format!("~{}", rest)));

        match payload {
            ResultPayload::File(f) => {
                assert_eq!(f.absolute_path, "~/a");
                assert_eq!(f.metadata.unwrap().path, "~/a");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
