// Core types for tool requests
//
// A request arrives from the model as a JSON object tagged by `title`.
// The set of request kinds is closed; plugins enable extra kinds through
// the registry rather than by defining new types at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::ValidationError;

pub const DEFAULT_TREE_DEPTH: u32 = 3;
pub const MAX_TREE_DEPTH: u32 = 10;

/// Longest timeout a command may ask for (one day)
pub const MAX_COMMAND_TIMEOUT_SECS: f64 = 86_400.0;

/// Finite and at most `MAX_COMMAND_TIMEOUT_SECS`; `<= 0` is allowed (detached)
pub fn timeout_is_valid(secs: f64) -> bool {
    secs.is_finite() && secs <= MAX_COMMAND_TIMEOUT_SECS
}

/// Discriminator for every request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Read,
    Write,
    Move,
    Copy,
    Delete,
    Command,
    Tree,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Read,
        ToolKind::Write,
        ToolKind::Move,
        ToolKind::Copy,
        ToolKind::Delete,
        ToolKind::Command,
        ToolKind::Tree,
    ];

    /// The discriminator string used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Read => "read",
            ToolKind::Write => "write",
            ToolKind::Move => "move",
            ToolKind::Copy => "copy",
            ToolKind::Delete => "delete",
            ToolKind::Command => "command",
            ToolKind::Tree => "tree",
        }
    }

    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == title)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub comment: String,
    pub path: String,
    #[serde(default)]
    pub metadata_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub comment: String,
    pub path: String,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Shared shape of move and copy requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub comment: String,
    pub source_path: String,
    pub destination_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub comment: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub comment: String,
    pub command: String,
    /// Seconds; `<= 0` launches a detached process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRequest {
    pub comment: String,
    pub path: String,
    #[serde(default = "default_tree_depth")]
    pub max_depth: u32,
    #[serde(default)]
    pub show_hidden: bool,
}

fn default_tree_depth() -> u32 {
    DEFAULT_TREE_DEPTH
}

/// A typed, validated action request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "title", rename_all = "lowercase")]
pub enum ToolRequest {
    Read(ReadRequest),
    Write(WriteRequest),
    Move(TransferRequest),
    Copy(TransferRequest),
    Delete(DeleteRequest),
    Command(CommandRequest),
    Tree(TreeRequest),
}

impl ToolRequest {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolRequest::Read(_) => ToolKind::Read,
            ToolRequest::Write(_) => ToolKind::Write,
            ToolRequest::Move(_) => ToolKind::Move,
            ToolRequest::Copy(_) => ToolKind::Copy,
            ToolRequest::Delete(_) => ToolKind::Delete,
            ToolRequest::Command(_) => ToolKind::Command,
            ToolRequest::Tree(_) => ToolKind::Tree,
        }
    }

    pub fn comment(&self) -> &str {
        match self {
            ToolRequest::Read(r) => &r.comment,
            ToolRequest::Write(r) => &r.comment,
            ToolRequest::Move(r) | ToolRequest::Copy(r) => &r.comment,
            ToolRequest::Delete(r) => &r.comment,
            ToolRequest::Command(r) => &r.comment,
            ToolRequest::Tree(r) => &r.comment,
        }
    }

    fn comment_mut(&mut self) -> &mut String {
        match self {
            ToolRequest::Read(r) => &mut r.comment,
            ToolRequest::Write(r) => &mut r.comment,
            ToolRequest::Move(r) | ToolRequest::Copy(r) => &mut r.comment,
            ToolRequest::Delete(r) => &mut r.comment,
            ToolRequest::Command(r) => &mut r.comment,
            ToolRequest::Tree(r) => &mut r.comment,
        }
    }

    /// Paths this request touches, as the model typed them
    pub fn paths(&self) -> Vec<&str> {
        match self {
            ToolRequest::Read(r) => vec![r.path.as_str()],
            ToolRequest::Write(r) => vec![r.path.as_str()],
            ToolRequest::Move(r) | ToolRequest::Copy(r) => {
                vec![r.source_path.as_str(), r.destination_path.as_str()]
            }
            ToolRequest::Delete(r) => vec![r.path.as_str()],
            ToolRequest::Tree(r) => vec![r.path.as_str()],
            ToolRequest::Command(_) => Vec::new(),
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            ToolRequest::Command(r) => Some(&r.command),
            _ => None,
        }
    }

    /// Parse a raw payload without consulting the registry
    pub fn from_value(raw: &Value) -> Result<Self, ValidationError> {
        let title = raw
            .as_object()
            .ok_or(ValidationError::NotAnObject)?
            .get("title")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingTitle)?
            .to_string();

        if ToolKind::from_title(&title).is_none() {
            return Err(ValidationError::UnknownType(title));
        }

        let request: ToolRequest =
            serde_json::from_value(raw.clone()).map_err(|e| ValidationError::Malformed {
                title: title.clone(),
                reason: e.to_string(),
            })?;

        request.normalized()
    }

    /// Serialize back into the wire shape
    pub fn to_value(&self) -> Value {
        // Plain structs of strings, bools and numbers always serialize
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Trim free text and enforce field-level rules serde cannot express
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        let trimmed = self.comment().trim().to_string();
        *self.comment_mut() = trimmed;

        let title = self.kind().as_str().to_string();
        let empty = |field: &'static str| ValidationError::EmptyField {
            title: title.clone(),
            field,
        };

        match &mut self {
            ToolRequest::Read(r) => non_empty(&r.path).ok_or_else(|| empty("path"))?,
            ToolRequest::Write(r) => non_empty(&r.path).ok_or_else(|| empty("path"))?,
            ToolRequest::Delete(r) => non_empty(&r.path).ok_or_else(|| empty("path"))?,
            ToolRequest::Move(r) | ToolRequest::Copy(r) => {
                non_empty(&r.source_path).ok_or_else(|| empty("source_path"))?;
                non_empty(&r.destination_path).ok_or_else(|| empty("destination_path"))?;
            }
            ToolRequest::Command(r) => {
                let command = r.command.trim().to_string();
                if command.is_empty() {
                    return Err(empty("command"));
                }
                r.command = command;
                if let Some(timeout) = r.timeout.filter(|t| !timeout_is_valid(*t)) {
                    return Err(ValidationError::InvalidTimeout {
                        title: title.clone(),
                        value: timeout,
                        max: MAX_COMMAND_TIMEOUT_SECS,
                    });
                }
            }
            ToolRequest::Tree(r) => {
                non_empty(&r.path).ok_or_else(|| empty("path"))?;
                if r.max_depth < 1 || r.max_depth > MAX_TREE_DEPTH {
                    return Err(ValidationError::OutOfRange {
                        title: title.clone(),
                        field: "max_depth",
                        min: 1,
                        max: MAX_TREE_DEPTH,
                        value: r.max_depth,
                    });
                }
            }
        }

        Ok(self)
    }

    /// Human-readable lines shown before asking for consent
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!("[ {} ] {}", self.kind(), self.comment())];
        match self {
            ToolRequest::Read(r) => {
                lines.push(format!("path: {}", r.path));
                if r.metadata_only {
                    lines.push("requesting: metadata".to_string());
                } else {
                    lines.push("requesting: content and metadata".to_string());
                }
            }
            ToolRequest::Write(r) => {
                let what = if r.is_directory { "directory" } else { "file" };
                lines.push(format!("path: {} ({})", r.path, what));
                if let Some(content) = &r.content {
                    lines.push(format!("content: {} bytes", content.len()));
                }
            }
            ToolRequest::Move(r) | ToolRequest::Copy(r) => {
                lines.push(format!("source: {}", r.source_path));
                lines.push(format!("destination: {}", r.destination_path));
            }
            ToolRequest::Delete(r) => lines.push(format!("path: {}", r.path)),
            ToolRequest::Command(r) => {
                lines.push(format!("command: {}", r.command));
                match r.timeout {
                    Some(t) if t <= 0.0 => lines.push("timeout: none (detached)".to_string()),
                    Some(t) => lines.push(format!("timeout: {}s", t)),
                    None => {}
                }
            }
            ToolRequest::Tree(r) => {
                lines.push(format!("path: {}", r.path));
                lines.push(format!("max depth: {}", r.max_depth));
            }
        }
        lines
    }
}

fn non_empty(value: &str) -> Option<()> {
    if value.trim().is_empty() {
        None
    } else {
        Some(())
    }
}

/// Tool definition offered to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ObjectSchema,
}

/// JSON Schema for an object (request input or result payload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    pub schema_type: String, // Always "object"
    pub properties: Value,
    pub required: Vec<String>,
}

impl ObjectSchema {
    /// Build a schema from (name, json type, description, required) tuples.
    /// `comment` is always present and required.
    pub fn fields(params: &[(&str, &str, &str, bool)]) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = vec!["comment".to_string()];

        properties.insert(
            "comment".to_string(),
            serde_json::json!({
                "type": "string",
                "description": "Why this action is needed"
            }),
        );

        for (name, json_type, description, is_required) in params {
            properties.insert(
                name.to_string(),
                serde_json::json!({
                    "type": json_type,
                    "description": description
                }),
            );
            if *is_required {
                required.push(name.to_string());
            }
        }

        Self {
            schema_type: "object".to_string(),
            properties: Value::Object(properties),
            required,
        }
    }

    /// Result schema: plain property list, nothing required beyond the shared fields
    pub fn result(params: &[(&str, &str)]) -> Self {
        let mut properties = serde_json::Map::new();
        properties.insert("accepted".to_string(), serde_json::json!({"type": "boolean"}));
        properties.insert(
            "error".to_string(),
            serde_json::json!({"type": ["string", "null"]}),
        );
        for (name, json_type) in params {
            properties.insert(name.to_string(), serde_json::json!({ "type": json_type }));
        }

        Self {
            schema_type: "object".to_string(),
            properties: Value::Object(properties),
            required: vec!["accepted".to_string(), "error".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_titles_are_unique() {
        let titles: std::collections::HashSet<_> =
            ToolKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(titles.len(), ToolKind::ALL.len());
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_title(kind.as_str()), Some(kind));
        }
        assert_eq!(ToolKind::from_title("scrape"), None);
    }

    #[test]
    fn test_parse_command_request() {
        let request = ToolRequest::from_value(&json!({
            "title": "command",
            "comment": "  list files  ",
            "command": " ls -la "
        }))
        .unwrap();

        assert_eq!(request.kind(), ToolKind::Command);
        assert_eq!(request.comment(), "list files");
        assert_eq!(request.command(), Some("ls -la"));
    }

    #[test]
    fn test_read_defaults_to_full_read() {
        let request = ToolRequest::from_value(&json!({
            "title": "read",
            "comment": "look",
            "path": "~/run.sh"
        }))
        .unwrap();
        match request {
            ToolRequest::Read(r) => assert!(!r.metadata_only),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = ToolRequest::from_value(&json!({
            "title": "move",
            "comment": "shuffle",
            "source_path": "/tmp/a"
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { ref title, .. } if title == "move"));
    }

    #[test]
    fn test_unknown_title_and_missing_title() {
        assert_eq!(
            ToolRequest::from_value(&json!({"title": "scrape", "comment": "x"})).unwrap_err(),
            ValidationError::UnknownType("scrape".to_string())
        );
        assert_eq!(
            ToolRequest::from_value(&json!({"comment": "x"})).unwrap_err(),
            ValidationError::MissingTitle
        );
        assert_eq!(
            ToolRequest::from_value(&json!(["read"])).unwrap_err(),
            ValidationError::NotAnObject
        );
    }

    #[test]
    fn test_empty_fields_rejected() {
        let err = ToolRequest::from_value(&json!({
            "title": "command",
            "comment": "nothing",
            "command": "   "
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField { field: "command", .. }));

        let err = ToolRequest::from_value(&json!({
            "title": "delete",
            "comment": "nothing",
            "path": ""
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField { field: "path", .. }));
    }

    #[test]
    fn test_tree_depth_bounds() {
        let err = ToolRequest::from_value(&json!({
            "title": "tree",
            "comment": "deep",
            "path": "/tmp",
            "max_depth": 11
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { value: 11, .. }));

        let ok = ToolRequest::from_value(&json!({
            "title": "tree",
            "comment": "default depth",
            "path": "/tmp"
        }))
        .unwrap();
        match ok {
            ToolRequest::Tree(t) => assert_eq!(t.max_depth, DEFAULT_TREE_DEPTH),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_command_timeout_bounds() {
        let parse = |timeout: f64| {
            ToolRequest::from_value(&json!({
                "title": "command",
                "comment": "wait",
                "command": "sleep 1",
                "timeout": timeout
            }))
        };
        assert!(matches!(
            parse(1e20).unwrap_err(),
            ValidationError::InvalidTimeout { .. }
        ));
        assert!(parse(MAX_COMMAND_TIMEOUT_SECS).is_ok());
        assert!(parse(-1.0).is_ok());
        assert!(!timeout_is_valid(f64::INFINITY));
        assert!(!timeout_is_valid(f64::NAN));
    }

    #[test]
    fn test_paths_for_transfer() {
        let request = ToolRequest::Copy(TransferRequest {
            comment: "dup".to_string(),
            source_path: "/a".to_string(),
            destination_path: "/b".to_string(),
        });
        assert_eq!(request.paths(), vec!["/a", "/b"]);
        assert!(request.command().is_none());
    }

    #[test]
    fn test_describe_mentions_command() {
        let request = ToolRequest::Command(CommandRequest {
            comment: "spawn".to_string(),
            command: "xclock".to_string(),
            timeout: Some(0.0),
        });
        let lines = request.describe();
        assert!(lines[0].contains("[ command ]"));
        assert!(lines.iter().any(|l| l.contains("xclock")));
        assert!(lines.iter().any(|l| l.contains("detached")));
    }

    #[test]
    fn test_object_schema_fields() {
        let schema = ObjectSchema::fields(&[
            ("path", "string", "Path to read", true),
            ("metadata_only", "boolean", "Only metadata", false),
        ]);
        assert_eq!(schema.schema_type, "object");
        assert_eq!(schema.required, vec!["comment", "path"]);
        assert!(schema.properties.get("metadata_only").is_some());
        assert!(schema.properties.get("comment").is_some());
    }
}
