// Integration tests for request validation and the tool registry
//
// Covers the wire shape of requests, registry validation errors and the tool
// definitions handed to the model.

use serde_json::{json, Value};

use toolgate::errors::{RegistryError, ValidationError};
use toolgate::tools::registry::ToolRegistry;
use toolgate::tools::types::{ToolKind, ToolRequest};
use toolgate::Config;

fn full_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::with_builtin_tools(&Config::default());
    registry
        .register(toolgate::tools::implementations::tree::spec())
        .unwrap();
    registry
}

// ── Wire shape ───────────────────────────────────────────────────────────────

#[test]
fn test_declared_fields_survive_parsing() {
    let payloads = [
        json!({"title": "read", "comment": "look", "path": "/tmp/a", "metadata_only": true}),
        json!({"title": "write", "comment": "save", "path": "/tmp/a", "is_directory": false, "content": "hi"}),
        json!({"title": "move", "comment": "mv", "source_path": "/tmp/a", "destination_path": "/tmp/b"}),
        json!({"title": "command", "comment": "run", "command": "ls -la", "timeout": 2.5}),
        json!({"title": "tree", "comment": "walk", "path": "/tmp", "max_depth": 2, "show_hidden": true}),
    ];
    let registry = full_registry();
    for payload in payloads {
        let request = registry.validate(&payload).unwrap();
        assert_eq!(request.to_value(), payload);
    }
}

#[test]
fn test_defaults_are_filled_in() {
    let request = ToolRequest::from_value(&json!({"title": "tree", "comment": "t", "path": "."})).unwrap();
    match request {
        ToolRequest::Tree(t) => {
            assert_eq!(t.max_depth, 3);
            assert!(!t.show_hidden);
        }
        other => panic!("expected tree, got {:?}", other),
    }
}

#[test]
fn test_comment_is_trimmed() {
    let request =
        ToolRequest::from_value(&json!({"title": "delete", "comment": "  tidy up \n", "path": "/tmp/x"}))
            .unwrap();
    assert_eq!(request.comment(), "tidy up");
    assert_eq!(request.kind(), ToolKind::Delete);
}

// ── Validation errors ────────────────────────────────────────────────────────

#[test]
fn test_validation_errors() {
    let registry = full_registry();
    let cases: Vec<(Value, fn(&ValidationError) -> bool)> = vec![
        (json!([1, 2]), |e| matches!(e, ValidationError::NotAnObject)),
        (json!({"comment": "x"}), |e| matches!(e, ValidationError::MissingTitle)),
        (json!({"title": "scrape", "comment": "x"}), |e| {
            matches!(e, ValidationError::UnknownType(t) if t == "scrape")
        }),
        (json!({"title": "read", "comment": "x"}), |e| {
            matches!(e, ValidationError::Malformed { .. })
        }),
        (json!({"title": "command", "comment": "x", "command": "   "}), |e| {
            matches!(e, ValidationError::EmptyField { field: "command", .. })
        }),
        (json!({"title": "tree", "comment": "x", "path": "/", "max_depth": 11}), |e| {
            matches!(e, ValidationError::OutOfRange { value: 11, .. })
        }),
    ];

    for (payload, check) in cases {
        let err = registry.validate(&payload).unwrap_err();
        assert!(check(&err), "unexpected error for {}: {:?}", payload, err);
    }
}

#[test]
fn test_unregistered_kind_is_unknown() {
    let registry = ToolRegistry::with_builtin_tools(&Config::default());
    let err = registry
        .validate(&json!({"title": "tree", "comment": "x", "path": "/"}))
        .unwrap_err();
    assert_eq!(err, ValidationError::UnknownType("tree".to_string()));
}

// ── Registration ─────────────────────────────────────────────────────────────

#[test]
fn test_duplicate_kind_is_rejected() {
    let mut registry = full_registry();
    let err = registry
        .register(toolgate::tools::implementations::tree::spec())
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateType("tree".to_string()));
    assert_eq!(registry.len(), 7);
}

#[test]
fn test_definitions_follow_registration_order() {
    let registry = full_registry();
    let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
    assert_eq!(
        names,
        vec!["read", "write", "move", "copy", "delete", "command", "tree"]
    );

    let value = serde_json::to_value(registry.definitions()).unwrap();
    let read = &value[0];
    assert_eq!(read["input_schema"]["type"], "object");
    assert!(read["input_schema"]["required"]
        .as_array()
        .unwrap()
        .contains(&json!("path")));
}
