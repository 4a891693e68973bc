// Tool type registry
//
// Maps request discriminators to their schema and description. Populated once
// at startup (built-ins, then plugins) and read-only afterwards.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::config::Config;
use crate::errors::{RegistryError, ValidationError};
use crate::tools::implementations;
use crate::tools::types::{ObjectSchema, ToolDefinition, ToolKind, ToolRequest};

/// Everything the registry knows about one request kind
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub description: String,
    pub input_schema: ObjectSchema,
    pub result_schema: ObjectSchema,
}

impl ToolSpec {
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.kind.to_string(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// One line of `--list-tools`
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub definition: ToolDefinition,
    pub result_schema: ObjectSchema,
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    kinds: HashSet<ToolKind>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the core kinds; `command` is left out when commands are disabled
    pub fn with_builtin_tools(config: &Config) -> Self {
        let mut registry = Self::new();
        let mut specs = vec![
            implementations::read::spec(),
            implementations::write::spec(),
            implementations::transfer::move_spec(),
            implementations::transfer::copy_spec(),
            implementations::delete::spec(),
        ];
        if !config.no_commands {
            specs.push(implementations::command::spec());
        }
        for spec in specs {
            let registered = registry.register(spec);
            debug_assert!(registered.is_ok(), "built-in kinds clash: {:?}", registered);
        }
        registry
    }

    pub fn register(&mut self, spec: ToolSpec) -> Result<(), RegistryError> {
        if self.kinds.contains(&spec.kind) {
            return Err(RegistryError::DuplicateType(spec.kind.to_string()));
        }
        debug!("Registered tool type: {}", spec.kind);
        self.kinds.insert(spec.kind);
        self.specs.push(spec);
        Ok(())
    }

    pub fn contains(&self, kind: ToolKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Parse and check a raw payload; kinds that exist but are not registered are unknown
    pub fn validate(&self, raw: &Value) -> Result<ToolRequest, ValidationError> {
        let request = ToolRequest::from_value(raw)?;
        if !self.contains(request.kind()) {
            return Err(ValidationError::UnknownType(request.kind().to_string()));
        }
        Ok(request)
    }

    /// Tool definitions for the model's system prompt
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.specs.iter().map(ToolSpec::definition).collect()
    }

    /// Definitions together with the shape of each kind's result
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.specs
            .iter()
            .map(|spec| CatalogEntry {
                definition: spec.definition(),
                result_schema: spec.result_schema.clone(),
            })
            .collect()
    }
}
