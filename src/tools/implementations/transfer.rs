// Move and copy tools
//
// Both refuse to replace an existing destination. Copies of directories are
// recursive; moves fall back to copy + delete across filesystems.

use tracing::debug;

use super::Execution;
use crate::tools::filesystem;
use crate::tools::registry::ToolSpec;
use crate::tools::results::{ResultPayload, TransferOutcome};
use crate::tools::types::{ObjectSchema, ToolKind, TransferRequest};

fn input_schema() -> ObjectSchema {
    ObjectSchema::fields(&[
        ("source_path", "string", "Existing file or directory", true),
        ("destination_path", "string", "Target path; must not exist yet", true),
    ])
}

fn result_schema() -> ObjectSchema {
    ObjectSchema::result(&[
        ("absolute_source_path", "string"),
        ("absolute_destination_path", "string"),
        ("previous_metadata", "object"),
        ("metadata", "object"),
    ])
}

pub fn move_spec() -> ToolSpec {
    ToolSpec {
        kind: ToolKind::Move,
        description: "Move or rename a file or directory.".to_string(),
        input_schema: input_schema(),
        result_schema: result_schema(),
    }
}

pub fn copy_spec() -> ToolSpec {
    ToolSpec {
        kind: ToolKind::Copy,
        description: "Copy a file, or a directory with everything in it.".to_string(),
        input_schema: input_schema(),
        result_schema: result_schema(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Move,
    Copy,
}

pub fn execute(request: &TransferRequest, mode: TransferMode, min_disk_space_left: u64) -> Execution {
    let source = filesystem::absolute_path(&request.source_path);
    let destination = filesystem::absolute_path(&request.destination_path);
    let mut outcome = TransferOutcome {
        absolute_source_path: source.display().to_string(),
        absolute_destination_path: destination.display().to_string(),
        previous_metadata: None,
        metadata: None,
    };

    match filesystem::read_metadata(&source, false) {
        Ok(metadata) => outcome.previous_metadata = Some(metadata),
        Err(e) => return (ResultPayload::Transfer(outcome), Some(e)),
    }

    let result = match mode {
        TransferMode::Copy => {
            let size = filesystem::disk_usage(&source);
            filesystem::ensure_space(&destination, size, min_disk_space_left)
                .and_then(|_| filesystem::copy_path(&source, &destination))
        }
        TransferMode::Move => filesystem::move_path(&source, &destination),
    };
    if let Err(e) = result {
        return (ResultPayload::Transfer(outcome), Some(e));
    }

    debug!(
        "{:?} {} -> {}",
        mode,
        source.display(),
        destination.display()
    );
    match filesystem::read_metadata(&destination, false) {
        Ok(metadata) => {
            outcome.metadata = Some(metadata);
            (ResultPayload::Transfer(outcome), None)
        }
        Err(e) => (ResultPayload::Transfer(outcome), Some(e)),
    }
}
