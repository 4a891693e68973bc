// Delete tool - removes a file or a whole directory tree

use tracing::info;

use super::Execution;
use crate::tools::filesystem;
use crate::tools::registry::ToolSpec;
use crate::tools::results::{FileOutcome, ResultPayload};
use crate::tools::types::{DeleteRequest, ObjectSchema, ToolKind};

pub fn spec() -> ToolSpec {
    ToolSpec {
        kind: ToolKind::Delete,
        description: "Delete a file, or a directory and everything in it. This cannot be undone."
            .to_string(),
        input_schema: ObjectSchema::fields(&[(
            "path",
            "string",
            "File or directory to delete",
            true,
        )]),
        result_schema: ObjectSchema::result(&[("previous_metadata", "object")]),
    }
}

pub fn execute(request: &DeleteRequest) -> Execution {
    let path = filesystem::absolute_path(&request.path);
    let mut outcome = FileOutcome {
        absolute_path: path.display().to_string(),
        previous_metadata: None,
        metadata: None,
    };

    match filesystem::read_metadata(&path, false) {
        Ok(metadata) => outcome.previous_metadata = Some(metadata),
        Err(e) => return (ResultPayload::File(outcome), Some(e)),
    }

    if let Err(e) = filesystem::delete_path(&path) {
        return (ResultPayload::File(outcome), Some(e));
    }
    info!("Deleted {}", path.display());
    (ResultPayload::File(outcome), None)
}
