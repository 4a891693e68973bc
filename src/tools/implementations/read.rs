// Read tool - returns file metadata and, when allowed, file content
//
// Metadata is always collected. Content is only read when consent covers it;
// non-UTF-8 files come back base64-encoded. Directories report a listing.

use tracing::debug;

use super::Execution;
use crate::tools::filesystem;
use crate::tools::permissions::ConsentDecision;
use crate::tools::registry::ToolSpec;
use crate::tools::results::{ReadOutcome, ResultPayload};
use crate::tools::types::{ObjectSchema, ReadRequest, ToolKind};

pub fn spec() -> ToolSpec {
    ToolSpec {
        kind: ToolKind::Read,
        description: "Read a file or directory. Returns metadata (size, modification time, \
                      owner, group) and the file content, or a listing for directories. \
                      Set metadata_only to skip the content."
            .to_string(),
        input_schema: ObjectSchema::fields(&[
            ("path", "string", "Path of the file or directory to read", true),
            (
                "metadata_only",
                "boolean",
                "Only return metadata, not content (default false)",
                false,
            ),
        ]),
        result_schema: ObjectSchema::result(&[
            ("metadata", "object"),
            ("content", "string"),
            ("encoding", "string"),
        ]),
    }
}

pub fn execute(request: &ReadRequest, decision: &ConsentDecision) -> Execution {
    let path = filesystem::absolute_path(&request.path);
    let mut outcome = ReadOutcome {
        absolute_path: path.display().to_string(),
        metadata: None,
        content: None,
        encoding: None,
    };

    let metadata = match filesystem::read_metadata(&path, true) {
        Ok(metadata) => metadata,
        Err(e) => return (ResultPayload::Read(outcome), Some(e)),
    };

    let wants_content =
        decision.allows_content() && !request.metadata_only && !metadata.is_directory;
    outcome.metadata = Some(metadata);

    if wants_content {
        match filesystem::read_file(&path) {
            Ok((content, encoding)) => {
                debug!("Read {} bytes from {}", content.len(), path.display());
                outcome.content = Some(content);
                outcome.encoding = Some(encoding);
            }
            Err(e) => return (ResultPayload::Read(outcome), Some(e)),
        }
    }

    (ResultPayload::Read(outcome), None)
}
