// Write tool - create files or directories
//
// Files are written atomically (temp file + rename) and parent directories are
// created as needed. Existing files are replaced; existing directories are not.

use tracing::{debug, warn};

use super::Execution;
use crate::errors::ExecutionError;
use crate::tools::filesystem;
use crate::tools::registry::ToolSpec;
use crate::tools::results::{FileOutcome, ResultPayload};
use crate::tools::types::{ObjectSchema, ToolKind, WriteRequest};

pub fn spec() -> ToolSpec {
    ToolSpec {
        kind: ToolKind::Write,
        description: "Create a file with the given content, or an empty directory when \
                      is_directory is true. Existing files are replaced; parent \
                      directories are created."
            .to_string(),
        input_schema: ObjectSchema::fields(&[
            ("path", "string", "Path of the file or directory to create", true),
            (
                "is_directory",
                "boolean",
                "Create a directory instead of a file (default false)",
                false,
            ),
            ("content", "string", "Full file content (ignored for directories)", false),
        ]),
        result_schema: ObjectSchema::result(&[
            ("previous_metadata", "object"),
            ("metadata", "object"),
        ]),
    }
}

pub fn execute(request: &WriteRequest, min_disk_space_left: u64) -> Execution {
    let path = filesystem::absolute_path(&request.path);
    let mut outcome = FileOutcome {
        absolute_path: path.display().to_string(),
        previous_metadata: None,
        metadata: None,
    };

    if filesystem::exists(&path) {
        outcome.previous_metadata = filesystem::read_metadata(&path, false).ok();
        if request.is_directory || filesystem::is_dir(&path) {
            return (
                ResultPayload::File(outcome),
                Some(ExecutionError::WouldOverwrite(path)),
            );
        }
        warn!("Replacing existing file {}", path.display());
    }

    let result = if request.is_directory {
        filesystem::create_dir(&path)
    } else {
        let content = request.content.as_deref().unwrap_or_default();
        filesystem::ensure_space(&path, content.len() as u64, min_disk_space_left)
            .and_then(|_| filesystem::write_file_atomic(&path, content))
    };
    if let Err(e) = result {
        return (ResultPayload::File(outcome), Some(e));
    }

    debug!("Wrote {}", path.display());
    match filesystem::read_metadata(&path, false) {
        Ok(metadata) => {
            outcome.metadata = Some(metadata);
            (ResultPayload::File(outcome), None)
        }
        Err(e) => (ResultPayload::File(outcome), Some(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn request(path: &str, is_directory: bool, content: Option<&str>) -> WriteRequest {
        WriteRequest {
            comment: "write".to_string(),
            path: path.to_string(),
            is_directory,
            content: content.map(str::to_string),
        }
    }

    #[test]
    fn test_creates_file_with_parents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a/b/c.txt");

        let (payload, error) = execute(
            &request(&target.display().to_string(), false, Some("body")),
            0,
        );
        assert!(error.is_none());
        assert_eq!(fs::read_to_string(&target).unwrap(), "body");
        match payload {
            ResultPayload::File(f) => {
                assert!(f.previous_metadata.is_none());
                assert_eq!(f.metadata.unwrap().size, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_replaces_file_and_reports_previous_state() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("c.txt");
        fs::write(&target, "old content").unwrap();

        let (payload, error) = execute(
            &request(&target.display().to_string(), false, Some("new")),
            0,
        );
        assert!(error.is_none());
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        match payload {
            ResultPayload::File(f) => assert_eq!(f.previous_metadata.unwrap().size, 11),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_existing_directory_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let (_, error) = execute(&request(&dir.path().display().to_string(), true, None), 0);
        assert!(matches!(error, Some(ExecutionError::WouldOverwrite(_))));

        let (_, error) = execute(
            &request(&dir.path().display().to_string(), false, Some("x")),
            0,
        );
        assert!(matches!(error, Some(ExecutionError::WouldOverwrite(_))));
    }

    #[test]
    fn test_creates_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("new_dir");
        let (_, error) = execute(&request(&target.display().to_string(), true, None), 0);
        assert!(error.is_none());
        assert!(target.is_dir());
    }
}
