// Tree tool - recursive directory listing
//
// Renders a box-drawing tree up to `max_depth`, directories first, then files,
// each group sorted by name. The walk goes one level past the limit to tell
// whether anything was cut off.

use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use super::Execution;
use crate::errors::ExecutionError;
use crate::tools::filesystem;
use crate::tools::registry::ToolSpec;
use crate::tools::results::{ResultPayload, TreeOutcome};
use crate::tools::types::{ObjectSchema, ToolKind, TreeRequest};

pub fn spec() -> ToolSpec {
    ToolSpec {
        kind: ToolKind::Tree,
        description: "Show the directory structure under a path, like the `tree` command. \
                      Directories are listed first."
            .to_string(),
        input_schema: ObjectSchema::fields(&[
            ("path", "string", "Directory to list", true),
            ("max_depth", "integer", "How deep to descend (1-10, default 3)", false),
            ("show_hidden", "boolean", "Include dotfiles (default false)", false),
        ]),
        result_schema: ObjectSchema::result(&[
            ("tree_output", "string"),
            ("total_files", "integer"),
            ("total_dirs", "integer"),
            ("max_depth_reached", "boolean"),
        ]),
    }
}

struct Node {
    depth: usize,
    name: String,
    is_dir: bool,
}

/// Entries below `root` in display order, one level deeper than requested so
/// a cut can be detected
fn collect(root: &Path, request: &TreeRequest) -> Vec<Node> {
    let show_hidden = request.show_hidden;
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(request.max_depth as usize + 1)
        .sort_by(|a, b| {
            b.file_type()
                .is_dir()
                .cmp(&a.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_entry(move |e| {
            // The root is always listed
            e.depth() == 0 || show_hidden || !e.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(Node {
                depth: entry.depth(),
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: entry.file_type().is_dir(),
            }),
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .collect()
}

/// Whether each node is the last among its siblings
fn last_siblings(nodes: &[Node]) -> Vec<bool> {
    let mut seen: Vec<bool> = Vec::new();
    let mut last = vec![false; nodes.len()];
    for (i, node) in nodes.iter().enumerate().rev() {
        seen.resize(node.depth + 1, false);
        last[i] = !seen[node.depth];
        seen[node.depth] = true;
    }
    last
}

pub fn execute(request: &TreeRequest) -> Execution {
    let root = filesystem::absolute_path(&request.path);
    let mut outcome = TreeOutcome {
        absolute_path: root.display().to_string(),
        tree_output: String::new(),
        total_files: 0,
        total_dirs: 0,
        max_depth_reached: false,
    };

    if !filesystem::exists(&root) {
        return (
            ResultPayload::Tree(outcome),
            Some(ExecutionError::NotFound(root)),
        );
    }
    if !filesystem::is_dir(&root) {
        return (
            ResultPayload::Tree(outcome),
            Some(ExecutionError::NotADirectory(root)),
        );
    }

    let limit = request.max_depth as usize;
    let nodes = collect(&root, request);
    let last = last_siblings(&nodes);

    let mut lines = vec![format!("{}/", root.display())];
    // Per level: does the parent at that level still have siblings below it
    let mut open: Vec<bool> = Vec::new();
    for (node, is_last) in nodes.iter().zip(last) {
        if node.depth > limit {
            outcome.max_depth_reached = true;
            continue;
        }
        open.truncate(node.depth - 1);
        let prefix: String = open
            .iter()
            .map(|&more| if more { "│   " } else { "    " })
            .collect();
        let branch = if is_last { "└── " } else { "├── " };
        if node.is_dir {
            outcome.total_dirs += 1;
            lines.push(format!("{}{}{}/", prefix, branch, node.name));
        } else {
            outcome.total_files += 1;
            lines.push(format!("{}{}{}", prefix, branch, node.name));
        }
        open.push(!is_last);
    }

    outcome.tree_output = lines.join("\n");
    (ResultPayload::Tree(outcome), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/deep/deeper")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "").unwrap();
        fs::write(dir.path().join("src/deep/deeper/x"), "").unwrap();
        fs::write(dir.path().join("README"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        dir
    }

    fn request(dir: &TempDir, max_depth: u32, show_hidden: bool) -> TreeRequest {
        TreeRequest {
            comment: "tree".to_string(),
            path: dir.path().display().to_string(),
            max_depth,
            show_hidden,
        }
    }

    fn tree(payload: ResultPayload) -> TreeOutcome {
        match payload {
            ResultPayload::Tree(t) => t,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_directories_first_and_hidden_skipped() {
        let dir = fixture();
        let (payload, error) = execute(&request(&dir, 10, false));
        assert!(error.is_none());
        let t = tree(payload);
        let lines: Vec<&str> = t.tree_output.lines().collect();
        assert_eq!(lines[1], "├── src/");
        assert!(lines.last().unwrap().ends_with("README"));
        assert!(!t.tree_output.contains(".hidden"));
        assert_eq!(t.total_dirs, 3);
        assert_eq!(t.total_files, 3);
        assert!(!t.max_depth_reached);
    }

    #[test]
    fn test_branches_follow_nesting() {
        let dir = fixture();
        let t = tree(execute(&request(&dir, 10, false)).0);
        let lines: Vec<&str> = t.tree_output.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec![
                "├── src/",
                "│   ├── deep/",
                "│   │   └── deeper/",
                "│   │       └── x",
                "│   └── main.rs",
                "└── README",
            ]
        );
    }

    #[test]
    fn test_depth_limit_is_reported() {
        let dir = fixture();
        let t = tree(execute(&request(&dir, 1, true)).0);
        assert!(t.max_depth_reached);
        assert!(t.tree_output.contains(".hidden"));
        assert!(!t.tree_output.contains("main.rs"));
        assert_eq!(t.total_dirs, 1);
    }

    #[test]
    fn test_file_root_is_rejected() {
        let dir = fixture();
        let file = TreeRequest {
            comment: "tree".to_string(),
            path: dir.path().join("README").display().to_string(),
            max_depth: 3,
            show_hidden: false,
        };
        let (_, error) = execute(&file);
        assert!(matches!(error, Some(ExecutionError::NotADirectory(_))));
    }
}
