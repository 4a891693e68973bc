// Tree plugin - enables the `tree` request kind

use super::Plugin;
use crate::tools::implementations;
use crate::tools::registry::ToolSpec;

pub struct TreePlugin;

impl Plugin for TreePlugin {
    fn name(&self) -> &str {
        "tree"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![implementations::tree::spec()]
    }
}
