// Interaction surface
//
// Everything the pipeline shows the user or asks of them goes through this
// trait, so tests can swap the terminal for a scripted conversation.

mod scripted;
mod terminal;

pub use scripted::ScriptedInterface;
pub use terminal::TerminalInterface;

use async_trait::async_trait;

use crate::errors::InteractionError;

#[async_trait]
pub trait Interface: Send + Sync {
    /// Whether prompts can be answered at all
    fn is_interactive(&self) -> bool {
        true
    }

    async fn ask_yes_no(&self, question: &str) -> Result<bool, InteractionError>;

    /// Ask the user to pick one of `choices`; returns its index
    async fn ask_choice(&self, question: &str, choices: &[&str])
        -> Result<usize, InteractionError>;

    fn display_text(&self, text: &str);

    /// Show a titled block of content (file preview, command output)
    fn display_block(&self, title: &str, content: &str) {
        self.display_text(&format!("--- {} ---", title));
        self.display_text(content);
        self.display_text("---");
    }

    fn display_error(&self, message: &str) {
        self.display_text(&format!("error: {}", message));
    }
}

/// Map a free-form answer onto yes/no; `None` for anything else
pub(crate) fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Map an answer onto a choice: 1-based number or a case-insensitive label prefix
pub(crate) fn parse_choice(answer: &str, choices: &[&str]) -> Option<usize> {
    let answer = answer.trim().to_lowercase();
    if answer.is_empty() {
        return None;
    }
    if let Ok(n) = answer.parse::<usize>() {
        return (1..=choices.len()).contains(&n).then(|| n - 1);
    }
    let mut matches = choices
        .iter()
        .enumerate()
        .filter(|(_, c)| c.to_lowercase().starts_with(&answer));
    match (matches.next(), matches.next()) {
        (Some((index, _)), None) => Some(index),
        _ => None,
    }
}
