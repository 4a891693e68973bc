// Terminal interface
//
// Prompts are read with rustyline on a blocking thread; everything else is
// written to stderr so stdout stays reserved for the JSON results.

use async_trait::async_trait;
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, IsTerminal, Write};

use super::{parse_choice, parse_yes_no, Interface};
use crate::errors::InteractionError;

pub struct TerminalInterface {
    interactive: bool,
}

impl TerminalInterface {
    /// Interactive only when stdin is a terminal
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal(),
        }
    }

    /// Never prompt; every request that needs consent is denied
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    async fn read_line(&self, prompt: String) -> Result<String, InteractionError> {
        if !self.interactive {
            return Err(InteractionError::Unavailable(
                "terminal is not interactive".to_string(),
            ));
        }

        tokio::task::spawn_blocking(move || {
            let mut editor =
                DefaultEditor::new().map_err(|e| InteractionError::Unavailable(e.to_string()))?;
            match editor.readline(&prompt) {
                Ok(line) => Ok(line),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    Err(InteractionError::Aborted)
                }
                Err(e) => Err(InteractionError::Unavailable(e.to_string())),
            }
        })
        .await
        .map_err(|e| InteractionError::Unavailable(e.to_string()))?
    }
}

impl Default for TerminalInterface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interface for TerminalInterface {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn ask_yes_no(&self, question: &str) -> Result<bool, InteractionError> {
        loop {
            let answer = self.read_line(format!("{} [y/N] ", question)).await?;
            if answer.trim().is_empty() {
                return Ok(false);
            }
            match parse_yes_no(&answer) {
                Some(value) => return Ok(value),
                None => self.display_error("please answer y or n"),
            }
        }
    }

    async fn ask_choice(
        &self,
        question: &str,
        choices: &[&str],
    ) -> Result<usize, InteractionError> {
        self.display_text(question);
        for (i, choice) in choices.iter().enumerate() {
            self.display_text(&format!("  {}. {}", i + 1, choice));
        }
        loop {
            let answer = self.read_line("> ".to_string()).await?;
            match parse_choice(&answer, choices) {
                Some(index) => return Ok(index),
                None => self.display_error(&format!(
                    "enter a number between 1 and {}",
                    choices.len()
                )),
            }
        }
    }

    fn display_text(&self, text: &str) {
        let mut stderr = io::stderr();
        let _ = writeln!(stderr, "{}", text);
    }

    fn display_block(&self, title: &str, content: &str) {
        let mut stderr = io::stderr();
        let _ = writeln!(stderr, "{}", format!("┌─ {}", title).cyan());
        for line in content.lines() {
            let _ = writeln!(stderr, "{} {}", "│".cyan(), line);
        }
        let _ = writeln!(stderr, "{}", "└─".cyan());
    }

    fn display_error(&self, message: &str) {
        let mut stderr = io::stderr();
        let _ = writeln!(stderr, "{}", message.red());
    }
}
