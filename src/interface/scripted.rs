// Scripted interface for tests and unattended runs
//
// Answers are consumed in order. Each prompt and each displayed line is kept
// in a transcript so tests can assert on what the user would have seen.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{parse_choice, parse_yes_no, Interface};
use crate::errors::InteractionError;

#[derive(Default)]
struct Transcript {
    answers: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

pub struct ScriptedInterface {
    interactive: bool,
    state: Mutex<Transcript>,
}

impl ScriptedInterface {
    /// Answers are "y"/"n", a 1-based choice number, or a choice label prefix
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interactive: true,
            state: Mutex::new(Transcript {
                answers: answers.into_iter().map(Into::into).collect(),
                ..Default::default()
            }),
        }
    }

    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            state: Mutex::new(Transcript::default()),
        }
    }

    /// Every question asked so far
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Everything displayed so far, one entry per line
    pub fn output(&self) -> Vec<String> {
        self.lock().output.clone()
    }

    pub fn remaining_answers(&self) -> usize {
        self.lock().answers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Transcript> {
        // A panicking test must not poison the transcript for its assertions
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_answer(&self, question: &str) -> Result<String, InteractionError> {
        let mut state = self.lock();
        state.prompts.push(question.to_string());
        if !self.interactive {
            return Err(InteractionError::Unavailable(
                "scripted interface is non-interactive".to_string(),
            ));
        }
        state.answers.pop_front().ok_or_else(|| {
            InteractionError::Unavailable(format!("no scripted answer for: {}", question))
        })
    }
}

#[async_trait]
impl Interface for ScriptedInterface {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn ask_yes_no(&self, question: &str) -> Result<bool, InteractionError> {
        let answer = self.next_answer(question)?;
        parse_yes_no(&answer).ok_or_else(|| {
            InteractionError::Unavailable(format!("'{}' is not a yes/no answer", answer))
        })
    }

    async fn ask_choice(
        &self,
        question: &str,
        choices: &[&str],
    ) -> Result<usize, InteractionError> {
        let answer = self.next_answer(question)?;
        parse_choice(&answer, choices).ok_or_else(|| {
            InteractionError::Unavailable(format!("'{}' matches none of {:?}", answer, choices))
        })
    }

    fn display_text(&self, text: &str) {
        let mut state = self.lock();
        state.output.extend(text.lines().map(str::to_string));
    }
}
