use serde::Serialize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const GREETING: &str = "Hi! I'm DeepSeek. How can I help you code today? 💻";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One role-tagged message. Fields are private so a turn cannot change after
/// it has been created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("{role} turn has empty content")]
    EmptyContent { role: Role },
    #[error("system instruction is injected at prompt time and cannot be stored")]
    SystemTurn,
}

/// Ordered conversation history for one session.
///
/// Starts with a single assistant greeting and only shrinks through
/// [`Transcript::reset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            turns: seed_turns(),
        }
    }

    pub fn append(&mut self, turn: Turn) -> Result<(), TranscriptError> {
        match turn.role {
            Role::System => return Err(TranscriptError::SystemTurn),
            Role::User | Role::Assistant => {
                if turn.content.trim().is_empty() {
                    return Err(TranscriptError::EmptyContent { role: turn.role });
                }
            }
        }

        self.turns.push(turn);
        Ok(())
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn reset(&mut self) {
        self.turns = seed_turns();
    }
}

fn seed_turns() -> Vec<Turn> {
    vec![Turn::assistant(GREETING)]
}
