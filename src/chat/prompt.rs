use serde::Serialize;

use super::transcript::{Role, Turn};

pub const SYSTEM_INSTRUCTION: &str = "You are an expert AI coding assistant. Provide concise, correct solutions with strategic print statements for debugging. Always respond in English.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// Role-tagged message blocks for a single inference call. Built fresh every
/// cycle from the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptChain {
    messages: Vec<PromptMessage>,
}

impl PromptChain {
    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// System instruction first, then every turn in stored order. The whole
/// history is replayed; nothing is windowed or summarized.
pub fn build(transcript: &[Turn], system_instruction: &str) -> PromptChain {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(PromptMessage {
        role: Role::System,
        content: system_instruction.to_string(),
    });
    messages.extend(transcript.iter().map(|turn| PromptMessage {
        role: turn.role(),
        content: turn.content().to_string(),
    }));

    PromptChain { messages }
}
