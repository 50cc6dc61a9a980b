use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use super::prompt::{SYSTEM_INSTRUCTION, build};
use super::session::ChatSession;
use super::transcript::Turn;
use crate::llm::provider::{CompletionRequest, DEFAULT_TEMPERATURE, InferenceClient, InferenceError};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub temperature: f32,
    pub request_timeout: Duration,
    pub system_instruction: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    AwaitingInput,
    Processing,
    Appended,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    StateChanged(ControllerState),
    /// Transient, user-visible message. Never stored in the transcript.
    Notification(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Appended {
        reply: String,
    },
    Failed {
        notification: String,
        error: InferenceError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("input is empty")]
    EmptyInput,
}

/// Runs one submit -> inference -> append cycle at a time for a session.
#[derive(Debug)]
pub struct TurnController<C> {
    client: C,
    config: ControllerConfig,
    state: ControllerState,
}

impl<C: InferenceClient> TurnController<C> {
    pub fn new(client: C, config: ControllerConfig) -> Self {
        Self {
            client,
            config,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Handles one submission. Blank input is rejected before anything is
    /// appended; any inference failure leaves the user turn in place and is
    /// reported as a notification instead of an assistant turn.
    pub async fn submit<F: FnMut(ControllerEvent)>(
        &mut self,
        session: &mut ChatSession,
        input: &str,
        on_event: &mut F,
    ) -> Result<CycleOutcome, SubmitError> {
        self.transition(ControllerState::AwaitingInput, on_event);

        let text = input.trim();
        if text.is_empty() || session.transcript_mut().append(Turn::user(text)).is_err() {
            self.transition(ControllerState::Idle, on_event);
            return Err(SubmitError::EmptyInput);
        }

        self.transition(ControllerState::Processing, on_event);
        let outcome = match self.request_completion(session).await {
            Ok(reply) => match session.transcript_mut().append(Turn::assistant(reply.clone())) {
                Ok(()) => CycleOutcome::Appended { reply },
                Err(_) => failed(InferenceError::Upstream(
                    "model returned an empty response".to_string(),
                )),
            },
            Err(error) => failed(error),
        };

        match &outcome {
            CycleOutcome::Appended { .. } => {
                self.transition(ControllerState::Appended, on_event);
            }
            CycleOutcome::Failed { notification, .. } => {
                on_event(ControllerEvent::Notification(notification.clone()));
                self.transition(ControllerState::Failed, on_event);
            }
        }
        self.transition(ControllerState::Idle, on_event);

        Ok(outcome)
    }

    async fn request_completion(&self, session: &ChatSession) -> Result<String, InferenceError> {
        let request = CompletionRequest {
            prompt: build(session.transcript().all(), &self.config.system_instruction),
            model: session.model().clone(),
            temperature: self.config.temperature,
        };

        match timeout(self.config.request_timeout, self.client.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout(self.config.request_timeout)),
        }
    }

    fn transition<F: FnMut(ControllerEvent)>(&mut self, next: ControllerState, on_event: &mut F) {
        self.state = next;
        on_event(ControllerEvent::StateChanged(next));
    }
}

fn failed(error: InferenceError) -> CycleOutcome {
    CycleOutcome::Failed {
        notification: format!("Error generating response: {error}"),
        error,
    }
}
