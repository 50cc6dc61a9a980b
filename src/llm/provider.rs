use std::time::Duration;
use thiserror::Error;

use crate::chat::model::ModelSelector;
use crate::chat::prompt::PromptChain;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: PromptChain,
    pub model: ModelSelector,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("cannot reach inference server at {base_url}: {message}")]
    Connection { base_url: String, message: String },
    #[error("model '{0}' not found on the inference server; pull it with: ollama pull {0}")]
    ModelNotFound(String),
    #[error("inference request timed out after {0:?}")]
    Timeout(Duration),
    #[error("inference server error: {0}")]
    Upstream(String),
}

pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

pub trait InferenceClient {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl std::future::Future<Output = InferenceResult<String>> + Send;
}
