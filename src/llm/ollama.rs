//! Ollama chat API adapter.

use serde::{Deserialize, Serialize};

use super::provider::{CompletionRequest, InferenceClient, InferenceError, InferenceResult};
use crate::chat::prompt::PromptMessage;
use crate::http::client::HttpClient;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

const ERROR_BODY_LIMIT: usize = 400;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    http: HttpClient,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn tags_endpoint(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    fn build_request(request: &CompletionRequest) -> OllamaChatRequest<'_> {
        OllamaChatRequest {
            model: request.model.name(),
            messages: request.prompt.messages(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
            },
        }
    }

    /// Names of the models currently installed on the server.
    pub async fn list_models(&self) -> InferenceResult<Vec<String>> {
        let response = self
            .http
            .get(&self.tags_endpoint())
            .await
            .map_err(|err| self.transport_error(err))?;

        if !response.is_success() {
            return Err(InferenceError::Upstream(status_message(
                response.status,
                &response.body,
            )));
        }

        let tags = serde_json::from_str::<OllamaTagsResponse>(&response.body)
            .map_err(|err| InferenceError::Upstream(format!("unreadable model list: {err}")))?;
        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }

    fn transport_error(&self, err: reqwest::Error) -> InferenceError {
        // The client only carries a connect timeout; the request budget is
        // enforced by the turn controller.
        if err.is_connect() || err.is_timeout() {
            InferenceError::Connection {
                base_url: self.base_url.clone(),
                message: err.to_string(),
            }
        } else {
            InferenceError::Upstream(format!("transport error: {err}"))
        }
    }

    fn extract_text(body: &str) -> InferenceResult<String> {
        let parsed = serde_json::from_str::<OllamaChatResponse>(body)
            .map_err(|err| InferenceError::Upstream(format!("unreadable response: {err}")))?;

        if let Some(error) = parsed.error {
            return Err(InferenceError::Upstream(error));
        }

        let text = parsed
            .message
            .map(|message| message.content.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(InferenceError::Upstream(
                "model returned an empty response".to_string(),
            ));
        }

        Ok(text)
    }
}

impl InferenceClient for OllamaProvider {
    async fn complete(&self, request: CompletionRequest) -> InferenceResult<String> {
        let payload = Self::build_request(&request);
        let response = self
            .http
            .post_json(&self.chat_endpoint(), &payload)
            .await
            .map_err(|err| self.transport_error(err))?;

        if response.status == 404 {
            return Err(InferenceError::ModelNotFound(request.model.name().to_string()));
        }
        if !response.is_success() {
            return Err(InferenceError::Upstream(status_message(
                response.status,
                &response.body,
            )));
        }

        Self::extract_text(&response.body)
    }
}

/// Ollama reports untagged pulls as `<name>:latest`.
pub fn is_installed(installed: &[String], name: &str) -> bool {
    installed
        .iter()
        .any(|known| known == name || known.strip_suffix(":latest") == Some(name))
}

fn status_message(status: u16, body: &str) -> String {
    let body = serde_json::from_str::<OllamaErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| body.to_string());
    let body = body.chars().take(ERROR_BODY_LIMIT).collect::<String>();
    format!("request failed with status {status}: {body}")
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}
