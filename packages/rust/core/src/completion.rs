//! Completion service collaborator.
//!
//! The pipeline talks to the language model through [`CompletionClient`];
//! [`HttpCompletionClient`] is the default implementation against any
//! OpenAI-compatible chat-completions endpoint. An empty string is the
//! universal "no usable content" signal: every call site defines its own
//! fallback rather than failing the run.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use docweaver_shared::{DocweaverError, Result};

/// Completions can be slow; generous but bounded.
const COMPLETION_TIMEOUT_SECS: u64 = 120;

/// Sampling temperature used for every call.
const TEMPERATURE: f64 = 0.7;

// ---------------------------------------------------------------------------
// Collaborator contract
// ---------------------------------------------------------------------------

/// Output bias for a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Free text.
    Text,
    /// Structured-JSON-biased (used by the outline planner).
    Json,
}

/// Language-model completion collaborator.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete `prompt` with `model`, biased per `mode`.
    async fn complete(&self, prompt: &str, model: &str, mode: CompletionMode) -> Result<String>;
}

/// Run a completion, absorbing failure into an empty string.
///
/// The core treats an empty completion as "no usable content" and proceeds
/// with whatever fallback the calling component defines.
pub async fn complete_or_empty(
    client: &dyn CompletionClient,
    prompt: &str,
    model: &str,
    mode: CompletionMode,
) -> String {
    match client.complete(prompt, model, mode).await {
        Ok(text) => text,
        Err(e) => {
            warn!(model, error = %e, "completion failed, proceeding without content");
            String::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types (OpenAI-compatible chat completions)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Completion client for OpenAI-compatible endpoints.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpCompletionClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(COMPLETION_TIMEOUT_SECS))
            .build()
            .map_err(|e| DocweaverError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str, model: &str, mode: CompletionMode) -> Result<String> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: match mode {
                    CompletionMode::Text => "text",
                    CompletionMode::Json => "json_object",
                },
            },
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocweaverError::Completion(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocweaverError::Completion(format!("HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocweaverError::Completion(format!("invalid response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DocweaverError::Completion("response had no choices".into()))?;

        debug!(model, response_len = content.len(), "completion received");
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn completes_against_mock_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "test/model",
                "response_format": {"type": "text"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("hello world")))
            .mount(&server)
            .await;

        let client = HttpCompletionClient::new(server.uri(), "test-key").unwrap();
        let result = client
            .complete("say hello", "test/model", CompletionMode::Text)
            .await
            .unwrap();
        assert_eq!(result, "hello world");
    }

    #[tokio::test]
    async fn json_mode_sets_response_format() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "response_format": {"type": "json_object"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("[]")))
            .mount(&server)
            .await;

        let client = HttpCompletionClient::new(server.uri(), "test-key").unwrap();
        let result = client
            .complete("plan it", "test/model", CompletionMode::Json)
            .await
            .unwrap();
        assert_eq!(result, "[]");
    }

    #[tokio::test]
    async fn http_failure_is_a_completion_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpCompletionClient::new(server.uri(), "test-key").unwrap();
        let err = client
            .complete("p", "m", CompletionMode::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, DocweaverError::Completion(_)));
    }

    #[tokio::test]
    async fn complete_or_empty_absorbs_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpCompletionClient::new(server.uri(), "test-key").unwrap();
        let result = complete_or_empty(&client, "p", "m", CompletionMode::Text).await;
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn missing_choices_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let client = HttpCompletionClient::new(server.uri(), "test-key").unwrap();
        let err = client
            .complete("p", "m", CompletionMode::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
