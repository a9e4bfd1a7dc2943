//! Chat-completion clients used for segment summaries and final answers.
//!
//! Two providers are supported: a local Ollama runtime (`/api/generate`) and Groq's hosted,
//! OpenAI-compatible `/chat/completions` endpoint. Neither client applies timeouts or retries;
//! a failed call surfaces immediately to the caller.

use crate::config::{ChatProvider, Config};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while calling a chat model.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// Provider was misconfigured or unreachable.
    #[error("Chat provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the chat provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Fully rendered prompt sent as a single user turn.
    pub prompt: String,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Produce a completion for the prompt, trimmed of surrounding whitespace.
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatClientError>;
}

/// Build a chat client based on configuration.
pub fn get_chat_client(config: &Config) -> Result<Box<dyn ChatClient>, ChatClientError> {
    match config.chat_provider {
        ChatProvider::Ollama => Ok(Box::new(OllamaChatClient::new(config.ollama_url.clone())?)),
        ChatProvider::Groq => {
            let api_key = config.groq_api_key.clone().ok_or_else(|| {
                ChatClientError::ProviderUnavailable("GROQ_API_KEY is not set".into())
            })?;
            Ok(Box::new(GroqChatClient::new(
                config.groq_base_url.clone(),
                api_key,
            )?))
        }
    }
}

fn build_http(user_agent: &str) -> Result<Client, ChatClientError> {
    Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|error| ChatClientError::ProviderUnavailable(error.to_string()))
}

/// Chat client for the Ollama runtime.
pub struct OllamaChatClient {
    http: Client,
    base_url: String,
}

impl OllamaChatClient {
    /// Construct a client for the runtime at `base_url`.
    pub fn new(base_url: String) -> Result<Self, ChatClientError> {
        Ok(Self {
            http: build_http("docqa/chat")?,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatClientError> {
        let mut payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
        });
        if let Some(temperature) = request.temperature {
            payload["options"] = json!({ "temperature": temperature });
        }

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ChatClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ChatClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            ChatClientError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(ChatClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

/// Chat client for Groq's OpenAI-compatible API.
pub struct GroqChatClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GroqChatClient {
    /// Construct a client for `base_url` authenticated with `api_key`.
    pub fn new(base_url: String, api_key: String) -> Result<Self, ChatClientError> {
        Ok(Self {
            http: build_http("docqa/chat")?,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatClientError> {
        let mut payload = json!({
            "model": request.model,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
        });
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ChatClientError::ProviderUnavailable(format!(
                    "failed to reach Groq at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatClientError::GenerationFailed(format!(
                "Groq returned {status}: {body}"
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|error| {
            ChatClientError::InvalidResponse(format!("failed to decode Groq response: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ChatClientError::InvalidResponse("response had no choices".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "llama".into(),
            prompt: "Summarize".into(),
            temperature: Some(0.1),
        }
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = OllamaChatClient::new(server.base_url()).expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("\"stream\":false");
                then.status(200).json_body(json!({
                    "response": "  Summary text \n",
                    "done": true
                }));
            })
            .await;

        let summary = client.complete(request()).await.expect("summary");

        mock.assert();
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaChatClient::new(server.base_url()).expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client.complete(request()).await.expect_err("error response");
        assert!(
            matches!(error, ChatClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn groq_client_sends_bearer_and_reads_first_choice() {
        let server = MockServer::start_async().await;
        let client = GroqChatClient::new(server.base_url(), "secret".into()).expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer secret")
                    .body_contains("\"role\":\"user\"");
                then.status(200).json_body(json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "Answer" } }
                    ]
                }));
            })
            .await;

        let answer = client.complete(request()).await.expect("answer");

        mock.assert();
        assert_eq!(answer, "Answer");
    }

    #[tokio::test]
    async fn groq_client_rejects_empty_choices() {
        let server = MockServer::start_async().await;
        let client = GroqChatClient::new(server.base_url(), "secret".into()).expect("client");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let error = client.complete(request()).await.expect_err("no choices");
        assert!(matches!(error, ChatClientError::InvalidResponse(_)));
    }
}
