//! OpenAI-compatible model client.
//!
//! Implements the `ModelClient` collaborator over the chat-completions
//! API. Transient failures are retried with exponential backoff inside the
//! client; the orchestrator never retries on top of this.

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::session::{ModelClient, ModelReply};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(api_key: String, config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            config,
        }
    }
}

const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<ModelReply> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                WireMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                WireMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2_u64.pow(attempt - 1);
                tracing::warn!(
                    "[OpenAiClient] Retrying API call (attempt {}/{}) after {}ms delay",
                    attempt + 1,
                    MAX_RETRIES,
                    delay
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
            }

            let response = match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("[OpenAiClient] HTTP request failed: {}", e);
                    last_error = Some(Error::Model(format!("HTTP request failed: {e}")));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                tracing::warn!(
                    "[OpenAiClient] API returned error status {}: {}",
                    status,
                    error_text
                );
                last_error = Some(Error::Model(format!("API error {status}: {error_text}")));
                continue;
            }

            let completion = match response.json::<ChatCompletionResponse>().await {
                Ok(completion) => completion,
                Err(e) => {
                    tracing::warn!("[OpenAiClient] Failed to decode response body: {}", e);
                    last_error = Some(Error::Model(format!("Response decode error: {e}")));
                    continue;
                }
            };

            let text = completion
                .choices
                .first()
                .map(|c| c.message.content.clone())
                .unwrap_or_default();
            return Ok(ModelReply {
                text,
                total_tokens: completion.usage.map(|u| u.total_tokens),
            });
        }

        Err(last_error.unwrap_or_else(|| Error::Model("All retry attempts failed".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            model: "gpt-test".to_string(),
            max_tokens: 256,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn test_generate_parses_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}],
                "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test".to_string(), config(server.uri()));
        let reply = client.generate("system", "hi").await.unwrap();

        assert_eq!(reply.text, "hello");
        assert_eq!(reply.total_tokens, Some(7));
    }

    #[tokio::test]
    async fn test_generate_retries_transient_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "recovered"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test".to_string(), config(server.uri()));
        let reply = client.generate("system", "hi").await.unwrap();

        assert_eq!(reply.text, "recovered");
        assert_eq!(reply.total_tokens, None);
    }
}
