//! `OpenAI` GPT provider implementation.
//!
//! Also works against `OpenAI`-compatible servers (Ollama, vLLM,
//! llama.cpp, LM Studio) via [`OpenAiProvider::with_base_url`].

use serde::{Deserialize, Serialize};

use super::{LlmProvider, MAX_TOKENS};
use crate::AiError;

/// Public `OpenAI` API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Points the provider at an `OpenAI`-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn label(&self) -> String {
        format!("openai/{}", self.model)
    }

    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: system_prompt,
                },
                OpenAiMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: OpenAiError = serde_json::from_str(&body).unwrap_or_else(|_| OpenAiError {
                error: OpenAiErrorDetail {
                    message: format!("HTTP {status}: {body}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: OpenAiResponse = serde_json::from_str(&body)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::Provider {
                message: "No choices in OpenAI response".to_string(),
            })?;

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AiError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_first_choice_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"{\"region\":\"港区\"}"},"finish_reason":"stop"}]}"#,
            )
            .create_async()
            .await;

        let provider = OpenAiProvider::new("sk-test".to_string(), "gpt-test".to_string())
            .with_base_url(server.url());
        let text = provider.complete("system", "prompt").await.unwrap();

        assert_eq!(text, r#"{"region":"港区"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn no_choices_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let provider = OpenAiProvider::new("sk".to_string(), "gpt-test".to_string())
            .with_base_url(server.url());
        assert!(matches!(
            provider.complete("s", "p").await,
            Err(AiError::Provider { .. })
        ));
    }

    #[tokio::test]
    async fn non_json_error_body_keeps_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let provider = OpenAiProvider::new("sk".to_string(), "gpt-test".to_string())
            .with_base_url(format!("{}/", server.url()));
        match provider.complete("s", "p").await {
            Err(AiError::Provider { message }) => {
                assert!(message.starts_with("HTTP 502"), "{message}");
                assert!(message.ends_with("bad gateway"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
