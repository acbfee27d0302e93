use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::prompt::Prompt;
use super::traits::CompletionSender;
use crate::error::{Error, Result};

/// One credential against an OpenAI-compatible chat completion API.
/// Works with: xAI, DeepSeek, OpenAI, llama.cpp server, Ollama, etc.
pub struct OpenAiSender {
    client: Client,
    /// Base URL for the API (e.g., "https://api.x.ai/v1")
    pub api_base: String,
    api_key: String,
    /// Model identifier
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiSender {
    /// Create a sender bound to one API key.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created, which should only happen
    /// in extreme circumstances (e.g., TLS backend unavailable on the system).
    #[allow(clippy::expect_used)]
    pub fn new(
        api_base: String,
        api_key: String,
        model: String,
        temperature: f32,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_base,
            api_key,
            model,
            temperature,
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionSender for OpenAiSender {
    async fn send(&self, prompt: &Prompt) -> Result<String> {
        let url = self.url();
        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message { role: "system", content: &prompt.system },
                Message { role: "user", content: &prompt.user },
            ],
            temperature: self.temperature,
        };

        debug!("Translation request to {} with {}", url, self.label());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::TranslationTimeout
                } else {
                    Error::TranslationRequest(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            warn!("Rate limited on {}, retry after {:?}s", self.label(), retry_after);
            return Err(Error::TranslationRateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("API error: {} - {}", status, body);
            return Err(Error::TranslationRequest(format!("HTTP {status}: {body}")));
        }

        let chat_response = response.json::<ChatResponse>().await.map_err(|e| {
            warn!("Failed to parse response: {}", e);
            Error::TranslationInvalidResponse(e.to_string())
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::TranslationInvalidResponse("No choices in response".to_string()))?
            .message
            .content
            .unwrap_or_default();

        let translated = content.trim();
        if translated.is_empty() {
            return Err(Error::TranslationEmptyResponse);
        }
        Ok(translated.to_string())
    }

    fn label(&self) -> String {
        let tail: String = self
            .api_key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("key ...{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_and_label() {
        let sender = OpenAiSender::new(
            "https://api.x.ai/v1/".to_string(),
            "xai-secret-1234".to_string(),
            "grok-beta".to_string(),
            0.3,
            60,
        );
        assert_eq!(sender.url(), "https://api.x.ai/v1/chat/completions");
        assert_eq!(sender.label(), "key ...1234");
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest {
            model: "grok-beta",
            messages: [
                Message { role: "system", content: "sys" },
                Message { role: "user", content: "usr" },
            ],
            temperature: 0.3,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["model"], "grok-beta");
    }

    #[test]
    fn test_null_content_parses() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
