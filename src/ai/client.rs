use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{AppError, Result};

/// Client for an OpenAI-compatible chat-completion endpoint.
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| AppError::Config("Model endpoint is not configured (MODEL_API)".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .header("content-type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::info!(model = %self.model, messages = request.messages.len(), "Sending chat completion");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ModelApi(format!(
                "API returned {status}: {body}"
            )));
        }

        let body = response.json::<ChatResponse>().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::ModelApi("Response contained no choices".to_string()))
    }

    /// Completion for one prompt under the shared system message.
    pub async fn ask(&self, prompt: String) -> Result<String> {
        self.complete(vec![Message::system(super::prompt::SYSTEM), Message::user(prompt)])
            .await
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

// --- Request types ---

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// --- Response types ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: String) -> ModelConfig {
        ModelConfig {
            endpoint: Some(endpoint),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model": "deepseek-r1-distill-qwen-14b"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Automation bug"}}]}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&config(format!("{}/", server.url()))).unwrap();
        let answer = client.ask("classify".to_string()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "Automation bug");
    }

    #[tokio::test]
    async fn test_error_status_is_model_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = ChatClient::new(&config(server.url())).unwrap();
        let err = client.ask("x".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::ModelApi(ref m) if m.contains("overloaded")));
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&config(server.url())).unwrap();
        assert!(client.ask("x".to_string()).await.is_err());
    }

    #[test]
    fn test_missing_endpoint_is_config_error() {
        let err = ChatClient::new(&ModelConfig::default()).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }
}
