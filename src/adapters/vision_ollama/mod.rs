// Vision Ollama adapter - Grid queries against a local Ollama server

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SceneCutError, SceneCutResult};
use crate::ports::VisionModel;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Ollama `/api/chat` client for vision models
pub struct OllamaVisionAdapter {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaVisionAdapter {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> SceneCutResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            SceneCutError::VisionModel {
                message: format!("cannot build HTTP client: {}", e),
            }
        })?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint)
    }

    fn request_body<'a>(&'a self, prompt: &'a str, image: &[u8]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
                images: vec![base64::engine::general_purpose::STANDARD.encode(image)],
            }],
            stream: false,
        }
    }
}

#[async_trait]
impl VisionModel for OllamaVisionAdapter {
    async fn query(&self, prompt: &str, image: &[u8]) -> SceneCutResult<String> {
        let request = self.request_body(prompt, image);
        debug!(
            "Querying {} at {} with {} byte image",
            self.model,
            self.endpoint,
            image.len()
        );

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| SceneCutError::VisionModel {
                message: format!("request to {} failed: {}", self.endpoint, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SceneCutError::VisionModel {
                message: format!("Ollama API error ({}): {}", status, error_text),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| SceneCutError::VisionModel {
                message: format!("unexpected response body: {}", e),
            })?;
        Ok(chat_response.message.content)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
