//! OpenAI Chat Completions client
//!
//! Sends the composed prompt as a single user-role message. Text-only
//! prompts use plain string content; prompts with a clipboard image use the
//! two-part content form with the PNG inlined as a base64 data URL.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ChatModel;
use crate::compose::ComposedPrompt;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug)]
pub enum ChatError {
    /// Failed to read the attached image file
    ImageReadError(String),
    /// Network/HTTP error
    NetworkError(String),
    /// OpenAI API returned an error
    ApiError { status: u16, message: String },
    /// Failed to parse API response
    ParseError(String),
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::ImageReadError(e) => write!(f, "Failed to read prompt image: {}", e),
            ChatError::NetworkError(e) => write!(f, "Network error: {}", e),
            ChatError::ApiError { status, message } => {
                write!(f, "OpenAI API error ({}): {}", status, message)
            }
            ChatError::ParseError(e) => write!(f, "Failed to parse API response: {}", e),
        }
    }
}

impl std::error::Error for ChatError {}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Chat-completions client, constructed once and injected into the pipeline.
pub struct ChatClient {
    http: Client,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(api_key: String, model: String) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ChatError::NetworkError(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    async fn build_request(&self, prompt: &ComposedPrompt) -> Result<ChatRequest, ChatError> {
        let content = match &prompt.image {
            None => MessageContent::Text(prompt.text.clone()),
            Some(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| ChatError::ImageReadError(e.to_string()))?;
                MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: prompt.text.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/png;base64,{}", BASE64.encode(bytes)),
                        },
                    },
                ])
            }
        };

        Ok(ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let response = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let chat_response: ChatResponse = response
                .json()
                .await
                .map_err(|e| ChatError::ParseError(e.to_string()))?;

            chat_response
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| ChatError::ParseError("empty choices in response".to_string()))
        } else {
            let error_text = response.text().await.unwrap_or_default();

            let message =
                if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            tracing::error!("OpenAI API error ({}): {}", status.as_u16(), message);

            Err(ChatError::ApiError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl ChatModel for ChatClient {
    async fn complete(&self, prompt: &ComposedPrompt) -> Result<String, ChatError> {
        tracing::info!(
            "Sending chat request ({} chars{})",
            prompt.text.len(),
            if prompt.image.is_some() {
                ", with image"
            } else {
                ""
            }
        );
        let request = self.build_request(prompt).await?;
        self.send(&request).await
    }
}
