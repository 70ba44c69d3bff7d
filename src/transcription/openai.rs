//! OpenAI Whisper API client for speech-to-text transcription

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::SpeechToText;

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Errors that can occur during transcription
#[derive(Debug)]
pub enum TranscriptionError {
    /// Failed to read audio file
    FileReadError(String),
    /// Network/HTTP error
    NetworkError(String),
    /// OpenAI API returned an error
    ApiError { status: u16, message: String },
    /// Failed to parse API response
    ParseError(String),
}

impl std::fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionError::FileReadError(e) => write!(f, "Failed to read audio file: {}", e),
            TranscriptionError::NetworkError(e) => write!(f, "Network error: {}", e),
            TranscriptionError::ApiError { status, message } => {
                write!(f, "OpenAI API error ({}): {}", status, message)
            }
            TranscriptionError::ParseError(e) => write!(f, "Failed to parse API response: {}", e),
        }
    }
}

impl std::error::Error for TranscriptionError {}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Whisper transcription client. Constructed once per process with its
/// credential and injected into the pipeline.
pub struct WhisperClient {
    http: Client,
    api_key: String,
    model: String,
}

impl WhisperClient {
    pub fn new(api_key: String, model: String) -> Result<Self, TranscriptionError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| TranscriptionError::NetworkError(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    async fn transcribe_file(&self, wav_path: &Path) -> Result<String, TranscriptionError> {
        let file_bytes = tokio::fs::read(wav_path)
            .await
            .map_err(|e| TranscriptionError::FileReadError(e.to_string()))?;

        let filename = wav_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        tracing::info!(
            "Transcribing audio file: {} ({} bytes)",
            filename,
            file_bytes.len()
        );

        let file_part = Part::bytes(file_bytes)
            .file_name(filename)
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("temperature", "0");

        let response = self
            .http
            .post(TRANSCRIPTIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let whisper_response: WhisperResponse = response
                .json()
                .await
                .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

            tracing::info!(
                "Transcription successful: {} chars",
                whisper_response.text.len()
            );

            Ok(whisper_response.text)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            let message =
                if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            tracing::error!("OpenAI API error ({}): {}", status.as_u16(), message);

            Err(TranscriptionError::ApiError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl SpeechToText for WhisperClient {
    async fn transcribe(&self, wav_path: &Path) -> Result<String, TranscriptionError> {
        self.transcribe_file(wav_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = TranscriptionError::ApiError {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn test_error_display_formats() {
        let errors = vec![
            (
                TranscriptionError::FileReadError("file not found".to_string()),
                "file not found",
            ),
            (
                TranscriptionError::NetworkError("connection refused".to_string()),
                "connection refused",
            ),
            (
                TranscriptionError::ParseError("invalid JSON".to_string()),
                "invalid JSON",
            ),
        ];

        for (err, expected) in errors {
            assert!(err.to_string().contains(expected));
        }
    }

    #[test]
    fn error_types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TranscriptionError>();
    }
}
