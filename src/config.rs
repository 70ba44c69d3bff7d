//! Application configuration
//!
//! Everything except the API credential is fixed: the recording path, the
//! 24 MB chunk budget (sits under the Whisper upload ceiling), and the model
//! names. The credential comes from `OPENAI_API_KEY`; `main` loads a `.env`
//! file first for development convenience.

use std::path::PathBuf;

use crate::audio::paths::DEFAULT_RECORDING_FILE;

pub const DEFAULT_MAX_CHUNK_MB: u64 = 24;
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub recording_path: PathBuf,
    pub max_chunk_mb: u64,
    pub chat_model: String,
    pub transcription_model: String,
}

#[derive(Debug)]
pub struct MissingApiKey;

impl std::fmt::Display for MissingApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "API key not found. Make sure OPENAI_API_KEY is set in your .env file."
        )
    }
}

impl std::error::Error for MissingApiKey {}

impl AppConfig {
    /// Build the configuration, reading the credential from the environment.
    pub fn from_env() -> Result<Self, MissingApiKey> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(MissingApiKey)?;

        Ok(Self {
            api_key,
            recording_path: PathBuf::from(DEFAULT_RECORDING_FILE),
            max_chunk_mb: DEFAULT_MAX_CHUNK_MB,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        })
    }
}
