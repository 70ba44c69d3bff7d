//! Speech-to-text boundary
//!
//! The pipeline depends on the `SpeechToText` trait rather than a concrete
//! client so tests can substitute a stub without touching the network.

mod openai;

use std::future::Future;
use std::path::Path;

pub use openai::{TranscriptionError, WhisperClient};

/// One WAV file in, transcript text out.
pub trait SpeechToText: Send + Sync + 'static {
    fn transcribe(
        &self,
        wav_path: &Path,
    ) -> impl Future<Output = Result<String, TranscriptionError>> + Send;
}
