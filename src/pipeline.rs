//! Post-recording pipeline
//!
//! Fixed call order, preserved from the session design: segmentation runs to
//! completion before the first transcription call; chunks are transcribed
//! strictly sequentially in segment order; fragments are newline-joined in
//! that same order before anything is sent to the chat model. There is no
//! retry at any step.

use std::path::{Path, PathBuf};

use crate::audio::segmenter::{split_wav, SegmentError};
use crate::chat::{ChatError, ChatModel};
use crate::clipboard::ClipboardPayload;
use crate::compose::compose_prompt;
use crate::transcription::{SpeechToText, TranscriptionError};

#[derive(Debug)]
pub enum PipelineError {
    Segment(SegmentError),
    Transcription(TranscriptionError),
    Chat(ChatError),
    /// The segmentation task was cancelled or panicked.
    TaskFailed(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Segment(e) => write!(f, "{}", e),
            PipelineError::Transcription(e) => write!(f, "{}", e),
            PipelineError::Chat(e) => write!(f, "{}", e),
            PipelineError::TaskFailed(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Split the recording and transcribe every chunk, in order.
///
/// Returns the combined transcript. A zero-frame recording produces zero
/// chunks and therefore an empty transcript; the session still proceeds so
/// the user sees what happened instead of a crash.
pub async fn transcribe_recording<S: SpeechToText>(
    stt: &S,
    wav_path: &Path,
    max_chunk_mb: u64,
) -> Result<String, PipelineError> {
    let source = wav_path.to_path_buf();
    let chunks: Vec<PathBuf> =
        tokio::task::spawn_blocking(move || split_wav(&source, max_chunk_mb))
            .await
            .map_err(|e| PipelineError::TaskFailed(e.to_string()))?
            .map_err(PipelineError::Segment)?;

    let mut fragments = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        tracing::debug!(index, chunk = %chunk.display(), "Transcribing chunk");
        let text = stt
            .transcribe(chunk)
            .await
            .map_err(PipelineError::Transcription)?;
        fragments.push(text);
    }

    Ok(fragments.join("\n"))
}

/// Compose the prompt and ask the chat model. Exactly one call, no retry.
pub async fn query_model<C: ChatModel>(
    chat: &C,
    transcript: &str,
    clipboard: &ClipboardPayload,
    include_clipboard: bool,
) -> Result<String, PipelineError> {
    let prompt = compose_prompt(transcript, clipboard, include_clipboard);
    chat.complete(&prompt).await.map_err(PipelineError::Chat)
}
