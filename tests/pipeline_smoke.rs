//! End-to-end pipeline test with stubbed network clients.
//!
//! Exercises the real segmenter against real WAV files, with the
//! speech-to-text and chat boundaries replaced by stubs so nothing leaves
//! the process.

use std::path::{Path, PathBuf};

use voxquery::chat::{ChatError, ChatModel};
use voxquery::clipboard::ClipboardPayload;
use voxquery::compose::ComposedPrompt;
use voxquery::pipeline::{query_model, transcribe_recording};
use voxquery::transcription::{SpeechToText, TranscriptionError};

/// Returns the chunk's file stem as its "transcript" so ordering is
/// observable in the joined output.
struct StemEchoStt;

impl SpeechToText for StemEchoStt {
    async fn transcribe(&self, wav_path: &Path) -> Result<String, TranscriptionError> {
        Ok(wav_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("?")
            .to_string())
    }
}

/// Echoes the composed prompt back so tests can inspect exactly what would
/// have been sent.
struct EchoChat;

impl ChatModel for EchoChat {
    async fn complete(&self, prompt: &ComposedPrompt) -> Result<String, ChatError> {
        Ok(prompt.text.clone())
    }
}

fn write_wav(path: &PathBuf, frames: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample((i % 251) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn multi_chunk_recording_joins_fragments_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("output.wav");
    // 600k frames at 2 bytes/frame with a 1 MB budget splits into two chunks
    write_wav(&wav, 600_000);

    let transcript = transcribe_recording(&StemEchoStt, &wav, 1).await.unwrap();

    assert_eq!(transcript, "output_chunk0\noutput_chunk1");
}

#[tokio::test]
async fn single_chunk_recording_has_no_joiner() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("output.wav");
    write_wav(&wav, 1_000);

    let transcript = transcribe_recording(&StemEchoStt, &wav, 24).await.unwrap();

    assert_eq!(transcript, "output_chunk0");
}

#[tokio::test]
async fn empty_recording_yields_empty_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("output.wav");
    write_wav(&wav, 0);

    let transcript = transcribe_recording(&StemEchoStt, &wav, 24).await.unwrap();

    assert_eq!(transcript, "");
}

#[tokio::test]
async fn query_includes_clipboard_text_only_when_requested() {
    let clipboard = ClipboardPayload::Text("let x = 1;".to_string());

    let with = query_model(&EchoChat, "explain this", &clipboard, true)
        .await
        .unwrap();
    assert!(with.starts_with("Clipboard content:\nlet x = 1;"));
    assert!(with.contains("explain this"));

    let without = query_model(&EchoChat, "explain this", &clipboard, false)
        .await
        .unwrap();
    assert!(!without.contains("let x = 1;"));
    assert_eq!(
        without,
        "The audio transcription contains the user's request: explain this"
    );
}

#[tokio::test]
async fn recording_to_response_flows_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("output.wav");
    write_wav(&wav, 600_000);

    let transcript = transcribe_recording(&StemEchoStt, &wav, 1).await.unwrap();
    let response = query_model(&EchoChat, &transcript, &ClipboardPayload::Empty, true)
        .await
        .unwrap();

    // Fragment order survives all the way into the outgoing prompt
    let chunk0 = response.find("output_chunk0").unwrap();
    let chunk1 = response.find("output_chunk1").unwrap();
    assert!(chunk0 < chunk1);
}
