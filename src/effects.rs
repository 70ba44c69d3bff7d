//! Effect runner
//!
//! Executes the effects produced by the state machine: clipboard capture,
//! audio capture start/stop, the segmentation-and-transcription pipeline,
//! and the chat query. Completion events are sent back over the event
//! channel with the session id attached.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::audio::paths::clipboard_image_path;
use crate::audio::recorder::{AudioRecorder, RecordingHandle};
use crate::chat::ChatModel;
use crate::clipboard::{self, ClipboardPayload};
use crate::config::AppConfig;
use crate::pipeline;
use crate::state_machine::{Effect, Event};
use crate::transcription::SpeechToText;

/// Trait for running effects asynchronously.
/// Completion events are sent back via the provided channel.
pub trait EffectRunner: Send + Sync + 'static {
    fn spawn(&self, effect: Effect, tx: mpsc::Sender<Event>);
}

/// Production effect runner. The recorder is created lazily so a missing
/// audio device surfaces as a capture failure instead of a startup crash;
/// the active recording handle lives here between StartCapture and
/// StopCapture.
pub struct SessionEffectRunner<S, C> {
    config: AppConfig,
    recorder: Arc<Mutex<Option<AudioRecorder>>>,
    active: Arc<Mutex<Option<(Uuid, RecordingHandle)>>>,
    stt: Arc<S>,
    chat: Arc<C>,
}

impl<S: SpeechToText, C: ChatModel> SessionEffectRunner<S, C> {
    pub fn new(config: AppConfig, stt: Arc<S>, chat: Arc<C>) -> Arc<Self> {
        let recorder = match AudioRecorder::new() {
            Ok(r) => {
                tracing::info!("Audio recorder initialized");
                Some(r)
            }
            Err(e) => {
                tracing::warn!("Audio recorder init failed (will retry on capture): {}", e);
                None
            }
        };

        Arc::new(Self {
            config,
            recorder: Arc::new(Mutex::new(recorder)),
            active: Arc::new(Mutex::new(None)),
            stt,
            chat,
        })
    }
}

impl<S: SpeechToText, C: ChatModel> EffectRunner for SessionEffectRunner<S, C> {
    fn spawn(&self, effect: Effect, tx: mpsc::Sender<Event>) {
        match effect {
            Effect::ReadClipboard { id } => {
                let image_out = clipboard_image_path(&self.config.recording_path);

                tokio::spawn(async move {
                    // arboard wants its own thread on some platforms
                    let result =
                        tokio::task::spawn_blocking(move || clipboard::capture(&image_out)).await;

                    let payload = match result {
                        Ok(Ok(payload)) => payload,
                        Ok(Err(e)) => {
                            tracing::warn!("Clipboard capture failed, treating as empty: {}", e);
                            ClipboardPayload::Empty
                        }
                        Err(e) => {
                            tracing::warn!("Clipboard task failed, treating as empty: {}", e);
                            ClipboardPayload::Empty
                        }
                    };

                    let _ = tx.send(Event::ClipboardRead { id, payload }).await;
                });
            }

            Effect::StartCapture { id } => {
                let recorder = self.recorder.clone();
                let active = self.active.clone();
                let out_path = self.config.recording_path.clone();

                tokio::spawn(async move {
                    // Hold the lock across start so two sessions cannot open
                    // the output file at once; start itself does not block on
                    // audio, only on file creation.
                    let start_result = {
                        let mut guard = recorder.lock().await;
                        if guard.is_none() {
                            match AudioRecorder::new() {
                                Ok(r) => *guard = Some(r),
                                Err(e) => {
                                    tracing::error!("Audio recorder unavailable: {}", e);
                                }
                            }
                        }
                        match guard.as_ref() {
                            Some(rec) => rec.start(out_path.clone()).map_err(|e| e.to_string()),
                            None => Err("Audio recorder unavailable".to_string()),
                        }
                    };

                    match start_result {
                        Ok(handle) => {
                            tracing::info!("Recording started: {}", out_path.display());
                            {
                                let mut active_guard = active.lock().await;
                                *active_guard = Some((id, handle));
                            }
                            let _ = tx
                                .send(Event::CaptureStarted {
                                    id,
                                    wav_path: out_path,
                                })
                                .await;
                        }
                        Err(err) => {
                            tracing::error!("Failed to start recording: {}", err);
                            let _ = tx
                                .send(Event::CaptureFailed {
                                    id,
                                    message: format!("Failed to start recording: {}", err),
                                })
                                .await;
                        }
                    }
                });
            }

            Effect::StopCapture { id } => {
                let active = self.active.clone();
                let stt = self.stt.clone();
                let max_chunk_mb = self.config.max_chunk_mb;

                tokio::spawn(async move {
                    let handle = {
                        let mut guard = active.lock().await;
                        match guard.take() {
                            Some((hid, handle)) if hid == id => Some(handle),
                            other => {
                                // Not ours; put it back
                                *guard = other;
                                None
                            }
                        }
                    };

                    let Some(handle) = handle else {
                        tracing::warn!("StopCapture: no active recording for id={}", id);
                        let _ = tx
                            .send(Event::PipelineFailed {
                                id,
                                message: "Error during transcription: no active recording"
                                    .to_string(),
                            })
                            .await;
                        return;
                    };

                    // stop() blocks on the capture thread finalizing the WAV
                    let stop_result = tokio::task::spawn_blocking(move || handle.stop()).await;

                    let wav_path = match stop_result {
                        Ok(Ok(path)) => path,
                        Ok(Err(e)) => {
                            tracing::error!("Failed to stop recording: {}", e);
                            let _ = tx
                                .send(Event::PipelineFailed {
                                    id,
                                    message: format!("Error during transcription: {}", e),
                                })
                                .await;
                            return;
                        }
                        Err(e) => {
                            let _ = tx
                                .send(Event::PipelineFailed {
                                    id,
                                    message: format!("Error during transcription: {}", e),
                                })
                                .await;
                            return;
                        }
                    };

                    tracing::info!("Recording stopped: {}", wav_path.display());

                    match pipeline::transcribe_recording(stt.as_ref(), &wav_path, max_chunk_mb)
                        .await
                    {
                        Ok(transcript) => {
                            tracing::info!("Transcription complete: {} chars", transcript.len());
                            let _ = tx.send(Event::TranscriptReady { id, transcript }).await;
                        }
                        Err(e) => {
                            tracing::error!("Transcription failed: {}", e);
                            let _ = tx
                                .send(Event::PipelineFailed {
                                    id,
                                    message: format!("Error during transcription: {}", e),
                                })
                                .await;
                        }
                    }
                });
            }

            Effect::QueryModel {
                id,
                transcript,
                clipboard,
                include,
            } => {
                let chat = self.chat.clone();

                tokio::spawn(async move {
                    match pipeline::query_model(chat.as_ref(), &transcript, &clipboard, include)
                        .await
                    {
                        Ok(text) => {
                            let _ = tx.send(Event::ResponseReceived { id, text }).await;
                        }
                        Err(e) => {
                            tracing::error!("Chat query failed: {}", e);
                            let _ = tx
                                .send(Event::PipelineFailed {
                                    id,
                                    message: format!("Error calling LLM: {}", e),
                                })
                                .await;
                        }
                    }
                });
            }

            Effect::EmitUi => {
                // Handled in the main loop, not here
                unreachable!("EmitUi should be handled in run_state_loop");
            }
        }
    }
}
