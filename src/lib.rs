//! Voice-driven query assistant
//!
//! Records microphone audio until the stop key is pressed, splits the
//! recording into upload-sized chunks, transcribes them in order, optionally
//! folds in the current clipboard contents, sends the composed prompt to a
//! chat model, and prints the response.

pub mod audio;
pub mod chat;
pub mod clipboard;
pub mod compose;
pub mod config;
pub mod hotkey;
pub mod pipeline;
pub mod state_machine;
pub mod transcription;

mod effects;
mod shell;

use std::sync::Arc;

use evdev::Key;
use tokio::sync::{mpsc, watch};

use chat::ChatClient;
use config::AppConfig;
use effects::{EffectRunner, SessionEffectRunner};
use hotkey::StopKeyListener;
use shell::clipboard_preview;
use state_machine::{reduce, Effect, Event, State};
use transcription::WhisperClient;

/// Snapshot of the session state for the shell. Carries only what the
/// console needs to render.
#[derive(Debug, Clone)]
pub enum UiState {
    Idle,
    Arming,
    Recording,
    Transcribing,
    AwaitingClipboardChoice { preview: String },
    Processing,
    ShowingResult { text: String },
}

fn state_to_ui(state: &State) -> UiState {
    match state {
        State::Idle => UiState::Idle,
        State::Arming { .. } => UiState::Arming,
        State::Recording { .. } => UiState::Recording,
        State::Transcribing { .. } => UiState::Transcribing,
        State::AwaitingClipboardChoice { clipboard, .. } => UiState::AwaitingClipboardChoice {
            preview: clipboard_preview(clipboard),
        },
        State::Processing { .. } => UiState::Processing,
        State::ShowingResult { text, .. } => UiState::ShowingResult { text: text.clone() },
    }
}

/// Run the main state loop
async fn run_state_loop(
    mut rx: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    ui_tx: watch::Sender<UiState>,
    effect_runner: Arc<dyn EffectRunner>,
) {
    let mut state = State::default();
    tracing::info!("State loop started");

    while let Some(event) = rx.recv().await {
        tracing::debug!("Received event: {:?}", event);

        // Handle Exit at the edge
        if matches!(event, Event::Exit) {
            tracing::info!("Exit requested, shutting down state loop");
            break;
        }

        let old_discriminant = std::mem::discriminant(&state);
        let (next, effects) = reduce(&state, event);
        let new_discriminant = std::mem::discriminant(&next);

        if old_discriminant != new_discriminant {
            tracing::info!("State transition: {:?} -> {:?}", state, next);
        }

        state = next;

        for eff in effects {
            match eff {
                Effect::EmitUi => {
                    let _ = ui_tx.send(state_to_ui(&state));
                }
                other => effect_runner.spawn(other, tx.clone()),
            }
        }
    }

    tracing::info!("State loop ended");
}

/// Run one full session: record, transcribe, ask, print.
pub async fn run() -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|e| e.to_string())?;

    let stt = Arc::new(
        WhisperClient::new(config.api_key.clone(), config.transcription_model.clone())
            .map_err(|e| e.to_string())?,
    );
    let chat = Arc::new(
        ChatClient::new(config.api_key.clone(), config.chat_model.clone())
            .map_err(|e| e.to_string())?,
    );

    let runner: Arc<dyn EffectRunner> = SessionEffectRunner::new(config, stt, chat);

    let (tx, rx) = mpsc::channel::<Event>(32);
    let (ui_tx, ui_rx) = watch::channel(UiState::Idle);

    let loop_handle = tokio::spawn(run_state_loop(rx, tx.clone(), ui_tx, runner));

    // The listener must be up before recording starts or the user has no
    // way to stop. Keep the handle alive for the whole session.
    let _listener = StopKeyListener::start(tx.clone(), Key::KEY_SPACE)?;

    tx.send(Event::StartRequested)
        .await
        .map_err(|e| e.to_string())?;

    shell::run_shell(ui_rx, tx).await;

    let _ = loop_handle.await;
    Ok(())
}
