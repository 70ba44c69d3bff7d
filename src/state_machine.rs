//! Session state machine
//!
//! Implements the recording workflow using a single-writer pattern: every
//! transition goes through `reduce()`, which returns the next state and a
//! list of effects for the runner to execute. The worker-side events carry
//! the session id so results from an abandoned session are dropped instead
//! of corrupting the current one.

use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use crate::clipboard::ClipboardPayload;

/// Authoritative state of the session workflow.
#[derive(Debug, Clone)]
pub enum State {
    Idle,
    /// Capture requested, waiting for the input stream to come up.
    Arming {
        session_id: Uuid,
        clipboard: Option<ClipboardPayload>,
    },
    Recording {
        session_id: Uuid,
        wav_path: PathBuf,
        started_at: Instant,
        clipboard: Option<ClipboardPayload>,
    },
    /// Stop key pressed; capture is finalizing and chunks are uploading.
    Transcribing {
        session_id: Uuid,
        clipboard: Option<ClipboardPayload>,
    },
    AwaitingClipboardChoice {
        session_id: Uuid,
        transcript: String,
        clipboard: ClipboardPayload,
    },
    /// Chat query in flight.
    Processing {
        session_id: Uuid,
    },
    /// Terminal for the session: the model response or an error message,
    /// rendered in the same region either way.
    ShowingResult {
        session_id: Uuid,
        text: String,
    },
}

impl Default for State {
    fn default() -> Self {
        State::Idle
    }
}

/// Events that can trigger state transitions. User-driven events carry no
/// session id; worker completion events do.
#[derive(Debug, Clone)]
pub enum Event {
    /// Start a new session (shell, at launch)
    StartRequested,
    /// The designated stop key was pressed
    StopRequested,
    /// User answered the clipboard-inclusion prompt
    ClipboardChoiceMade { include: bool },
    /// Application exit requested
    Exit,

    // Worker events
    CaptureStarted { id: Uuid, wav_path: PathBuf },
    CaptureFailed { id: Uuid, message: String },
    ClipboardRead { id: Uuid, payload: ClipboardPayload },
    TranscriptReady { id: Uuid, transcript: String },
    ResponseReceived { id: Uuid, text: String },
    /// Segmentation, transcription or chat failed; `message` is the display
    /// text shown in place of the result.
    PipelineFailed { id: Uuid, message: String },
}

/// Effects to be executed after a state transition.
#[derive(Debug, Clone)]
pub enum Effect {
    ReadClipboard {
        id: Uuid,
    },
    StartCapture {
        id: Uuid,
    },
    /// Stop capture, then segment and transcribe the finished recording.
    StopCapture {
        id: Uuid,
    },
    QueryModel {
        id: Uuid,
        transcript: String,
        clipboard: ClipboardPayload,
        include: bool,
    },
    /// Signal the shell to re-render
    EmitUi,
}

/// Reducer function: (state, event) -> (next_state, effects)
///
/// Key rules:
/// - Never mutate state directly
/// - Ignore events with stale session ids
/// - Emit EmitUi after visible state changes
pub fn reduce(state: &State, event: Event) -> (State, Vec<Effect>) {
    use Effect::*;
    use Event::*;
    use State::*;

    let current_id: Option<Uuid> = match state {
        Idle => None,
        Arming { session_id, .. }
        | Recording { session_id, .. }
        | Transcribing { session_id, .. }
        | AwaitingClipboardChoice { session_id, .. }
        | Processing { session_id }
        | ShowingResult { session_id, .. } => Some(*session_id),
    };

    let is_stale = |eid: Uuid| Some(eid) != current_id;

    match (state, event) {
        // -----------------
        // Idle
        // -----------------
        (Idle, StartRequested) => {
            let id = Uuid::new_v4();
            (
                Arming {
                    session_id: id,
                    clipboard: None,
                },
                vec![ReadClipboard { id }, StartCapture { id }, EmitUi],
            )
        }

        // -----------------
        // Arming
        // -----------------
        (
            Arming {
                session_id,
                clipboard,
            },
            CaptureStarted { id, wav_path },
        ) if *session_id == id => (
            Recording {
                session_id: id,
                wav_path,
                started_at: Instant::now(),
                clipboard: clipboard.clone(),
            },
            vec![EmitUi],
        ),
        (Arming { session_id, .. }, CaptureFailed { id, message }) if *session_id == id => (
            ShowingResult {
                session_id: id,
                text: message,
            },
            vec![EmitUi],
        ),

        // Clipboard result can land any time before the inclusion prompt.
        // It causes no visible change, so no EmitUi.
        (Arming { session_id, .. }, ClipboardRead { id, payload }) if *session_id == id => (
            Arming {
                session_id: id,
                clipboard: Some(payload),
            },
            vec![],
        ),
        (
            Recording {
                session_id,
                wav_path,
                started_at,
                ..
            },
            ClipboardRead { id, payload },
        ) if *session_id == id => (
            Recording {
                session_id: id,
                wav_path: wav_path.clone(),
                started_at: *started_at,
                clipboard: Some(payload),
            },
            vec![],
        ),
        (Transcribing { session_id, .. }, ClipboardRead { id, payload }) if *session_id == id => (
            Transcribing {
                session_id: id,
                clipboard: Some(payload),
            },
            vec![],
        ),

        // -----------------
        // Recording
        // -----------------
        (
            Recording {
                session_id,
                clipboard,
                ..
            },
            StopRequested,
        ) => (
            Transcribing {
                session_id: *session_id,
                clipboard: clipboard.clone(),
            },
            vec![StopCapture { id: *session_id }, EmitUi],
        ),

        // -----------------
        // Transcribing
        // -----------------
        (
            Transcribing {
                session_id,
                clipboard,
            },
            TranscriptReady { id, transcript },
        ) if *session_id == id => (
            AwaitingClipboardChoice {
                session_id: id,
                transcript,
                clipboard: clipboard.clone().unwrap_or(ClipboardPayload::Empty),
            },
            vec![EmitUi],
        ),
        (Transcribing { session_id, .. }, PipelineFailed { id, message }) if *session_id == id => (
            ShowingResult {
                session_id: id,
                text: message,
            },
            vec![EmitUi],
        ),

        // -----------------
        // AwaitingClipboardChoice
        // -----------------
        (
            AwaitingClipboardChoice {
                session_id,
                transcript,
                clipboard,
            },
            ClipboardChoiceMade { include },
        ) => (
            Processing {
                session_id: *session_id,
            },
            vec![
                QueryModel {
                    id: *session_id,
                    transcript: transcript.clone(),
                    clipboard: clipboard.clone(),
                    include,
                },
                EmitUi,
            ],
        ),

        // -----------------
        // Processing
        // -----------------
        (Processing { session_id }, ResponseReceived { id, text }) if *session_id == id => (
            ShowingResult {
                session_id: id,
                text,
            },
            vec![EmitUi],
        ),
        (Processing { session_id }, PipelineFailed { id, message }) if *session_id == id => (
            ShowingResult {
                session_id: id,
                text: message,
            },
            vec![EmitUi],
        ),

        // -----------------
        // Stale events (drop silently)
        // -----------------
        (_, CaptureStarted { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, CaptureFailed { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, ClipboardRead { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, TranscriptReady { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, ResponseReceived { id, .. }) if is_stale(id) => (state.clone(), vec![]),
        (_, PipelineFailed { id, .. }) if is_stale(id) => (state.clone(), vec![]),

        // -----------------
        // Unhandled: no transition
        // -----------------
        _ => (state.clone(), vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_state(id: Uuid) -> State {
        State::Recording {
            session_id: id,
            wav_path: PathBuf::from("/tmp/output.wav"),
            started_at: Instant::now(),
            clipboard: None,
        }
    }

    #[test]
    fn start_requested_arms_capture_and_reads_clipboard() {
        let (next, effects) = reduce(&State::Idle, Event::StartRequested);
        assert!(matches!(next, State::Arming { .. }));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::StartCapture { .. })));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ReadClipboard { .. })));
        assert!(effects.iter().any(|e| matches!(e, Effect::EmitUi)));
    }

    #[test]
    fn capture_started_transitions_to_recording() {
        let id = Uuid::new_v4();
        let state = State::Arming {
            session_id: id,
            clipboard: None,
        };
        let (next, effects) = reduce(
            &state,
            Event::CaptureStarted {
                id,
                wav_path: PathBuf::from("/tmp/output.wav"),
            },
        );
        assert!(matches!(next, State::Recording { .. }));
        assert!(effects.iter().any(|e| matches!(e, Effect::EmitUi)));
    }

    #[test]
    fn capture_failure_lands_in_result_region() {
        let id = Uuid::new_v4();
        let state = State::Arming {
            session_id: id,
            clipboard: None,
        };
        let (next, _) = reduce(
            &state,
            Event::CaptureFailed {
                id,
                message: "No audio input device found".into(),
            },
        );
        assert!(
            matches!(next, State::ShowingResult { text, .. } if text.contains("No audio input"))
        );
    }

    #[test]
    fn stale_event_is_ignored() {
        let id = Uuid::new_v4();
        let state = State::Arming {
            session_id: id,
            clipboard: None,
        };
        let (next, effects) = reduce(
            &state,
            Event::CaptureStarted {
                id: Uuid::new_v4(),
                wav_path: PathBuf::from("/tmp/output.wav"),
            },
        );
        assert!(matches!(next, State::Arming { .. }));
        assert!(effects.is_empty());
    }

    #[test]
    fn stop_during_recording_starts_transcription() {
        let id = Uuid::new_v4();
        let (next, effects) = reduce(&recording_state(id), Event::StopRequested);
        assert!(matches!(next, State::Transcribing { .. }));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::StopCapture { id: eid } if *eid == id)));
    }

    #[test]
    fn stop_is_ignored_outside_recording() {
        let (next, effects) = reduce(&State::Idle, Event::StopRequested);
        assert!(matches!(next, State::Idle));
        assert!(effects.is_empty());

        let id = Uuid::new_v4();
        let (next, effects) = reduce(&State::Processing { session_id: id }, Event::StopRequested);
        assert!(matches!(next, State::Processing { .. }));
        assert!(effects.is_empty());
    }

    #[test]
    fn clipboard_read_is_carried_through_to_choice() {
        let id = Uuid::new_v4();
        let payload = ClipboardPayload::Text("copied".into());

        let (next, effects) = reduce(
            &recording_state(id),
            Event::ClipboardRead {
                id,
                payload: payload.clone(),
            },
        );
        // No visible change yet
        assert!(effects.is_empty());

        let (next, _) = reduce(&next, Event::StopRequested);
        let (next, _) = reduce(
            &next,
            Event::TranscriptReady {
                id,
                transcript: "hello".into(),
            },
        );
        assert!(matches!(
            next,
            State::AwaitingClipboardChoice { clipboard, .. } if clipboard == payload
        ));
    }

    #[test]
    fn missing_clipboard_defaults_to_empty_at_choice_time() {
        let id = Uuid::new_v4();
        let state = State::Transcribing {
            session_id: id,
            clipboard: None,
        };
        let (next, _) = reduce(
            &state,
            Event::TranscriptReady {
                id,
                transcript: "hello".into(),
            },
        );
        assert!(matches!(
            next,
            State::AwaitingClipboardChoice { clipboard: ClipboardPayload::Empty, .. }
        ));
    }

    #[test]
    fn choice_dispatches_query_with_transcript_and_clipboard() {
        let id = Uuid::new_v4();
        let state = State::AwaitingClipboardChoice {
            session_id: id,
            transcript: "do the thing".into(),
            clipboard: ClipboardPayload::Text("context".into()),
        };
        let (next, effects) = reduce(&state, Event::ClipboardChoiceMade { include: true });

        assert!(matches!(next, State::Processing { .. }));
        let query = effects
            .iter()
            .find_map(|e| match e {
                Effect::QueryModel {
                    transcript,
                    clipboard,
                    include,
                    ..
                } => Some((transcript.clone(), clipboard.clone(), *include)),
                _ => None,
            })
            .expect("QueryModel effect");
        assert_eq!(query.0, "do the thing");
        assert_eq!(query.1, ClipboardPayload::Text("context".into()));
        assert!(query.2);
    }

    #[test]
    fn response_ends_in_showing_result() {
        let id = Uuid::new_v4();
        let (next, _) = reduce(
            &State::Processing { session_id: id },
            Event::ResponseReceived {
                id,
                text: "42".into(),
            },
        );
        assert!(matches!(next, State::ShowingResult { text, .. } if text == "42"));
    }

    #[test]
    fn pipeline_failure_shows_error_text_in_result_region() {
        let id = Uuid::new_v4();
        let state = State::Transcribing {
            session_id: id,
            clipboard: None,
        };
        let (next, _) = reduce(
            &state,
            Event::PipelineFailed {
                id,
                message: "Error during transcription: network down".into(),
            },
        );
        assert!(matches!(
            next,
            State::ShowingResult { text, .. } if text.starts_with("Error during transcription")
        ));
    }
}
