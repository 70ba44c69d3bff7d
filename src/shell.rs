//! Console shell
//!
//! Renders the session state to stdout and collects the one piece of user
//! input the workflow needs: the clipboard-inclusion choice. The shell only
//! observes `UiState` snapshots; it never touches the state machine's
//! internal state directly.

use tokio::sync::{mpsc, watch};

use crate::clipboard::ClipboardPayload;
use crate::state_machine::Event;
use crate::UiState;

const PREVIEW_MAX_CHARS: usize = 200;

/// Short description of the clipboard payload shown before the
/// inclusion prompt.
pub fn clipboard_preview(payload: &ClipboardPayload) -> String {
    match payload {
        ClipboardPayload::Text(text) => {
            let mut preview: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
            if text.chars().count() > PREVIEW_MAX_CHARS {
                preview.push_str("...");
            }
            preview
        }
        ClipboardPayload::Image(path) => format!("[image saved to {}]", path.display()),
        ClipboardPayload::Empty => "[No content]".to_string(),
    }
}

/// Read one line from stdin without blocking the runtime.
async fn read_line() -> String {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        line
    })
    .await
    .unwrap_or_default()
}

/// Drive the console until the session shows its result.
///
/// Returns when `ShowingResult` has been rendered; the caller tears the
/// event loop down afterwards.
pub async fn run_shell(mut ui_rx: watch::Receiver<UiState>, tx: mpsc::Sender<Event>) {
    loop {
        let snapshot = ui_rx.borrow_and_update().clone();

        match snapshot {
            UiState::Idle => {}
            UiState::Arming => println!("Preparing audio capture..."),
            UiState::Recording => println!("Recording. Press Space when you are done speaking."),
            UiState::Transcribing => println!("Transcribing..."),
            UiState::AwaitingClipboardChoice { preview } => {
                println!("\nClipboard: {}", preview);
                print!("Include clipboard content in the request? [y/N] ");
                use std::io::Write as _;
                let _ = std::io::stdout().flush();

                let answer = read_line().await;
                let include = matches!(answer.trim(), "y" | "Y" | "yes" | "Yes");
                let _ = tx.send(Event::ClipboardChoiceMade { include }).await;
            }
            UiState::Processing => println!("Waiting for the model..."),
            UiState::ShowingResult { text } => {
                println!("\n{}", text);
                let _ = tx.send(Event::Exit).await;
                return;
            }
        }

        if ui_rx.changed().await.is_err() {
            // State loop went away
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn empty_clipboard_previews_as_no_content() {
        assert_eq!(clipboard_preview(&ClipboardPayload::Empty), "[No content]");
    }

    #[test]
    fn long_text_preview_is_truncated() {
        let text = "x".repeat(500);
        let preview = clipboard_preview(&ClipboardPayload::Text(text));
        assert!(preview.starts_with("xxx"));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 3);
    }

    #[test]
    fn short_text_preview_is_untouched() {
        let preview = clipboard_preview(&ClipboardPayload::Text("hello".into()));
        assert_eq!(preview, "hello");
    }

    #[test]
    fn image_preview_names_the_file() {
        let preview =
            clipboard_preview(&ClipboardPayload::Image(PathBuf::from("clipboard_image.png")));
        assert!(preview.contains("clipboard_image.png"));
    }
}
