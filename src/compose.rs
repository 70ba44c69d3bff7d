//! Prompt composition
//!
//! Builds the final prompt from the combined transcript and, when the user
//! opts in, the clipboard payload. A text clipboard is prepended to the
//! framed transcript; an image clipboard rides along as an attachment for
//! the chat client to embed.

use std::path::PathBuf;

use crate::clipboard::ClipboardPayload;

/// The one prompt a session sends to the chat model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub text: String,
    pub image: Option<PathBuf>,
}

/// Frame the transcript and merge in the clipboard payload if requested.
///
/// An `Empty` payload composes the same as declining inclusion.
pub fn compose_prompt(
    transcript: &str,
    clipboard: &ClipboardPayload,
    include_clipboard: bool,
) -> ComposedPrompt {
    let framed = format!(
        "The audio transcription contains the user's request: {}",
        transcript
    );

    if !include_clipboard {
        return ComposedPrompt {
            text: framed,
            image: None,
        };
    }

    match clipboard {
        ClipboardPayload::Image(path) => ComposedPrompt {
            text: framed,
            image: Some(path.clone()),
        },
        ClipboardPayload::Text(content) => ComposedPrompt {
            text: format!(
                "Clipboard content:\n{}\n\nAudio transcription:\n{}\n",
                content, framed
            ),
            image: None,
        },
        ClipboardPayload::Empty => ComposedPrompt {
            text: framed,
            image: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declined_clipboard_sends_framed_transcript_only() {
        let prompt = compose_prompt(
            "open the pod bay doors",
            &ClipboardPayload::Text("ignored".into()),
            false,
        );
        assert_eq!(
            prompt.text,
            "The audio transcription contains the user's request: open the pod bay doors"
        );
        assert!(prompt.image.is_none());
    }

    #[test]
    fn included_text_clipboard_is_prepended() {
        let prompt = compose_prompt(
            "summarize this",
            &ClipboardPayload::Text("fn main() {}".into()),
            true,
        );
        assert!(prompt.text.starts_with("Clipboard content:\nfn main() {}\n"));
        assert!(prompt.text.contains("Audio transcription:\n"));
        assert!(prompt.text.contains("summarize this"));
        assert!(prompt.image.is_none());
    }

    #[test]
    fn included_image_clipboard_becomes_attachment() {
        let prompt = compose_prompt(
            "what is in this screenshot",
            &ClipboardPayload::Image(PathBuf::from("/tmp/clipboard_image.png")),
            true,
        );
        assert!(prompt.text.contains("what is in this screenshot"));
        assert_eq!(
            prompt.image,
            Some(PathBuf::from("/tmp/clipboard_image.png"))
        );
    }

    #[test]
    fn empty_clipboard_composes_like_declined() {
        let with = compose_prompt("hello", &ClipboardPayload::Empty, true);
        let without = compose_prompt("hello", &ClipboardPayload::Empty, false);
        assert_eq!(with, without);
    }
}
