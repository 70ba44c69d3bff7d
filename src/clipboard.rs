//! System clipboard capture
//!
//! The clipboard is read once per session, before the inclusion prompt is
//! shown. An image wins over text; image bytes are saved as a PNG so the
//! chat client can embed them later. arboard's Clipboard is not Send, so
//! callers run `capture` on a blocking thread.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// What the clipboard held when the session started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardPayload {
    Image(PathBuf),
    Text(String),
    Empty,
}

#[derive(Debug)]
pub enum ClipboardError {
    Access(String),
    ImageDecode(String),
    ImageSave(String),
}

impl std::fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipboardError::Access(e) => write!(f, "Clipboard access failed: {}", e),
            ClipboardError::ImageDecode(e) => write!(f, "Clipboard image not decodable: {}", e),
            ClipboardError::ImageSave(e) => write!(f, "Failed to save clipboard image: {}", e),
        }
    }
}

impl std::error::Error for ClipboardError {}

/// Read the clipboard, saving an image payload to `image_out` as PNG.
pub fn capture(image_out: &Path) -> Result<ClipboardPayload, ClipboardError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;

    match clipboard.get_image() {
        Ok(img) => {
            let path = save_image(img.width, img.height, img.bytes, image_out)?;
            tracing::info!("Clipboard image saved to {:?}", path);
            Ok(ClipboardPayload::Image(path))
        }
        Err(arboard::Error::ContentNotAvailable) => read_text(&mut clipboard),
        Err(e) => Err(ClipboardError::Access(e.to_string())),
    }
}

fn read_text(clipboard: &mut arboard::Clipboard) -> Result<ClipboardPayload, ClipboardError> {
    match clipboard.get_text() {
        Ok(text) if !text.is_empty() => {
            tracing::info!("Clipboard text captured ({} chars)", text.len());
            Ok(ClipboardPayload::Text(text))
        }
        Ok(_) | Err(arboard::Error::ContentNotAvailable) => Ok(ClipboardPayload::Empty),
        Err(e) => Err(ClipboardError::Access(e.to_string())),
    }
}

fn save_image(
    width: usize,
    height: usize,
    rgba: Cow<'_, [u8]>,
    out: &Path,
) -> Result<PathBuf, ClipboardError> {
    let buffer = image::RgbaImage::from_raw(width as u32, height as u32, rgba.into_owned())
        .ok_or_else(|| {
            ClipboardError::ImageDecode(format!("{}x{} buffer has wrong length", width, height))
        })?;

    buffer
        .save(out)
        .map_err(|e| ClipboardError::ImageSave(e.to_string()))?;

    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_image_rejects_mismatched_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clip.png");
        // 2x2 RGBA needs 16 bytes
        let err = save_image(2, 2, Cow::Owned(vec![0u8; 8]), &out).unwrap_err();
        assert!(matches!(err, ClipboardError::ImageDecode(_)));
        assert!(!out.exists());
    }

    #[test]
    fn save_image_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clip.png");
        let path = save_image(2, 2, Cow::Owned(vec![255u8; 16]), &out).unwrap();
        assert_eq!(path, out);
        assert!(out.exists());
    }
}
