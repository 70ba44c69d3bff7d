//! Session file locations
//!
//! Everything a session writes lands next to the recording: the capture at
//! `output.wav`, chunks as `output_chunk{N}.wav`, and a clipboard image as
//! `clipboard_image.png`. These names are implementation details, not a
//! persisted format.

use std::path::{Path, PathBuf};

pub const DEFAULT_RECORDING_FILE: &str = "output.wav";
pub const CLIPBOARD_IMAGE_FILE: &str = "clipboard_image.png";

/// Path for chunk `index` of the given recording, alongside the source.
pub fn chunk_path(source: &Path, index: usize) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    source.with_file_name(format!("{}_chunk{}.wav", stem, index))
}

/// Where a clipboard image is saved, next to the recording.
pub fn clipboard_image_path(recording: &Path) -> PathBuf {
    recording.with_file_name(CLIPBOARD_IMAGE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_paths_are_numbered_from_zero() {
        let source = Path::new("/tmp/output.wav");
        assert_eq!(chunk_path(source, 0), PathBuf::from("/tmp/output_chunk0.wav"));
        assert_eq!(chunk_path(source, 12), PathBuf::from("/tmp/output_chunk12.wav"));
    }

    #[test]
    fn chunk_path_keeps_source_directory() {
        let source = Path::new("recordings/session.wav");
        assert_eq!(
            chunk_path(source, 1),
            PathBuf::from("recordings/session_chunk1.wav")
        );
    }

    #[test]
    fn clipboard_image_sits_next_to_recording() {
        let source = Path::new("/tmp/output.wav");
        assert_eq!(
            clipboard_image_path(source),
            PathBuf::from("/tmp/clipboard_image.png")
        );
    }
}
