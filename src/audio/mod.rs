//! Audio capture and segmentation
//!
//! Microphone input is captured with CPAL and written as 16-bit WAV via
//! hound; finished recordings are split into upload-sized chunks by the
//! segmenter.

pub mod paths;
pub mod recorder;
pub mod segmenter;

pub use paths::{chunk_path, clipboard_image_path, DEFAULT_RECORDING_FILE};
pub use recorder::{AudioError, AudioRecorder, RecordingHandle};
pub use segmenter::{split_wav, SegmentError};
