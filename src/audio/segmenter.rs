//! WAV segmenter: splits a recording into size-bounded chunks
//!
//! The Whisper upload endpoint rejects files over 25 MB, so recordings are
//! split into independently valid WAV files before upload. Each chunk copies
//! the source header verbatim and carries a contiguous frame range; chunk N
//! is written next to the source as `{basename}_chunk{N}.wav`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::paths::chunk_path;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Errors that can occur while splitting a recording.
#[derive(Debug)]
pub enum SegmentError {
    /// The source is not a parseable WAV container.
    Format(String),
    /// The size budget cannot hold even a single frame.
    Config {
        bytes_per_frame: u64,
        max_size_bytes: u64,
    },
    /// A filesystem read or write failed. Not retried.
    Io(std::io::Error),
}

impl std::fmt::Display for SegmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentError::Format(e) => write!(f, "Unparseable WAV input: {}", e),
            SegmentError::Config {
                bytes_per_frame,
                max_size_bytes,
            } => write!(
                f,
                "Chunk budget of {} bytes cannot hold a single {}-byte frame",
                max_size_bytes, bytes_per_frame
            ),
            SegmentError::Io(e) => write!(f, "Filesystem error while writing chunk: {}", e),
        }
    }
}

impl std::error::Error for SegmentError {}

fn from_hound(e: hound::Error) -> SegmentError {
    match e {
        hound::Error::IoError(io) => SegmentError::Io(io),
        other => SegmentError::Format(other.to_string()),
    }
}

/// Split `source` into WAV chunks whose frame data fits in `max_size_mb`.
///
/// Returns chunk paths in frame order. A source that already fits produces
/// exactly one chunk; a zero-frame source produces an empty Vec and creates
/// no files. The source file is never modified or deleted, and chunks left
/// over from an earlier run are not cleaned up here.
pub fn split_wav(source: &Path, max_size_mb: u64) -> Result<Vec<PathBuf>, SegmentError> {
    let reader = WavReader::open(source).map_err(from_hound)?;
    let spec = reader.spec();

    let bytes_per_sample = u64::from(spec.bits_per_sample.div_ceil(8));
    let bytes_per_frame = bytes_per_sample * u64::from(spec.channels);
    if bytes_per_frame == 0 {
        return Err(SegmentError::Format(format!(
            "header declares {} channels at {} bits per sample",
            spec.channels, spec.bits_per_sample
        )));
    }

    let max_size_bytes = max_size_mb * BYTES_PER_MB;
    if bytes_per_frame > max_size_bytes {
        return Err(SegmentError::Config {
            bytes_per_frame,
            max_size_bytes,
        });
    }
    let frames_per_chunk = max_size_bytes / bytes_per_frame;

    let paths = match spec.sample_format {
        SampleFormat::Int => write_chunks::<i32>(reader, source, spec, frames_per_chunk)?,
        SampleFormat::Float => write_chunks::<f32>(reader, source, spec, frames_per_chunk)?,
    };

    tracing::info!(
        source = %source.display(),
        chunks = paths.len(),
        frames_per_chunk,
        "Recording segmented"
    );

    Ok(paths)
}

fn write_chunks<S: hound::Sample>(
    mut reader: WavReader<BufReader<File>>,
    source: &Path,
    spec: WavSpec,
    frames_per_chunk: u64,
) -> Result<Vec<PathBuf>, SegmentError> {
    let total_frames = u64::from(reader.duration());
    let channels = u64::from(spec.channels);

    let mut paths = Vec::new();
    let mut samples = reader.samples::<S>();
    let mut frames_written = 0u64;

    while frames_written < total_frames {
        let stride = frames_per_chunk.min(total_frames - frames_written);
        let path = chunk_path(source, paths.len());

        let mut writer = WavWriter::create(&path, spec).map_err(from_hound)?;
        for _ in 0..stride * channels {
            let sample = samples
                .next()
                .ok_or_else(|| {
                    SegmentError::Format("sample data shorter than declared frame count".into())
                })?
                .map_err(from_hound)?;
            writer.write_sample(sample).map_err(from_hound)?;
        }
        writer.finalize().map_err(from_hound)?;

        paths.push(path);
        frames_written += stride;
    }

    Ok(paths)
}
