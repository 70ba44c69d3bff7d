//! Microphone capture using CPAL, written to WAV via hound
//!
//! The cpal stream is not Send, so each recording runs on a dedicated audio
//! thread that owns the stream for its whole lifetime. The returned
//! `RecordingHandle` is Send and stops the capture through a cancellation
//! token rather than a shared mutable flag.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use hound::{WavSpec, WavWriter};
use tokio_util::sync::CancellationToken;

type SharedWriter = Arc<Mutex<Option<WavWriter<BufWriter<File>>>>>;

/// Errors that can occur during audio capture.
#[derive(Debug, Clone)]
pub enum AudioError {
    NoInputDevice,
    NoSupportedConfig,
    StreamCreationFailed(String),
    FileCreationFailed(String),
    WriteFailed(String),
    WorkerGone,
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::NoInputDevice => write!(f, "No audio input device found"),
            AudioError::NoSupportedConfig => write!(f, "No supported audio configuration"),
            AudioError::StreamCreationFailed(e) => {
                write!(f, "Failed to create audio stream: {}", e)
            }
            AudioError::FileCreationFailed(e) => write!(f, "Failed to create WAV file: {}", e),
            AudioError::WriteFailed(e) => write!(f, "Failed to write audio data: {}", e),
            AudioError::WorkerGone => write!(f, "Audio capture thread exited unexpectedly"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Handle to an active recording. Stopping cancels the capture thread and
/// waits for the WAV file to be finalized.
pub struct RecordingHandle {
    stop: CancellationToken,
    done_rx: Receiver<Result<PathBuf, AudioError>>,
}

impl RecordingHandle {
    /// Stop recording and finalize the WAV file. Blocks until the audio
    /// thread has flushed the header; call from a blocking context.
    pub fn stop(self) -> Result<PathBuf, AudioError> {
        self.stop.cancel();
        self.done_rx.recv().map_err(|_| AudioError::WorkerGone)?
    }
}

/// Audio recorder bound to the default input device.
pub struct AudioRecorder {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl AudioRecorder {
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;

        tracing::info!("Using audio input device: {:?}", device.name());

        let supported_config = device
            .default_input_config()
            .map_err(|_| AudioError::NoSupportedConfig)?;

        tracing::info!(
            "Audio config: {} Hz, {} channels, {:?}",
            supported_config.sample_rate().0,
            supported_config.channels(),
            supported_config.sample_format()
        );

        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();

        Ok(Self {
            device,
            config,
            sample_format,
        })
    }

    /// Start recording to `out_path`. Blocks briefly while the stream comes
    /// up; call from a blocking context.
    pub fn start(&self, out_path: PathBuf) -> Result<RecordingHandle, AudioError> {
        let spec = WavSpec {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate.0,
            bits_per_sample: 16, // Always write as 16-bit
            sample_format: hound::SampleFormat::Int,
        };

        let writer = WavWriter::create(&out_path, spec)
            .map_err(|e| AudioError::FileCreationFailed(e.to_string()))?;
        let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));

        let stop = CancellationToken::new();
        let (ready_tx, ready_rx) = sync_channel::<Result<(), AudioError>>(1);
        let (done_tx, done_rx) = sync_channel::<Result<PathBuf, AudioError>>(1);

        let device = self.device.clone();
        let config = self.config.clone();
        let sample_format = self.sample_format;
        let token = stop.clone();

        std::thread::spawn(move || {
            run_capture(
                device,
                config,
                sample_format,
                writer,
                out_path,
                token,
                ready_tx,
                done_tx,
            );
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(RecordingHandle { stop, done_rx }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AudioError::WorkerGone),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_capture(
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    writer: SharedWriter,
    out_path: PathBuf,
    stop: CancellationToken,
    ready_tx: SyncSender<Result<(), AudioError>>,
    done_tx: SyncSender<Result<PathBuf, AudioError>>,
) {
    let stream = match build_stream(&device, &config, sample_format, writer.clone()) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioError::StreamCreationFailed(format!(
            "Failed to start stream: {}",
            e
        ))));
        return;
    }

    tracing::info!("Recording started: {:?}", out_path);
    let _ = ready_tx.send(Ok(()));

    while !stop.is_cancelled() {
        std::thread::sleep(Duration::from_millis(20));
    }

    // Tear the stream down before finalizing so no callback races the header
    drop(stream);

    let result = match writer.lock() {
        Ok(mut guard) => match guard.take() {
            Some(w) => w
                .finalize()
                .map(|_| out_path.clone())
                .map_err(|e| AudioError::WriteFailed(e.to_string())),
            None => Err(AudioError::WriteFailed("WAV writer already taken".into())),
        },
        Err(_) => Err(AudioError::WriteFailed("WAV writer lock poisoned".into())),
    };

    if let Ok(ref path) = result {
        tracing::info!("Recording stopped, WAV finalized: {:?}", path);
    }
    let _ = done_tx.send(result);
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    writer: SharedWriter,
) -> Result<cpal::Stream, AudioError> {
    let err_fn = |err| tracing::error!("Audio stream error: {}", err);

    match sample_format {
        SampleFormat::I16 => build_stream_typed::<i16>(device, config, writer, err_fn),
        SampleFormat::U16 => build_stream_typed::<u16>(device, config, writer, err_fn),
        SampleFormat::F32 => build_stream_typed::<f32>(device, config, writer, err_fn),
        _ => Err(AudioError::NoSupportedConfig),
    }
}

fn build_stream_typed<T>(
    device: &Device,
    config: &StreamConfig,
    writer: SharedWriter,
    err_fn: impl FnMut(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::Sample<Float = f32> + cpal::SizedSample + Send + 'static,
{
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut guard = match writer.lock() {
                    Ok(g) => g,
                    Err(_) => return,
                };
                if let Some(ref mut w) = *guard {
                    for &sample in data {
                        if w.write_sample(sample_to_i16(sample)).is_err() {
                            tracing::error!("Failed to write sample");
                            break;
                        }
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamCreationFailed(e.to_string()))?;

    Ok(stream)
}

/// Convert a captured sample to i16 for the WAV writer.
fn sample_to_i16<T: cpal::Sample<Float = f32>>(sample: T) -> i16 {
    let clamped = sample.to_float_sample().clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_to_i16() {
        assert_eq!(sample_to_i16(0.0f32), 0);
        assert_eq!(sample_to_i16(1.0f32), i16::MAX);
        assert_eq!(sample_to_i16(-1.0f32), -i16::MAX);

        // Out-of-range values clamp instead of wrapping
        assert_eq!(sample_to_i16(2.0f32), i16::MAX);
        assert_eq!(sample_to_i16(-2.0f32), -i16::MAX);
    }
}
