//! Stop-key listener
//!
//! Watches every keyboard device via evdev and sends `Event::StopRequested`
//! when the stop key (Space) is pressed. Reading from /dev/input means the
//! press is seen even when another window has focus, which is the point:
//! the user talks into the mic with anything in the foreground and taps
//! Space to finish.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use evdev::{Device, InputEventKind, Key};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::state_machine::Event;

/// Debounce duration to prevent rapid stop-key spam
const DEBOUNCE_MS: u64 = 300;

/// Shared state for debouncing across all device monitors
struct DebounceState {
    /// Timestamp of last trigger in milliseconds since start
    last_trigger_ms: AtomicU64,
    start: Instant,
}

impl DebounceState {
    fn new() -> Self {
        Self {
            last_trigger_ms: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Check if we should trigger and update the last trigger time.
    /// Returns true if trigger should proceed (not debounced).
    fn should_trigger(&self) -> bool {
        let now_ms = self.start.elapsed().as_millis() as u64;
        let last = self.last_trigger_ms.load(Ordering::SeqCst);

        if now_ms.saturating_sub(last) >= DEBOUNCE_MS || last == 0 {
            // Claim this trigger; only proceed if we win the CAS
            self.last_trigger_ms
                .compare_exchange(last, now_ms.max(1), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        } else {
            tracing::trace!(
                "Stop key debounced ({}ms since last trigger)",
                now_ms.saturating_sub(last)
            );
            false
        }
    }
}

/// Find all keyboard devices on the system
fn find_keyboards() -> Vec<(PathBuf, Device)> {
    evdev::enumerate()
        .filter_map(|(path, device)| {
            // A keyboard should support common keys
            let is_keyboard = device.supported_keys().map_or(false, |keys| {
                keys.contains(Key::KEY_ENTER)
                    && keys.contains(Key::KEY_SPACE)
                    && keys.contains(Key::KEY_A)
                    && keys.contains(Key::KEY_Z)
            });

            if is_keyboard {
                let name = device.name().unwrap_or("Unknown");
                tracing::info!("Found keyboard device: {:?} ({})", path, name);
                Some((path, device))
            } else {
                None
            }
        })
        .collect()
}

fn check_permissions(keyboards: &[(PathBuf, Device)]) -> Result<(), String> {
    if keyboards.is_empty() {
        let all_devices: Vec<_> = evdev::enumerate().collect();

        if all_devices.is_empty() {
            return Err(
                "No input devices found. Ensure you are in the 'input' group:\n\
                 sudo usermod -aG input $USER\n\
                 Then log out and back in."
                    .to_string(),
            );
        } else {
            return Err(format!(
                "Found {} input devices but none appear to be keyboards. \
                 This might be a permissions issue or no keyboard is connected.",
                all_devices.len()
            ));
        }
    }

    Ok(())
}

/// Monitors every keyboard device for presses of the stop key.
pub struct StopKeyListener {
    cancel_token: CancellationToken,
}

impl StopKeyListener {
    /// Start monitoring. Spawns one task per keyboard device; each press of
    /// `stop_key` sends `Event::StopRequested` (debounced across devices).
    pub fn start(event_tx: mpsc::Sender<Event>, stop_key: Key) -> Result<Self, String> {
        let keyboards = find_keyboards();
        check_permissions(&keyboards)?;

        let cancel_token = CancellationToken::new();
        let debounce = Arc::new(DebounceState::new());

        tracing::info!(
            "Listening for stop key {:?} on {} device(s), debounce {}ms",
            stop_key,
            keyboards.len(),
            DEBOUNCE_MS
        );

        for (path, device) in keyboards {
            let tx = event_tx.clone();
            let cancel = cancel_token.clone();
            let debounce = debounce.clone();
            let path_str = path.to_string_lossy().to_string();

            tokio::spawn(async move {
                Self::monitor_device(path_str, device, stop_key, tx, cancel, debounce).await;
            });
        }

        Ok(Self { cancel_token })
    }

    async fn monitor_device(
        path: String,
        device: Device,
        stop_key: Key,
        tx: mpsc::Sender<Event>,
        cancel: CancellationToken,
        debounce: Arc<DebounceState>,
    ) {
        let name = device.name().unwrap_or("Unknown").to_string();
        tracing::info!("Monitoring keyboard device: {} ({})", path, name);

        let mut stream = match device.into_event_stream() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to create event stream for {}: {}", path, e);
                return;
            }
        };

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!("Stop-key monitoring cancelled for {}", path);
                    break;
                }

                result = stream.next_event() => {
                    match result {
                        Ok(ev) => {
                            // value 1 is press; ignore release (0) and repeat (2)
                            if let InputEventKind::Key(key) = ev.kind() {
                                if key == stop_key && ev.value() == 1 && debounce.should_trigger() {
                                    tracing::info!("Stop key pressed");
                                    if let Err(e) = tx.send(Event::StopRequested).await {
                                        tracing::error!("Failed to send StopRequested: {}", e);
                                        break;
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Device read error for {} (disconnected?): {}", path, e);
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Stopped monitoring device: {}", path);
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for StopKeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_trigger_is_allowed() {
        let debounce = DebounceState::new();
        assert!(debounce.should_trigger());
    }

    #[test]
    fn rapid_second_trigger_is_debounced() {
        let debounce = DebounceState::new();
        assert!(debounce.should_trigger());
        assert!(!debounce.should_trigger());
    }

    #[test]
    fn trigger_allowed_after_debounce_window() {
        let debounce = DebounceState::new();
        assert!(debounce.should_trigger());
        // Simulate time passing by backdating the last trigger
        debounce.last_trigger_ms.store(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(DEBOUNCE_MS + 10));
        assert!(debounce.should_trigger());
    }
}
