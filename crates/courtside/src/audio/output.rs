//! Rodio output backend
//!
//! Runs the audio device on a dedicated thread, accepting [`VoiceCommand`]s via
//! crossbeam channels and reporting [`VoiceEvent`]s back. The thread is spawned
//! lazily by the first `ensure_ready`, so no device is touched until the
//! operator actually triggers a sound.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rodio::{OutputStreamBuilder, Sink};
use tracing::{debug, info, warn};

use crate::config::audio::{
    COMMAND_CHANNEL_CAPACITY, EVENT_CHANNEL_CAPACITY, MAX_VOLUME, OUTPUT_TICK_MS,
};
use crate::config::timeouts::OUTPUT_INIT_TIMEOUT_SECS;
use crate::error::{EngineError, Result};

use super::backend::AudioBackend;
use super::decoder::ClipSource;
use super::types::{VoiceCommand, VoiceEvent, VoiceRequest};

/// Handles to a running output thread
struct OutputThread {
    cmd_tx: Sender<VoiceCommand>,
    event_rx: Receiver<VoiceEvent>,
    thread: Option<JoinHandle<()>>,
}

impl OutputThread {
    /// Spawn the output thread and block until the device is open (or fails)
    fn spawn(volume: f32) -> Result<Self> {
        let (cmd_tx, cmd_rx) = bounded::<VoiceCommand>(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = bounded::<VoiceEvent>(EVENT_CHANNEL_CAPACITY);
        let (init_tx, init_rx) = bounded::<std::result::Result<(), String>>(1);

        let thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || run(cmd_rx, event_tx, init_tx, volume))
            .map_err(|e| EngineError::Audio(format!("Failed to spawn audio thread: {}", e)))?;

        let init_result = init_rx
            .recv_timeout(Duration::from_secs(OUTPUT_INIT_TIMEOUT_SECS))
            .map_err(|_| EngineError::Audio("Audio thread terminated during init".to_string()))?;
        init_result.map_err(EngineError::Audio)?;

        Ok(Self {
            cmd_tx,
            event_rx,
            thread: Some(thread),
        })
    }

    fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(VoiceCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Audio backend playing clips through the default output device
pub struct RodioBackend {
    volume: f32,
    output: Option<OutputThread>,
    /// Events produced locally when the thread cannot take a command
    local_events: VecDeque<VoiceEvent>,
}

impl RodioBackend {
    /// Create a backend; the device is opened on first use
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, MAX_VOLUME),
            output: None,
            local_events: VecDeque::new(),
        }
    }
}

impl AudioBackend for RodioBackend {
    fn ensure_ready(&mut self) -> Result<()> {
        if self.output.is_none() {
            self.output = Some(OutputThread::spawn(self.volume)?);
            info!("Audio output opened");
        }
        Ok(())
    }

    fn start(&mut self, request: VoiceRequest) {
        let generation = request.generation;
        let sent = self
            .output
            .as_ref()
            .is_some_and(|output| output.cmd_tx.send(VoiceCommand::Start(request)).is_ok());
        if !sent {
            self.local_events.push_back(VoiceEvent::Failed {
                generation,
                message: "Audio output is not running".to_string(),
            });
        }
    }

    fn stop(&mut self, generation: u64) {
        if let Some(output) = &self.output {
            let _ = output.cmd_tx.send(VoiceCommand::Stop { generation });
        }
    }

    fn try_event(&mut self) -> Option<VoiceEvent> {
        if let Some(event) = self.local_events.pop_front() {
            return Some(event);
        }
        self.output.as_ref()?.event_rx.try_recv().ok()
    }

    /// Clamped to 0.0..=1.0; applied to a running device immediately
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
        if let Some(output) = &self.output {
            let _ = output.cmd_tx.send(VoiceCommand::SetVolume(self.volume));
        }
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.shutdown();
        }
    }
}

/// The output thread's main loop
fn run(
    cmd_rx: Receiver<VoiceCommand>,
    event_tx: Sender<VoiceEvent>,
    init_tx: Sender<std::result::Result<(), String>>,
    volume: f32,
) {
    // Create audio output on this thread (cpal streams may be !Send)
    let mut stream = match OutputStreamBuilder::open_default_stream() {
        Ok(s) => s,
        Err(e) => {
            let _ = init_tx.send(Err(format!("Failed to open audio output: {}", e)));
            return;
        }
    };
    stream.log_on_drop(false);

    // `stream` must be declared before `sink` so Rust drops sink first
    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume);

    let _ = init_tx.send(Ok(()));

    let mut current: Option<u64> = None;
    let mut error_slot: Option<Arc<Mutex<Option<String>>>> = None;

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(OUTPUT_TICK_MS)) {
            Ok(cmd) => match cmd {
                VoiceCommand::Start(request) => {
                    // One voice per device: drop whatever was queued
                    sink.stop();
                    current = None;
                    error_slot = None;

                    match ClipSource::open(&request.path, request.offset) {
                        Ok(source) => {
                            error_slot = Some(source.error_slot());
                            sink.append(source);
                            sink.play();
                            current = Some(request.generation);
                            debug!(generation = request.generation, path = ?request.path, "Voice started");
                            let _ = event_tx.send(VoiceEvent::Started {
                                generation: request.generation,
                            });
                        }
                        Err(e) => {
                            let _ = event_tx.send(VoiceEvent::Failed {
                                generation: request.generation,
                                message: format!("{} ({})", e, request.path.display()),
                            });
                        }
                    }
                }
                VoiceCommand::Stop { generation } => {
                    if current == Some(generation) {
                        sink.stop();
                        current = None;
                        error_slot = None;
                    }
                }
                VoiceCommand::SetVolume(vol) => {
                    sink.set_volume(vol.clamp(0.0, MAX_VOLUME));
                }
                VoiceCommand::Shutdown => {
                    sink.stop();
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                // Check if the clip ran out (naturally or due to error)
                if let Some(generation) = current {
                    if sink.empty() {
                        current = None;
                        let failure = error_slot.take().and_then(|slot| {
                            let mut guard = slot.lock().ok()?;
                            guard.take()
                        });
                        let event = match failure {
                            Some(message) => {
                                warn!(generation, %message, "Voice ended with error");
                                VoiceEvent::Failed {
                                    generation,
                                    message,
                                }
                            }
                            None => VoiceEvent::Ended { generation },
                        };
                        let _ = event_tx.send(event);
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decoder::tests::write_tone;
    use std::path::PathBuf;
    use std::time::Instant;

    /// Helper: open a backend; return None if audio hardware is unavailable
    fn try_backend() -> Option<RodioBackend> {
        let mut backend = RodioBackend::new(0.0);
        backend.ensure_ready().ok()?;
        Some(backend)
    }

    /// Helper: wait for the next voice event within a timeout
    fn wait_for_event(backend: &mut RodioBackend, timeout_ms: u64) -> Option<VoiceEvent> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Some(evt) = backend.try_event() {
                return Some(evt);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn request(generation: u64, path: PathBuf) -> VoiceRequest {
        VoiceRequest {
            generation,
            path,
            offset: Duration::ZERO,
        }
    }

    #[test]
    fn new_backend_is_lazy() {
        let backend = RodioBackend::new(0.5);
        assert!(backend.output.is_none());
    }

    #[test]
    fn volume_is_clamped() {
        let mut backend = RodioBackend::new(3.0);
        assert_eq!(backend.volume, 1.0);
        backend.set_volume(-1.0);
        assert_eq!(backend.volume, 0.0);
    }

    #[test]
    fn start_before_ready_fails_locally() {
        let mut backend = RodioBackend::new(0.5);
        backend.start(request(1, PathBuf::from("ace.wav")));
        assert!(matches!(
            backend.try_event(),
            Some(VoiceEvent::Failed { generation: 1, .. })
        ));
    }

    #[test]
    fn short_clip_starts_then_ends() {
        let Some(mut backend) = try_backend() else { return };
        let path = write_tone(0.1);

        backend.start(request(1, path.clone()));
        assert_eq!(
            wait_for_event(&mut backend, 2000),
            Some(VoiceEvent::Started { generation: 1 })
        );
        assert_eq!(
            wait_for_event(&mut backend, 3000),
            Some(VoiceEvent::Ended { generation: 1 })
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn stopped_voice_does_not_report_end() {
        let Some(mut backend) = try_backend() else { return };
        let path = write_tone(1.0);

        backend.start(request(1, path.clone()));
        assert_eq!(
            wait_for_event(&mut backend, 2000),
            Some(VoiceEvent::Started { generation: 1 })
        );
        backend.stop(1);
        assert_eq!(wait_for_event(&mut backend, 300), None);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_reports_failure() {
        let Some(mut backend) = try_backend() else { return };
        backend.start(request(7, PathBuf::from("/nonexistent/courtside.wav")));
        assert!(matches!(
            wait_for_event(&mut backend, 2000),
            Some(VoiceEvent::Failed { generation: 7, .. })
        ));
    }

    #[test]
    fn stop_for_old_generation_is_ignored() {
        let Some(mut backend) = try_backend() else { return };
        let path = write_tone(0.2);

        backend.start(request(2, path.clone()));
        assert_eq!(
            wait_for_event(&mut backend, 2000),
            Some(VoiceEvent::Started { generation: 2 })
        );
        backend.stop(1);
        assert_eq!(
            wait_for_event(&mut backend, 3000),
            Some(VoiceEvent::Ended { generation: 2 })
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn drop_shuts_down_thread() {
        let Some(backend) = try_backend() else { return };
        drop(backend);
        // If we get here without hanging, shutdown worked
    }
}
