//! Platform audio seam
//!
//! The playback engine talks to audio hardware only through [`AudioBackend`].
//! [`ScriptedBackend`] is a hardware-free implementation whose voice lifecycle
//! is driven by hand; it backs tests and the `--no-audio` rehearsal mode.

use std::collections::VecDeque;

use crate::error::{EngineError, Result};

use super::types::{VoiceEvent, VoiceRequest};

/// A platform audio primitive able to run one voice at a time
pub trait AudioBackend {
    /// Open or resume the output device. Called before every start.
    fn ensure_ready(&mut self) -> Result<()>;

    /// Begin starting a voice. Must not block on playback; the outcome
    /// arrives later as a [`VoiceEvent`] carrying `request.generation`.
    fn start(&mut self, request: VoiceRequest);

    /// Stop and release the voice with this generation, if it still exists
    fn stop(&mut self, generation: u64);

    /// Non-blocking poll for the next lifecycle event
    fn try_event(&mut self) -> Option<VoiceEvent>;

    /// Master output level, 0.0 to 1.0
    fn set_volume(&mut self, volume: f32);
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn ensure_ready(&mut self) -> Result<()> {
        (**self).ensure_ready()
    }

    fn start(&mut self, request: VoiceRequest) {
        (**self).start(request)
    }

    fn stop(&mut self, generation: u64) {
        (**self).stop(generation)
    }

    fn try_event(&mut self) -> Option<VoiceEvent> {
        (**self).try_event()
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }
}

/// Backend whose voices exist only as bookkeeping.
///
/// Starts stay pending until [`confirm`](Self::confirm) is called, unless the
/// backend was built with [`auto_confirming`](Self::auto_confirming).
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    auto_confirm: bool,
    fail_init: bool,
    init_calls: usize,
    requests: Vec<VoiceRequest>,
    stops: Vec<u64>,
    /// Voices created and not yet released
    live: Vec<u64>,
    pending: VecDeque<VoiceEvent>,
    volume: Option<f32>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirm every start immediately
    pub fn auto_confirming() -> Self {
        Self {
            auto_confirm: true,
            ..Self::default()
        }
    }

    /// Refuse to initialize, as a device-less host would
    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    /// Platform confirms that the voice started
    pub fn confirm(&mut self, generation: u64) {
        self.pending.push_back(VoiceEvent::Started { generation });
    }

    /// Platform rejects the start
    pub fn reject(&mut self, generation: u64, message: &str) {
        self.live.retain(|g| *g != generation);
        self.pending.push_back(VoiceEvent::Failed {
            generation,
            message: message.to_string(),
        });
    }

    /// Clip runs out of samples
    pub fn finish(&mut self, generation: u64) {
        self.live.retain(|g| *g != generation);
        self.pending.push_back(VoiceEvent::Ended { generation });
    }

    /// Every start request received, oldest first
    pub fn requests(&self) -> &[VoiceRequest] {
        &self.requests
    }

    /// Most recent start request
    pub fn last_request(&self) -> Option<&VoiceRequest> {
        self.requests.last()
    }

    /// Every stop received, oldest first
    pub fn stops(&self) -> &[u64] {
        &self.stops
    }

    /// Voices that would currently be audible
    pub fn live_voices(&self) -> &[u64] {
        &self.live
    }

    /// How many times `ensure_ready` was called
    pub fn init_calls(&self) -> usize {
        self.init_calls
    }

    /// Last level set, if any
    pub fn volume(&self) -> Option<f32> {
        self.volume
    }
}

impl AudioBackend for ScriptedBackend {
    fn ensure_ready(&mut self) -> Result<()> {
        self.init_calls += 1;
        if self.fail_init {
            return Err(EngineError::Audio("No output device".to_string()));
        }
        Ok(())
    }

    fn start(&mut self, request: VoiceRequest) {
        let generation = request.generation;
        self.live.push(generation);
        self.requests.push(request);
        if self.auto_confirm {
            self.confirm(generation);
        }
    }

    fn stop(&mut self, generation: u64) {
        self.stops.push(generation);
        self.live.retain(|g| *g != generation);
    }

    fn try_event(&mut self) -> Option<VoiceEvent> {
        self.pending.pop_front()
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = Some(volume);
    }
}
