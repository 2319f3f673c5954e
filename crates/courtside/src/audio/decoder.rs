//! Clip decoding using Symphonia
//!
//! Provides `ClipSource`, a seekable file-backed `rodio::Source`, and a
//! duration probe used by the cue editor to size its timeline.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::Receiver;
use rodio::Source;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::error::{EngineError, Result};

/// Open a clip and hand back its format reader and default track id
fn open_format(path: &Path) -> Result<(Box<dyn FormatReader>, u32)> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EngineError::Decode(format!("Probe error: {}", e)))?;

    let track_id = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .map(|t| t.id)
        .ok_or_else(|| EngineError::Decode("No audio track found".to_string()))?;

    Ok((probed.format, track_id))
}

/// A decoded audio clip, positioned at its cue offset
pub struct ClipSource {
    decoder: Box<dyn Decoder>,
    format: Box<dyn FormatReader>,
    track_id: u32,
    sample_buf: Option<SampleBuffer<f32>>,
    sample_idx: usize,
    /// Interleaved samples still to drop after an inexact seek
    skip_samples: u64,
    channels: u16,
    sample_rate: u32,
    /// Stores the last non-EOF error for the output thread to check after the clip ends
    last_error: Arc<Mutex<Option<String>>>,
}

impl ClipSource {
    /// Open `path` and seek to `offset`
    pub fn open(path: &Path, offset: Duration) -> Result<Self> {
        let (format, track_id) = open_format(path)?;

        let codec_params = format
            .tracks()
            .iter()
            .find(|t| t.id == track_id)
            .map(|t| t.codec_params.clone())
            .ok_or_else(|| EngineError::Decode("Audio track vanished".to_string()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| EngineError::Decode(format!("Decoder creation error: {}", e)))?;

        let channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);
        let sample_rate = codec_params.sample_rate.unwrap_or(44100);

        let mut source = Self {
            decoder,
            format,
            track_id,
            sample_buf: None,
            sample_idx: 0,
            skip_samples: 0,
            channels,
            sample_rate,
            last_error: Arc::new(Mutex::new(None)),
        };

        if !offset.is_zero() {
            source.seek_to(offset)?;
        }

        // Decode the first packet so rodio sees the real sample rate and channel count
        source.decode_next_packet();

        Ok(source)
    }

    fn seek_to(&mut self, offset: Duration) -> Result<()> {
        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time: Time::from(offset.as_secs_f64()),
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| EngineError::Decode(format!("Seek error: {}", e)))?;
        self.decoder.reset();

        // Readers may land on the packet boundary before the requested frame
        let frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
        self.skip_samples = frames * self.channels as u64;
        Ok(())
    }

    /// Get the error slot for checking after the clip ends.
    ///
    /// If decoding stopped on an I/O or decode error rather than clean EOF,
    /// the slot holds the error message.
    pub fn error_slot(&self) -> Arc<Mutex<Option<String>>> {
        self.last_error.clone()
    }

    fn record_error(&self, message: String) {
        if let Ok(mut err) = self.last_error.lock() {
            *err = Some(message);
        }
    }

    fn decode_next_packet(&mut self) -> bool {
        loop {
            match self.format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != self.track_id {
                        continue;
                    }

                    match self.decoder.decode(&packet) {
                        Ok(decoded) => {
                            let spec = *decoded.spec();
                            let capacity = decoded.capacity();
                            self.sample_rate = spec.rate;
                            self.channels = spec.channels.count() as u16;

                            let too_small = self
                                .sample_buf
                                .as_ref()
                                .map_or(true, |buf| buf.capacity() < capacity);
                            if too_small {
                                self.sample_buf = Some(SampleBuffer::new(capacity as u64, spec));
                            }

                            if let Some(ref mut buf) = self.sample_buf {
                                buf.copy_interleaved_ref(decoded);
                                self.sample_idx = 0;
                                return true;
                            }
                        }
                        Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                        Err(e) => {
                            self.record_error(e.to_string());
                            return false;
                        }
                    }
                }
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return false;
                }
                Err(e) => {
                    self.record_error(e.to_string());
                    return false;
                }
            }
        }
    }
}

impl Iterator for ClipSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ref buf) = self.sample_buf {
                if self.sample_idx < buf.samples().len() {
                    let sample = buf.samples()[self.sample_idx];
                    self.sample_idx += 1;
                    if self.skip_samples > 0 {
                        self.skip_samples -= 1;
                        continue;
                    }
                    return Some(sample);
                }
            }

            if !self.decode_next_packet() {
                return None;
            }
        }
    }
}

impl Source for ClipSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Total length of a clip in seconds.
///
/// Uses the container's frame count when present and otherwise sums packet
/// durations, which covers VBR MP3s without a Xing header.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let (mut format, track_id) = open_format(path)?;

    let params = format
        .tracks()
        .iter()
        .find(|t| t.id == track_id)
        .map(|t| t.codec_params.clone())
        .ok_or_else(|| EngineError::Decode("Audio track vanished".to_string()))?;

    let frames = match params.n_frames {
        Some(n) => n,
        None => {
            let mut total = 0u64;
            while let Ok(packet) = format.next_packet() {
                if packet.track_id() == track_id {
                    total += packet.dur();
                }
            }
            total
        }
    };

    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Ok(time.seconds as f64 + time.frac);
    }
    match params.sample_rate {
        Some(rate) if rate > 0 => Ok(frames as f64 / rate as f64),
        _ => Err(EngineError::Decode(
            "Cannot determine clip duration".to_string(),
        )),
    }
}

/// Spawn a duration probe and return the receiver immediately (non-blocking).
///
/// The probe runs on a background `"duration-probe"` thread; poll the
/// receiver with `try_recv()` and give up after `PROBE_TIMEOUT_SECS`.
pub fn spawn_duration_probe(path: PathBuf) -> Result<Receiver<Result<f64>>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::Builder::new()
        .name("duration-probe".to_string())
        .spawn(move || {
            let _ = tx.send(probe_duration(&path));
        })
        .map_err(|e| EngineError::Audio(format!("Failed to spawn probe thread: {}", e)))?;
    Ok(rx)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::fs;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    /// Build a minimal valid 16-bit PCM WAV file in memory
    pub(crate) fn make_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
        let block_align = channels * (bits_per_sample / 8);
        let data_size = (samples.len() * 2) as u32;
        let file_size = 36 + data_size;

        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        buf
    }

    /// Write `seconds` of a mono 8 kHz tone to a unique temp file
    pub(crate) fn write_tone(seconds: f64) -> PathBuf {
        let rate = 8000u32;
        let count = (rate as f64 * seconds) as usize;
        let samples: Vec<i16> = (0..count)
            .map(|i| ((i as f32 * 0.1).sin() * 8000.0) as i16)
            .collect();
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = temp_dir().join(format!(
            "courtside_clip_{}_{}.wav",
            std::process::id(),
            id
        ));
        fs::write(&path, make_wav(rate, 1, &samples)).unwrap();
        path
    }

    #[test]
    fn open_reports_spec() {
        let path = write_tone(0.5);
        let source = ClipSource::open(&path, Duration::ZERO).unwrap();
        assert_eq!(source.channels(), 1);
        assert_eq!(source.sample_rate(), 8000);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn decodes_every_sample_without_offset() {
        let path = write_tone(1.0);
        let source = ClipSource::open(&path, Duration::ZERO).unwrap();
        assert_eq!(source.count(), 8000);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn offset_skips_leading_audio() {
        let path = write_tone(1.0);
        let source = ClipSource::open(&path, Duration::from_millis(500)).unwrap();
        let remaining = source.count() as i64;
        // Within one packet of the exact half
        assert!((remaining - 4000).abs() <= 1152, "remaining = {}", remaining);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn clean_eof_leaves_error_slot_empty() {
        let path = write_tone(0.25);
        let source = ClipSource::open(&path, Duration::ZERO).unwrap();
        let slot = source.error_slot();
        let _ = source.count();
        assert!(slot.lock().unwrap().is_none());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = temp_dir().join("courtside_definitely_missing.wav");
        assert!(matches!(
            ClipSource::open(&path, Duration::ZERO),
            Err(EngineError::Io(_))
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = temp_dir().join(format!("courtside_garbage_{}_{}.wav", std::process::id(), id));
        fs::write(&path, b"this is not audio at all").unwrap();
        assert!(matches!(
            ClipSource::open(&path, Duration::ZERO),
            Err(EngineError::Decode(_))
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn probe_duration_matches_clip_length() {
        let path = write_tone(1.5);
        let duration = probe_duration(&path).unwrap();
        assert!((duration - 1.5).abs() < 0.01, "duration = {}", duration);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn spawned_probe_delivers_result() {
        let path = write_tone(0.75);
        let rx = spawn_duration_probe(path.clone()).unwrap();
        let duration = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!((duration - 0.75).abs() < 0.01);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn probe_of_missing_file_fails() {
        let path = temp_dir().join("courtside_missing_probe.wav");
        let rx = spawn_duration_probe(path).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap().is_err());
    }
}
