//! Opus decode and gapless playback scheduling for the audio sub-stream.
//!
//! The device sends one Opus packet per WebSocket frame. Each packet is
//! decoded to interleaved stereo PCM and assigned a slot on a running
//! playback timeline: the cursor advances by each frame's duration, and a
//! frame is never scheduled before the cursor — always at or after the
//! previous frame's end. When the stream stalls and the cursor falls
//! behind real time, playback resumes at "now" instead of trying to catch
//! up.

use audiopus::coder::Decoder;
use audiopus::{Channels, SampleRate};

use crate::error::CoreError;

/// The device encodes at 48 kHz stereo.
pub const SAMPLE_RATE: u32 = 48_000;
pub const CHANNELS: usize = 2;

/// Largest Opus frame is 120 ms: 5760 samples per channel at 48 kHz.
const MAX_FRAME_SAMPLES: usize = 5760;

/// One decoded frame, placed on the playback timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    /// Interleaved stereo samples.
    pub samples: Vec<i16>,
    /// Scheduled start, in seconds on the playback clock.
    pub start: f64,
    /// Frame duration in seconds.
    pub duration: f64,
}

impl AudioBlock {
    /// Scheduled end of this block.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Stateful decoder plus the playback-time cursor.
pub struct AudioPipeline {
    decoder: Decoder,
    cursor: f64,
}

impl AudioPipeline {
    pub fn new() -> Result<Self, CoreError> {
        let decoder = Decoder::new(SampleRate::Hz48000, Channels::Stereo)
            .map_err(|e| CoreError::AudioDecode(format!("failed to create decoder: {e:?}")))?;
        Ok(Self {
            decoder,
            cursor: 0.0,
        })
    }

    /// Decode one packet and schedule it.
    ///
    /// `now` is the current playback-clock time in seconds. The block
    /// starts at `max(cursor, now)` and the cursor moves to its end, so
    /// consecutive frames on a healthy stream play back to back.
    pub fn push(&mut self, packet: &[u8], now: f64) -> Result<AudioBlock, CoreError> {
        if packet.is_empty() {
            return Err(CoreError::AudioDecode("empty packet".to_owned()));
        }

        let mut pcm = vec![0i16; MAX_FRAME_SAMPLES * CHANNELS];
        let samples_per_channel = self
            .decoder
            .decode(Some(packet), &mut pcm, false)
            .map_err(|e| CoreError::AudioDecode(format!("{e:?}")))?;
        pcm.truncate(samples_per_channel * CHANNELS);

        let duration = samples_per_channel as f64 / f64::from(SAMPLE_RATE);
        let start = self.cursor.max(now);
        self.cursor = start + duration;

        Ok(AudioBlock {
            samples: pcm,
            start,
            duration,
        })
    }

    /// Current cursor position: where the next frame will be scheduled
    /// at the earliest.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Drop decoder state after a transport reconnect. The cursor is
    /// kept: the timeline never moves backwards.
    pub fn reset(&mut self) -> Result<(), CoreError> {
        self.decoder = Decoder::new(SampleRate::Hz48000, Channels::Stereo)
            .map_err(|e| CoreError::AudioDecode(format!("failed to create decoder: {e:?}")))?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use audiopus::Application;
    use audiopus::coder::Encoder;

    /// 20 ms of stereo silence, Opus-encoded.
    fn silence_packet() -> Vec<u8> {
        let mut encoder = Encoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Audio)
            .expect("encoder");
        let pcm = vec![0i16; 960 * CHANNELS];
        let mut out = vec![0u8; 4000];
        let n = encoder.encode(&pcm, &mut out).expect("encode");
        out.truncate(n);
        out
    }

    #[test]
    fn decodes_to_expected_frame_size() {
        let packet = silence_packet();
        let mut pipeline = AudioPipeline::new().expect("pipeline");

        let block = pipeline.push(&packet, 0.0).expect("decode");
        assert_eq!(block.samples.len(), 960 * CHANNELS);
        assert!((block.duration - 0.02).abs() < 1e-9);
    }

    #[test]
    fn consecutive_frames_are_gapless() {
        let packet = silence_packet();
        let mut pipeline = AudioPipeline::new().expect("pipeline");

        let first = pipeline.push(&packet, 0.0).expect("decode");
        let second = pipeline.push(&packet, 0.0).expect("decode");
        let third = pipeline.push(&packet, 0.0).expect("decode");

        assert_eq!(first.start, 0.0);
        assert_eq!(second.start, first.end());
        assert_eq!(third.start, second.end());
    }

    #[test]
    fn never_schedules_before_the_cursor() {
        let packet = silence_packet();
        let mut pipeline = AudioPipeline::new().expect("pipeline");

        let first = pipeline.push(&packet, 0.0).expect("decode");
        // A caller handing in an old clock value must not rewind the
        // timeline.
        let second = pipeline.push(&packet, 0.0).expect("decode");
        assert!(second.start >= first.end());
    }

    #[test]
    fn stall_resumes_at_now() {
        let packet = silence_packet();
        let mut pipeline = AudioPipeline::new().expect("pipeline");

        pipeline.push(&packet, 0.0).expect("decode");
        // The stream stalled; the clock is way past the cursor.
        let resumed = pipeline.push(&packet, 5.0).expect("decode");
        assert_eq!(resumed.start, 5.0);
        assert!((pipeline.cursor() - 5.02).abs() < 1e-9);
    }

    #[test]
    fn reset_keeps_the_cursor() {
        let packet = silence_packet();
        let mut pipeline = AudioPipeline::new().expect("pipeline");

        pipeline.push(&packet, 0.0).expect("decode");
        let cursor = pipeline.cursor();
        pipeline.reset().expect("reset");
        assert_eq!(pipeline.cursor(), cursor);
    }

    #[test]
    fn rejects_garbage() {
        let mut pipeline = AudioPipeline::new().expect("pipeline");
        assert!(pipeline.push(&[], 0.0).is_err());
    }
}
