//! Audio source: decoded buffer, analysis read cursor and playback clock.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::decode::{self, DecodedAudio};
use super::output;
use super::SampleChunk;
use crate::error::Result;
use crate::params::SourceConfig;

/// Result of pulling the next analysis chunk
#[derive(Debug, Clone)]
pub enum ChunkRead {
    Chunk(SampleChunk),
    EndOfStream,
}

#[derive(Debug, Clone)]
enum Clock {
    /// Playback not started yet
    Stopped,
    /// No output device: playback follows wall-clock time
    WallClock { started: Instant },
    /// Output device callback advances the frame counter
    Device { frames_played: Arc<AtomicU64> },
}

/// Read-only view of which source frame is audible right now
///
/// Cheap to clone and safe to read from the render thread.
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    clock: Clock,
    sample_rate: u32,
    total_frames: u64,
    looping: bool,
}

impl PlaybackCursor {
    /// Frames elapsed since playback started (unbounded, never wraps)
    fn elapsed_frames(&self) -> u64 {
        match &self.clock {
            Clock::Stopped => 0,
            Clock::WallClock { started } => {
                (started.elapsed().as_secs_f64() * self.sample_rate as f64) as u64
            }
            Clock::Device { frames_played } => frames_played.load(Ordering::Acquire),
        }
    }

    /// Index of the currently audible frame within the source buffer
    pub fn frame(&self) -> u64 {
        let elapsed = self.elapsed_frames();
        if self.looping {
            elapsed % self.total_frames.max(1)
        } else {
            elapsed.min(self.total_frames)
        }
    }

    /// Playback position in seconds (for display)
    pub fn seconds(&self) -> f32 {
        self.frame() as f32 / self.sample_rate as f32
    }

    /// True once a non-looping source has played to the end
    pub fn is_finished(&self) -> bool {
        !self.looping && self.elapsed_frames() >= self.total_frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }
}

/// Single active audio stream reduced to one analysis channel
///
/// The analysis read position (`read_next_chunk`) is independent from the
/// playback clock (`current_playback_frame`); the pipeline keeps them within
/// a bounded lag.
pub struct AudioSource {
    audio: DecodedAudio,
    read_frame: u64,
    looping: bool,
    is_fallback: bool,
    cursor: PlaybackCursor,
    /// Output stream (kept alive while playing)
    _output: Option<cpal::Stream>,
}

impl AudioSource {
    /// Decode `path` into a source; fails with `SourceNotFound` or `UnsupportedFormat`
    pub fn open(path: &Path, config: &SourceConfig) -> Result<Self> {
        let audio = decode::load_wav(path)?;
        log::info!(
            "Opened {}: {} Hz, {} channel(s), {:.2}s",
            path.display(),
            audio.sample_rate,
            audio.source_channels,
            audio.duration_secs()
        );
        Ok(Self::from_decoded(audio, config.loop_playback, false))
    }

    /// Open `path`, substituting the synthetic fallback buffer on any source error
    pub fn open_or_fallback(path: &Path, config: &SourceConfig) -> Self {
        match Self::open(path, config) {
            Ok(source) => source,
            Err(e) if e.is_recoverable_source_error() => {
                log::warn!("{}; using synthetic fallback audio", e);
                Self::fallback(config)
            }
            Err(e) => {
                log::error!("{}; using synthetic fallback audio", e);
                Self::fallback(config)
            }
        }
    }

    /// Deterministic fallback (fixed tone, or silence at zero amplitude)
    pub fn fallback(config: &SourceConfig) -> Self {
        let audio = decode::synthesize_tone(
            config.fallback_tone_hz,
            config.fallback_amplitude,
            config.fallback_sample_rate_hz,
            config.fallback_duration_s,
        );
        log::info!(
            "Synthetic audio: {} Hz tone, amplitude {}, {:.1}s @ {} Hz",
            config.fallback_tone_hz,
            config.fallback_amplitude,
            config.fallback_duration_s,
            config.fallback_sample_rate_hz
        );
        Self::from_decoded(audio, config.loop_playback, true)
    }

    pub fn from_decoded(audio: DecodedAudio, looping: bool, is_fallback: bool) -> Self {
        let cursor = PlaybackCursor {
            clock: Clock::Stopped,
            sample_rate: audio.sample_rate,
            total_frames: audio.frame_count(),
            looping,
        };
        Self {
            audio,
            read_frame: 0,
            looping,
            is_fallback,
            cursor,
            _output: None,
        }
    }

    /// Start the playback clock, driving the output device when `enable_output` is set
    ///
    /// A device failure is returned as `DeviceUnavailable`, but playback still
    /// starts on a wall clock so analysis and visuals keep running.
    pub fn start_playback(&mut self, enable_output: bool) -> Result<()> {
        let mut device_result = Ok(());

        if enable_output {
            let frames_played = Arc::new(AtomicU64::new(0));
            match output::start_output(
                Arc::clone(&self.audio.samples),
                self.audio.sample_rate,
                self.looping,
                Arc::clone(&frames_played),
            ) {
                Ok(stream) => {
                    self._output = Some(stream);
                    self.cursor.clock = Clock::Device { frames_played };
                    return Ok(());
                }
                Err(e) => device_result = Err(e),
            }
        }

        self.cursor.clock = Clock::WallClock {
            started: Instant::now(),
        };
        device_result
    }

    /// Pull the next `size` frames for analysis
    ///
    /// The last chunk of a non-looping source may be shorter than `size`.
    pub fn read_next_chunk(&mut self, size: usize) -> ChunkRead {
        let total = self.audio.frame_count();
        if size == 0 || total == 0 {
            return ChunkRead::EndOfStream;
        }

        let start = self.read_frame;
        let samples: Vec<f32> = if self.looping {
            (0..size as u64)
                .map(|i| self.audio.samples[((start + i) % total) as usize])
                .collect()
        } else {
            if start >= total {
                return ChunkRead::EndOfStream;
            }
            let end = (start + size as u64).min(total);
            self.audio.samples[start as usize..end as usize].to_vec()
        };

        self.read_frame = if self.looping {
            (start + size as u64) % total
        } else {
            start + samples.len() as u64
        };

        ChunkRead::Chunk(SampleChunk::new(samples, self.audio.sample_rate, start))
    }

    /// Frame audible on the output right now (0 before playback starts)
    pub fn current_playback_frame(&self) -> u64 {
        self.cursor.frame()
    }

    /// Move the analysis read position
    pub fn seek(&mut self, frame: u64) {
        let total = self.audio.frame_count();
        self.read_frame = if self.looping {
            frame % total.max(1)
        } else {
            frame.min(total)
        };
    }

    pub fn read_position(&self) -> u64 {
        self.read_frame
    }

    /// Handle for the render side (take it after `start_playback`)
    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    pub fn total_frames(&self) -> u64 {
        self.audio.frame_count()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// True when the synthetic buffer replaced a missing or unreadable file
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }
}

impl Drop for AudioSource {
    fn drop(&mut self) {
        if self._output.take().is_some() {
            log::debug!("Released audio output device");
        }
    }
}

/// Distance between two frames, measured around the buffer when looping
pub(super) fn frame_distance(a: u64, b: u64, total: u64, looping: bool) -> u64 {
    let direct = a.abs_diff(b);
    if looping && total > 0 {
        direct.min(total - direct % total)
    } else {
        direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_source(frames: usize, looping: bool) -> AudioSource {
        let samples: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32).collect();
        let audio = DecodedAudio {
            samples: samples.into(),
            sample_rate: 1_000,
            source_channels: 1,
        };
        AudioSource::from_decoded(audio, looping, false)
    }

    #[test]
    fn test_chunks_are_sequential() {
        let mut source = ramp_source(10, false);

        let ChunkRead::Chunk(first) = source.read_next_chunk(4) else {
            panic!("expected chunk");
        };
        let ChunkRead::Chunk(second) = source.read_next_chunk(4) else {
            panic!("expected chunk");
        };

        assert_eq!(first.start_frame(), 0);
        assert_eq!(second.start_frame(), 4);
        assert_eq!(second.samples()[0], 0.4);
    }

    #[test]
    fn test_final_chunk_is_short_then_end_of_stream() {
        let mut source = ramp_source(10, false);
        source.seek(8);

        let ChunkRead::Chunk(tail) = source.read_next_chunk(4) else {
            panic!("expected chunk");
        };
        assert_eq!(tail.len(), 2);
        assert!(matches!(source.read_next_chunk(4), ChunkRead::EndOfStream));
    }

    #[test]
    fn test_looping_wraps_reads() {
        let mut source = ramp_source(10, true);
        source.seek(8);

        let ChunkRead::Chunk(chunk) = source.read_next_chunk(4) else {
            panic!("expected chunk");
        };
        assert_eq!(chunk.len(), 4);
        assert_eq!(chunk.samples()[2], 0.0);
        assert_eq!(source.read_position(), 2);
    }

    #[test]
    fn test_playback_frame_is_zero_before_start() {
        let source = ramp_source(10, false);
        assert_eq!(source.current_playback_frame(), 0);
        assert!(!source.cursor().is_finished());
    }

    #[test]
    fn test_silent_playback_advances_on_wall_clock() {
        let mut source = ramp_source(100_000, false);
        source.start_playback(false).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        let frame = source.current_playback_frame();

        // 1 kHz clock: at least 20 frames after 20 ms
        assert!(frame >= 20, "frame = {}", frame);
    }

    #[test]
    fn test_fallback_when_file_missing() {
        let config = SourceConfig::default();
        let source = AudioSource::open_or_fallback(Path::new("missing/output.wav"), &config);

        assert!(source.is_fallback());
        assert_eq!(source.sample_rate(), 24_000);
        assert_eq!(source.total_frames(), 120_000);
    }

    #[test]
    fn test_fallback_when_file_is_not_wav() {
        let path = std::env::temp_dir().join(format!(
            "pulsesphere-{}-corrupt-source.wav",
            std::process::id()
        ));
        std::fs::write(&path, b"definitely not a RIFF header").unwrap();

        let config = SourceConfig::default();
        let source = AudioSource::open_or_fallback(&path, &config);
        let _ = std::fs::remove_file(&path);

        assert!(source.is_fallback());
        assert_eq!(source.sample_rate(), config.fallback_sample_rate_hz);
    }

    #[test]
    fn test_frame_distance_wraps_when_looping() {
        assert_eq!(frame_distance(1, 99, 100, true), 2);
        assert_eq!(frame_distance(1, 99, 100, false), 98);
    }
}
