//! Audio decoding, playback and the audio-delivery thread.
//!
//! The source owns the decoded mono buffer and the output device; the
//! pipeline thread slices it into chunks aligned with what is audible and
//! hands them to the spectrum analyzer.

pub mod decode;
mod output;
pub mod pipeline;
mod source;

use std::sync::Arc;
use std::time::Duration;

// Re-export public types
pub use decode::DecodedAudio;
pub use pipeline::PipelineHandle;
pub use source::{AudioSource, ChunkRead, PlaybackCursor};

/// Fixed-length run of mono samples normalized to [-1, 1]
///
/// Immutable once built; cloning shares the sample storage.
#[derive(Debug, Clone)]
pub struct SampleChunk {
    samples: Arc<[f32]>,
    sample_rate: u32,
    start_frame: u64,
}

impl SampleChunk {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32, start_frame: u64) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            start_frame,
        }
    }

    /// All-zero chunk (used once playback has ended)
    pub fn silent(len: usize, sample_rate: u32, start_frame: u64) -> Self {
        Self::new(vec![0.0; len], sample_rate, start_frame)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Index of the first sample within the source buffer
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate.max(1) as f64)
    }
}
