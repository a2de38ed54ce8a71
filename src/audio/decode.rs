//! PCM WAV decoding and synthetic fallback buffers.

use std::f32::consts::PI;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use hound::{SampleFormat, WavReader};

use crate::error::{PipelineError, Result};

/// Decoded audio reduced to a single analysis channel
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1, 1]
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
    /// Channel count of the original file (1 for synthetic buffers)
    pub source_channels: u16,
}

impl DecodedAudio {
    pub fn frame_count(&self) -> u64 {
        self.samples.len() as u64
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode a PCM WAV file, averaging all channels down to mono
pub fn load_wav(path: &Path) -> Result<DecodedAudio> {
    let mut reader = WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(ref io) if io.kind() == ErrorKind::NotFound => {
            PipelineError::SourceNotFound(path.to_path_buf())
        }
        other => PipelineError::UnsupportedFormat(format!("{}: {}", path.display(), other)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 || spec.sample_rate == 0 {
        return Err(PipelineError::UnsupportedFormat(format!(
            "{}: {} channels @ {} Hz",
            path.display(),
            channels,
            spec.sample_rate
        )));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| PipelineError::UnsupportedFormat(e.to_string()))?,
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| PipelineError::UnsupportedFormat(e.to_string()))?
        }
        (format, bits) => {
            return Err(PipelineError::UnsupportedFormat(format!(
                "{}: {:?} {}-bit samples",
                path.display(),
                format,
                bits
            )))
        }
    };

    let mono: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    if mono.is_empty() {
        return Err(PipelineError::UnsupportedFormat(format!(
            "{}: no audio frames",
            path.display()
        )));
    }

    Ok(DecodedAudio {
        samples: mono.into(),
        sample_rate: spec.sample_rate,
        source_channels: spec.channels,
    })
}

/// Deterministic sine buffer; amplitude 0 yields silence
pub fn synthesize_tone(
    frequency_hz: f32,
    amplitude: f32,
    sample_rate: u32,
    duration_s: f32,
) -> DecodedAudio {
    let frames = (sample_rate as f32 * duration_s).round().max(1.0) as usize;
    let step = 2.0 * PI * frequency_hz / sample_rate as f32;

    let samples: Vec<f32> = (0..frames)
        .map(|i| amplitude * (step * i as f32).sin())
        .collect();

    DecodedAudio {
        samples: samples.into(),
        sample_rate,
        source_channels: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pulsesphere-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let result = load_wav(Path::new("no/such/dir/output.wav"));
        assert!(matches!(result, Err(PipelineError::SourceNotFound(_))));
    }

    #[test]
    fn test_garbage_file_is_unsupported_format() {
        let path = temp_path("garbage.wav");
        std::fs::write(&path, b"definitely not a RIFF header").unwrap();

        let result = load_wav(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_stereo_int16_is_downmixed() {
        let path = temp_path("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16_384i16).unwrap(); // 0.5
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = load_wav(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(decoded.sample_rate, 8_000);
        assert_eq!(decoded.source_channels, 2);
        assert_eq!(decoded.samples.len(), 100);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_float_wav_round_values() {
        let path = temp_path("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0.0f32, 0.5, -0.5, 1.0] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = load_wav(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(&decoded.samples[..], &[0.0, 0.5, -0.5, 1.0]);
    }

    #[test]
    fn test_synthesized_tone_matches_request() {
        let tone = synthesize_tone(440.0, 0.3, 24_000, 5.0);
        assert_eq!(tone.samples.len(), 120_000);
        assert!((tone.duration_secs() - 5.0).abs() < 1e-6);

        let peak = tone.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.3 + 1e-6);
        assert!(peak > 0.29);
    }

    #[test]
    fn test_zero_amplitude_is_silence() {
        let tone = synthesize_tone(440.0, 0.0, 24_000, 0.1);
        assert!(tone.samples.iter().all(|&s| s == 0.0));
    }
}
