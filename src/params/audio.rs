//! Spectrum analysis and audio source configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// FFT analysis configuration with band layout and smoothing coefficients
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum FFT size (must be power of 2); shorter chunks are zero-padded
    pub fft_size: usize,

    /// Number of log-spaced frequency bands (fixed for the process lifetime)
    pub band_count: usize,

    /// Lower edge of the first band (Hz)
    pub min_band_hz: f32,

    /// Upper edge of the last band (Hz), clipped to Nyquist
    pub max_band_hz: f32,

    /// Smoothing factor when a value rises (0, 1]; 1 = no smoothing
    pub attack: f32,

    /// Smoothing factor when a value falls (0, 1]
    pub decay: f32,

    /// Per-update decay of the running band peak used for normalization
    pub peak_decay: f32,

    /// Smallest normalization denominator (amplitude units, ~ -60 dB)
    pub normalization_floor: f32,

    /// RMS that maps to full loudness (0.25 ~ a 0.35 amplitude sine)
    pub loudness_reference_rms: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            band_count: 32,
            min_band_hz: 40.0,
            max_band_hz: 16_000.0,
            attack: 0.5,
            decay: 0.1,
            peak_decay: 0.995,
            normalization_floor: 1e-3,
            loudness_reference_rms: 0.25,
        }
    }
}

impl AnalysisConfig {
    /// Convert frequency (Hz) to FFT bin index for a transform of `fft_size`
    pub fn hz_to_bin(hz: f32, fft_size: usize, sample_rate_hz: u32) -> usize {
        ((hz * fft_size as f32) / sample_rate_hz as f32).round() as usize
    }

    /// Validate configuration (FFT size must be power of 2, coefficients in range, etc.)
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 16 {
            return Err(PipelineError::InvalidConfig(format!(
                "FFT size must be a power of 2 >= 16, got {}",
                self.fft_size
            )));
        }
        if self.band_count == 0 || self.band_count > self.fft_size / 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "band count must be in 1..={}, got {}",
                self.fft_size / 2,
                self.band_count
            )));
        }
        if !(self.min_band_hz > 0.0 && self.max_band_hz > self.min_band_hz) {
            return Err(PipelineError::InvalidConfig(format!(
                "band range must satisfy 0 < min < max, got {}..{} Hz",
                self.min_band_hz, self.max_band_hz
            )));
        }
        for (name, value) in [("attack", self.attack), ("decay", self.decay)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(self.peak_decay > 0.0 && self.peak_decay <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "peak decay must be in (0, 1], got {}",
                self.peak_decay
            )));
        }
        if !(self.normalization_floor > 0.0 && self.loudness_reference_rms > 0.0) {
            return Err(PipelineError::InvalidConfig(
                "normalization floor and loudness reference must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audio input and playback configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// PCM WAV file to visualize
    pub path: PathBuf,

    /// Wrap the playback cursor at the end of the buffer
    pub loop_playback: bool,

    /// Drive the audio output device (false = silent, wall-clock playback)
    pub enable_output: bool,

    /// Fallback tone frequency (Hz); the fallback is silence when amplitude is 0
    pub fallback_tone_hz: f32,

    /// Fallback tone peak amplitude [0, 1]
    pub fallback_amplitude: f32,

    /// Fallback buffer sample rate (Hz)
    pub fallback_sample_rate_hz: u32,

    /// Fallback buffer length (seconds)
    pub fallback_duration_s: f32,

    /// Largest drift between analysis and playback before the reader re-seeks (ms)
    pub max_sync_lag_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output.wav"),
            loop_playback: false,
            enable_output: true,
            fallback_tone_hz: 440.0,
            fallback_amplitude: 0.3,
            fallback_sample_rate_hz: 24_000,
            fallback_duration_s: 5.0,
            max_sync_lag_ms: 100,
        }
    }
}

impl SourceConfig {
    /// Lag bound expressed in frames at `sample_rate_hz`
    pub fn max_sync_lag_frames(&self, sample_rate_hz: u32) -> u64 {
        self.max_sync_lag_ms * sample_rate_hz as u64 / 1000
    }

    pub fn validate(&self) -> Result<()> {
        if self.fallback_sample_rate_hz == 0 {
            return Err(PipelineError::InvalidConfig(
                "fallback sample rate must be > 0".to_string(),
            ));
        }
        if !(self.fallback_duration_s > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "fallback duration must be > 0, got {}",
                self.fallback_duration_s
            )));
        }
        if !(0.0..=1.0).contains(&self.fallback_amplitude) {
            return Err(PipelineError::InvalidConfig(format!(
                "fallback amplitude must be in [0, 1], got {}",
                self.fallback_amplitude
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_to_bin() {
        // At 44100 Hz sample rate and 1024 FFT size:
        // Bin resolution = 44100 / 1024 ≈ 43.07 Hz per bin
        assert_eq!(AnalysisConfig::hz_to_bin(0.0, 1024, 44_100), 0);
        assert_eq!(AnalysisConfig::hz_to_bin(43.07, 1024, 44_100), 1);
        assert_eq!(AnalysisConfig::hz_to_bin(440.0, 1024, 44_100), 10);
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
        assert!(SourceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_power_of_two_fft() {
        let config = AnalysisConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_smoothing() {
        let config = AnalysisConfig {
            decay: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sync_lag_frames() {
        let config = SourceConfig::default();
        assert_eq!(config.max_sync_lag_frames(24_000), 2_400);
    }
}
