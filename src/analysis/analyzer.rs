//! Spectrum analyzer: window, FFT, log-spaced bands, loudness, smoothing.

use std::sync::Arc;

use rustfft::{num_complex::Complex, FftPlanner};

use super::bands::{hann_window, BandLayout};
use super::smoothing::AttackDecay;
use super::snapshot::{clamp_unit, SnapshotReader, SnapshotSlot, SpectrumSnapshot};
use crate::audio::SampleChunk;
use crate::error::{PipelineError, Result};
use crate::params::AnalysisConfig;

/// Turns sample chunks into smoothed, normalized spectrum snapshots
pub struct SpectrumAnalyzer {
    config: AnalysisConfig,
    planner: FftPlanner<f32>,
    layout: Option<BandLayout>,
    smoothing: AttackDecay,

    /// Running peak of raw band magnitudes (normalization denominator)
    running_peak: f32,
    smoothed_bands: Vec<f32>,
    smoothed_loudness: f32,
    sequence: u64,
    slot: SnapshotSlot,

    // Scratch buffers reused across chunks
    samples: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    raw_bands: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        log::info!(
            "Analysis: {} log-spaced bands ({}-{} Hz), FFT {}, attack {}, decay {}",
            config.band_count,
            config.min_band_hz,
            config.max_band_hz,
            config.fft_size,
            config.attack,
            config.decay
        );

        let band_count = config.band_count;
        Ok(Self {
            smoothing: AttackDecay::new(config.attack, config.decay),
            planner: FftPlanner::new(),
            layout: None,
            running_peak: 0.0,
            smoothed_bands: vec![0.0; band_count],
            smoothed_loudness: 0.0,
            sequence: 0,
            slot: SnapshotSlot::new(band_count),
            samples: Vec::new(),
            spectrum: Vec::new(),
            magnitudes: Vec::new(),
            raw_bands: Vec::with_capacity(band_count),
            config,
        })
    }

    /// Analyze one chunk and publish the resulting snapshot
    ///
    /// Never fails: short chunks are zero-padded and non-finite samples are
    /// treated as silence.
    pub fn feed(&mut self, chunk: &SampleChunk) {
        let anomalies = self.load_samples(chunk.samples());
        if anomalies > 0 {
            log::debug!("{}", PipelineError::NumericalAnomaly { count: anomalies });
        }
        if self.samples.len() < self.config.fft_size {
            log::debug!(
                "{}; zero-padding",
                PipelineError::AnalysisUnderrun {
                    got: self.samples.len(),
                    expected: self.config.fft_size,
                }
            );
        }

        self.compute_raw_bands(chunk.sample_rate());
        let targets = self.normalize_bands();
        let loudness = clamp_unit(rms(&self.samples) / self.config.loudness_reference_rms);

        self.smoothing.apply(&mut self.smoothed_bands, &targets);
        self.smoothed_loudness = self.smoothing.step(self.smoothed_loudness, loudness);

        self.sequence += 1;
        self.slot.publish(SpectrumSnapshot::new(
            self.smoothed_bands.clone(),
            self.smoothed_loudness,
            self.sequence,
            chunk.start_frame(),
        ));
    }

    /// Current snapshot (zeroed with sequence 0 before the first `feed`)
    pub fn latest_snapshot(&self) -> Arc<SpectrumSnapshot> {
        self.slot.latest()
    }

    /// Handle for reading snapshots from another thread
    pub fn reader(&self) -> SnapshotReader {
        self.slot.reader()
    }

    pub fn band_count(&self) -> usize {
        self.config.band_count
    }

    /// Nominal chunk length (shorter chunks are zero-padded up to it)
    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    /// Layout used for the most recent chunk
    pub fn band_layout(&self) -> Option<&BandLayout> {
        self.layout.as_ref()
    }

    /// Copy samples, zeroing NaN/Inf and clamping to [-1, 1]; returns the anomaly count
    fn load_samples(&mut self, input: &[f32]) -> usize {
        let mut anomalies = 0;
        self.samples.clear();
        self.samples.extend(input.iter().map(|&s| {
            if s.is_finite() {
                s.clamp(-1.0, 1.0)
            } else {
                anomalies += 1;
                0.0
            }
        }));
        anomalies
    }

    fn compute_raw_bands(&mut self, sample_rate: u32) {
        let len = self.samples.len();
        let fft_size = len.next_power_of_two().max(self.config.fft_size);

        if sample_rate == 0 || len == 0 {
            self.raw_bands.clear();
            self.raw_bands.resize(self.config.band_count, 0.0);
            return;
        }

        // Window over the real samples, zero-pad the rest
        self.spectrum.clear();
        let mut window_sum = 0.0;
        for (i, &s) in self.samples.iter().enumerate() {
            let w = hann_window(i, len);
            window_sum += w;
            self.spectrum.push(Complex::new(s * w, 0.0));
        }
        self.spectrum.resize(fft_size, Complex::new(0.0, 0.0));

        let fft = self.planner.plan_fft_forward(fft_size);
        fft.process(&mut self.spectrum);

        // Scale so a full-bin sine of amplitude A reads A
        let scale = if window_sum > f32::EPSILON {
            2.0 / window_sum
        } else {
            0.0
        };
        self.magnitudes.clear();
        self.magnitudes.extend(
            self.spectrum[..=fft_size / 2]
                .iter()
                .map(|c| finite_or_zero(c.norm() * scale)),
        );

        let layout_is_current = self
            .layout
            .as_ref()
            .is_some_and(|layout| layout.matches(fft_size, sample_rate));
        if !layout_is_current {
            self.layout = Some(BandLayout::log_spaced(
                self.config.band_count,
                fft_size,
                sample_rate,
                self.config.min_band_hz,
                self.config.max_band_hz,
            ));
        }
        if let Some(layout) = &self.layout {
            layout.reduce(&self.magnitudes, &mut self.raw_bands);
        }
    }

    /// Divide by the decaying running peak, floored away from zero
    fn normalize_bands(&mut self) -> Vec<f32> {
        let chunk_peak = self.raw_bands.iter().copied().fold(0.0f32, f32::max);
        self.running_peak = chunk_peak.max(self.running_peak * self.config.peak_decay);
        let denominator = self.running_peak.max(self.config.normalization_floor);

        self.raw_bands
            .iter()
            .map(|&b| clamp_unit(b / denominator))
            .collect()
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Root mean square of the samples (0 for an empty slice)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_square.sqrt()
}
