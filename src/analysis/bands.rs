//! Window function and log-spaced grouping of FFT bins into bands.

use std::f32::consts::PI;
use std::ops::Range;

use crate::params::AnalysisConfig;

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size <= 1 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Contiguous, non-overlapping bin ranges, one per band, low to high frequency
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    ranges: Vec<Range<usize>>,
    fft_size: usize,
    sample_rate: u32,
}

impl BandLayout {
    /// Log-spaced bands between `min_hz` and `max_hz` (clipped to Nyquist)
    ///
    /// Every band covers at least one bin; where the log spacing is finer than
    /// the bin resolution (low frequencies) bands are one bin wide and the
    /// remaining edges shift up. Bin 0 (DC) is never included.
    /// `band_count` must not exceed `fft_size / 2`.
    pub fn log_spaced(
        band_count: usize,
        fft_size: usize,
        sample_rate: u32,
        min_hz: f32,
        max_hz: f32,
    ) -> Self {
        let nyquist_bin = fft_size / 2;
        let max_hz = max_hz.min(sample_rate as f32 / 2.0);
        let min_hz = min_hz.min(max_hz * 0.5).max(f32::MIN_POSITIVE);
        let ratio = max_hz / min_hz;

        let mut edges: Vec<usize> = Vec::with_capacity(band_count + 1);
        for k in 0..=band_count {
            let hz = min_hz * ratio.powf(k as f32 / band_count as f32);
            let mut bin =
                AnalysisConfig::hz_to_bin(hz, fft_size, sample_rate).clamp(1, nyquist_bin + 1);
            if let Some(&prev) = edges.last() {
                bin = bin.max(prev + 1);
            }
            edges.push(bin);
        }

        // Pull edges back under the top of the spectrum
        edges[band_count] = edges[band_count].min(nyquist_bin + 1);
        for k in (0..band_count).rev() {
            edges[k] = edges[k].min(edges[k + 1] - 1).max(1);
        }

        let ranges = edges.windows(2).map(|w| w[0]..w[1]).collect();

        Self {
            ranges,
            fft_size,
            sample_rate,
        }
    }

    pub fn band_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Whether this layout was built for the given transform
    pub fn matches(&self, fft_size: usize, sample_rate: u32) -> bool {
        self.fft_size == fft_size && self.sample_rate == sample_rate
    }

    /// Band whose bin range contains `hz`, if any
    pub fn band_for_frequency(&self, hz: f32) -> Option<usize> {
        let bin = AnalysisConfig::hz_to_bin(hz, self.fft_size, self.sample_rate);
        self.ranges.iter().position(|r| r.contains(&bin))
    }

    /// Mean magnitude per band; `magnitudes` holds bins `0..=fft_size / 2`
    pub fn reduce(&self, magnitudes: &[f32], out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.ranges.iter().map(|range| {
            let end = range.end.min(magnitudes.len());
            let start = range.start.min(end);
            let bins = &magnitudes[start..end];
            if bins.is_empty() {
                0.0
            } else {
                bins.iter().sum::<f32>() / bins.len() as f32
            }
        }));
    }
}
