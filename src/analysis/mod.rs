//! Spectrum analysis: sample chunks in, smoothed band/loudness snapshots out.

mod analyzer;
mod bands;
mod smoothing;
mod snapshot;

// Re-export public types
pub use analyzer::{rms, SpectrumAnalyzer};
pub use bands::{hann_window, BandLayout};
pub use smoothing::AttackDecay;
pub use snapshot::{SnapshotReader, SnapshotSlot, SpectrumSnapshot};
