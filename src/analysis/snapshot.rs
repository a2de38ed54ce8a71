//! Versioned analysis results and the slot that publishes them across threads.
//!
//! The audio-delivery thread is the only writer. Publication swaps an `Arc`
//! under a mutex held for a pointer copy, so a reader either sees the whole
//! previous snapshot or the whole new one.

use std::sync::{Arc, Mutex, PoisonError};

/// Latest band magnitudes and loudness, all in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSnapshot {
    bands: Vec<f32>,
    loudness: f32,
    sequence: u64,
    source_frame: u64,
}

impl SpectrumSnapshot {
    /// Build a snapshot, clamping every value into [0, 1] (non-finite → 0)
    pub fn new(bands: Vec<f32>, loudness: f32, sequence: u64, source_frame: u64) -> Self {
        let bands = bands.into_iter().map(clamp_unit).collect();
        Self {
            bands,
            loudness: clamp_unit(loudness),
            sequence,
            source_frame,
        }
    }

    /// Snapshot seen before any chunk has been analyzed
    pub fn zeroed(band_count: usize) -> Self {
        Self {
            bands: vec![0.0; band_count],
            loudness: 0.0,
            sequence: 0,
            source_frame: 0,
        }
    }

    pub fn bands(&self) -> &[f32] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> f32 {
        self.bands.get(index).copied().unwrap_or(0.0)
    }

    pub fn loudness(&self) -> f32 {
        self.loudness
    }

    /// Strictly increasing per analyzed chunk; 0 means "nothing analyzed yet"
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// First frame of the chunk this snapshot was computed from
    pub fn source_frame(&self) -> u64 {
        self.source_frame
    }

    /// Index of the strongest band (first one on ties)
    pub fn peak_band(&self) -> Option<usize> {
        self.bands
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((i, v)),
            })
            .map(|(i, _)| i)
    }
}

/// Clamp into [0, 1], mapping NaN and infinities to 0
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Single-writer slot holding the current snapshot
#[derive(Debug, Clone)]
pub struct SnapshotSlot {
    current: Arc<Mutex<Arc<SpectrumSnapshot>>>,
}

impl SnapshotSlot {
    pub fn new(band_count: usize) -> Self {
        Self {
            current: Arc::new(Mutex::new(Arc::new(SpectrumSnapshot::zeroed(band_count)))),
        }
    }

    /// Replace the current snapshot; older or equal sequence numbers are ignored
    pub fn publish(&self, snapshot: SpectrumSnapshot) -> bool {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if snapshot.sequence > current.sequence {
            *current = snapshot;
            true
        } else {
            false
        }
    }

    pub fn latest(&self) -> Arc<SpectrumSnapshot> {
        Arc::clone(&self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            last: self.latest(),
            slot: self.clone(),
        }
    }
}

/// Render-side handle that never goes back to an older snapshot
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    slot: SnapshotSlot,
    last: Arc<SpectrumSnapshot>,
}

impl SnapshotReader {
    pub fn latest(&mut self) -> Arc<SpectrumSnapshot> {
        let fetched = self.slot.latest();
        if fetched.sequence >= self.last.sequence {
            self.last = fetched;
        }
        Arc::clone(&self.last)
    }

    /// Sequence number of the snapshot most recently returned by `latest`
    pub fn last_sequence(&self) -> u64 {
        self.last.sequence
    }
}
