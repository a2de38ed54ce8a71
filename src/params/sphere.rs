//! Sphere mesh parameters and audio-reactive displacement weights.

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Sphere geometry and displacement mapping
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SphereParams {
    /// Icosphere recursion depth (level 4 = 2,562 vertices)
    pub subdivision_level: u32,

    /// Undisplaced sphere radius (world units)
    pub base_radius: f32,

    /// k1: band magnitude → displacement (fraction of radius per unit band)
    pub band_weight: f32,

    /// k2: loudness → displacement (fraction of radius per unit loudness)
    pub loudness_weight: f32,

    /// k3: ambient noise → displacement (fraction of radius per unit noise)
    pub noise_weight: f32,

    /// Spatial frequency of the ambient noise (cycles per unit normal)
    pub noise_frequency: f32,

    /// Time scaling of the ambient noise (dimensionless)
    pub noise_speed: f32,

    /// Noise seed
    pub noise_seed: u32,

    /// Per-vertex smoothing factor (0, 1]; 1 = follow target immediately
    pub vertex_smoothing: f32,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            subdivision_level: 4,
            base_radius: 3.0,
            // Audio terms dominate: full band energy moves a vertex 25% of the
            // radius, ambient noise never more than 2%
            band_weight: 0.25,
            loudness_weight: 0.08,
            noise_weight: 0.02,
            noise_frequency: 1.2,
            noise_speed: 0.15,
            noise_seed: 42,
            vertex_smoothing: 0.5,
        }
    }
}

impl SphereParams {
    /// Largest accepted subdivision level (level 7 = 163,842 vertices)
    pub const MAX_SUBDIVISION_LEVEL: u32 = 7;

    pub fn validate(&self) -> Result<()> {
        if self.subdivision_level > Self::MAX_SUBDIVISION_LEVEL {
            return Err(PipelineError::InvalidConfig(format!(
                "subdivision level must be <= {}, got {}",
                Self::MAX_SUBDIVISION_LEVEL,
                self.subdivision_level
            )));
        }
        if !(self.base_radius > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "base radius must be > 0, got {}",
                self.base_radius
            )));
        }
        if !(self.vertex_smoothing > 0.0 && self.vertex_smoothing <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "vertex smoothing must be in (0, 1], got {}",
                self.vertex_smoothing
            )));
        }
        Ok(())
    }
}
