//! Orbit camera configuration.

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Orbit camera circling the sphere at a fixed tilt
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrbitCameraParams {
    /// Distance from the sphere center (world units)
    pub distance: f32,

    /// Elevation above the equator plane (degrees)
    pub tilt_degrees: f32,

    /// Orbit rate while audio is active (degrees per second)
    pub base_rate_deg_per_s: f32,

    /// Fraction of the base rate used while loudness is below the gate
    pub quiet_rate_fraction: f32,

    /// Extra orbit rate per unit loudness (degrees per second)
    pub loudness_boost_deg_per_s: f32,

    /// Loudness below which the orbit slows to the quiet rate
    pub loudness_gate: f32,
}

impl Default for OrbitCameraParams {
    fn default() -> Self {
        Self {
            distance: 10.0,
            tilt_degrees: 20.0,
            base_rate_deg_per_s: 1.2,
            quiet_rate_fraction: 0.3,
            loudness_boost_deg_per_s: 4.8,
            loudness_gate: 0.02,
        }
    }
}

impl OrbitCameraParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.distance > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "camera distance must be > 0, got {}",
                self.distance
            )));
        }
        if !(0.0..=1.0).contains(&self.quiet_rate_fraction) {
            return Err(PipelineError::InvalidConfig(format!(
                "quiet rate fraction must be in [0, 1], got {}",
                self.quiet_rate_fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(OrbitCameraParams::default().validate().is_ok());
    }

    #[test]
    fn test_camera_inside_sphere_center_rejected() {
        let params = OrbitCameraParams {
            distance: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
