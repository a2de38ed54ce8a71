//! Rendering and frame pacing configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Rendering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Vertical field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,

    /// Target frame rate (Hz)
    pub target_fps: u32,

    /// How often the window title (playback time, level, FPS) refreshes (seconds)
    pub title_refresh_s: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 50.0,
            target_fps: 60,
            title_refresh_s: 0.5,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }

    /// Wall-clock budget for a single frame
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_fps == 0 {
            return Err(PipelineError::InvalidConfig(
                "target frame rate must be > 0".to_string(),
            ));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(PipelineError::InvalidConfig(
                "window size must be non-zero".to_string(),
            ));
        }
        if !(self.near_plane > 0.0 && self.far_plane > self.near_plane) {
            return Err(PipelineError::InvalidConfig(format!(
                "clip planes must satisfy 0 < near < far, got {}..{}",
                self.near_plane, self.far_plane
            )));
        }
        if !(self.title_refresh_s > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "title refresh interval must be > 0, got {}",
                self.title_refresh_s
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval_at_60_fps() {
        let config = RenderConfig::default();
        let interval = config.frame_interval();
        assert!((interval.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_fps_rejected() {
        let config = RenderConfig {
            target_fps: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
