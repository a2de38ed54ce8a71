//! Orbit camera circling the sphere, sped up by loudness.

use glam::{Mat4, Vec3};

use crate::params::{OrbitCameraParams, RenderConfig};

/// Camera on a tilted circular orbit around the origin
pub struct OrbitCamera {
    params: OrbitCameraParams,
    /// Current orbit angle around the Y axis (radians)
    azimuth_rad: f32,
}

impl OrbitCamera {
    pub fn new(params: OrbitCameraParams) -> Self {
        Self {
            params,
            azimuth_rad: 0.0,
        }
    }

    /// Orbit rate for a loudness value (degrees per second)
    ///
    /// Below the loudness gate the orbit drifts at a fraction of the base rate.
    pub fn rate_deg_per_s(&self, loudness: f32) -> f32 {
        let p = &self.params;
        if loudness <= p.loudness_gate {
            p.base_rate_deg_per_s * p.quiet_rate_fraction
        } else {
            p.base_rate_deg_per_s + p.loudness_boost_deg_per_s * loudness
        }
    }

    /// Advance the orbit by `dt_s` seconds at the loudness-dependent rate
    pub fn advance(&mut self, dt_s: f32, loudness: f32) {
        if !(dt_s > 0.0) {
            return;
        }
        let step = self.rate_deg_per_s(loudness).to_radians() * dt_s;
        self.azimuth_rad = (self.azimuth_rad + step).rem_euclid(std::f32::consts::TAU);
    }

    pub fn azimuth_rad(&self) -> f32 {
        self.azimuth_rad
    }

    /// Eye position: `distance` from the origin, `tilt` above the equator plane
    pub fn eye(&self) -> Vec3 {
        let tilt = self.params.tilt_degrees.to_radians();
        let d = self.params.distance;
        let horizontal = d * tilt.cos();
        Vec3::new(
            horizontal * self.azimuth_rad.sin(),
            d * tilt.sin(),
            horizontal * self.azimuth_rad.cos(),
        )
    }

    /// Create view-projection matrix for rendering
    ///
    /// # Returns
    /// Tuple of (view_proj_matrix, camera_position)
    pub fn view_proj(&self, render_config: &RenderConfig, aspect_ratio: f32) -> (Mat4, Vec3) {
        let eye = self.eye();

        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            aspect_ratio,
            render_config.near_plane,
            render_config.far_plane,
        );

        (proj * view, eye)
    }
}
