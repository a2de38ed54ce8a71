//! Per-frame displacement of the base sphere from spectrum snapshots.
//!
//! Each vertex is bound to one band by its latitude, so the low bands sit at
//! the south pole and the high bands at the north pole. The displacement
//! target mixes band energy, overall loudness and slow 4D simplex noise; a
//! per-vertex exponential filter keeps single vertices from popping.

use std::sync::Arc;

use glam::Vec3;
use noise::{NoiseFn, OpenSimplex};

use super::mesh::{BaseGeometry, Vertex};
use crate::analysis::SpectrumSnapshot;
use crate::params::SphereParams;

/// Displaced vertices for one frame, ready for upload
#[derive(Debug, Clone, Default)]
pub struct DisplacedGeometry {
    vertices: Vec<Vertex>,
}

impl DisplacedGeometry {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_array(self.vertices[index].position)
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        Vec3::from_array(self.vertices[index].normal)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Maps snapshots onto the sphere; owns the smoothing state between frames
pub struct GeometryModel {
    base: Arc<BaseGeometry>,
    params: SphereParams,
    band_of_vertex: Vec<usize>,
    band_count: usize,
    /// Smoothed displacement scalar per vertex (world units)
    displacement: Vec<f32>,
    simplex: OpenSimplex,
    output: DisplacedGeometry,
}

impl GeometryModel {
    pub fn new(base: Arc<BaseGeometry>, params: SphereParams, band_count: usize) -> Self {
        let band_of_vertex = base
            .normals()
            .iter()
            .map(|n| band_for_normal(*n, band_count))
            .collect();
        let vertex_count = base.vertex_count();

        let vertices = base
            .positions()
            .iter()
            .zip(base.normals())
            .map(|(p, n)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
                level: 0.0,
            })
            .collect();

        Self {
            simplex: OpenSimplex::new(params.noise_seed),
            base,
            params,
            band_of_vertex,
            band_count,
            displacement: vec![0.0; vertex_count],
            output: DisplacedGeometry { vertices },
        }
    }

    pub fn base(&self) -> &Arc<BaseGeometry> {
        &self.base
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Band a vertex is bound to; fixed for the model's lifetime
    pub fn band_of_vertex(&self, index: usize) -> usize {
        self.band_of_vertex[index]
    }

    /// Ambient noise in roughly [-1, 1] at a unit normal and time (seconds)
    pub fn ambient_noise(&self, normal: Vec3, time_s: f32) -> f32 {
        let f = self.params.noise_frequency as f64;
        self.simplex.get([
            normal.x as f64 * f,
            normal.y as f64 * f,
            normal.z as f64 * f,
            (time_s * self.params.noise_speed) as f64,
        ]) as f32
    }

    /// Displace every base vertex along its normal and recompute normals
    ///
    /// The previous frame's buffer is reused; only the smoothing state carries over.
    pub fn displace(&mut self, snapshot: &SpectrumSnapshot, time_s: f32) -> &DisplacedGeometry {
        let p = &self.params;
        let loudness = snapshot.loudness();
        let smoothing = p.vertex_smoothing;
        let noise_enabled = p.noise_weight != 0.0;

        let positions = self.base.positions();
        let normals = self.base.normals();

        for i in 0..positions.len() {
            let band = snapshot.band(self.band_of_vertex[i]);
            let noise = if noise_enabled {
                self.ambient_noise(normals[i], time_s)
            } else {
                0.0
            };

            let target = p.base_radius
                * (p.band_weight * band + p.loudness_weight * loudness + p.noise_weight * noise);
            let target = if target.is_finite() { target } else { 0.0 };

            let previous = self.displacement[i];
            let smoothed = previous + smoothing * (target - previous);
            self.displacement[i] = smoothed;

            let vertex = &mut self.output.vertices[i];
            vertex.position = (positions[i] + normals[i] * smoothed).to_array();
            vertex.level = band;
        }

        self.recompute_normals();
        &self.output
    }

    pub fn displaced(&self) -> &DisplacedGeometry {
        &self.output
    }

    /// Area-weighted vertex normals of the displaced surface
    fn recompute_normals(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.output.vertices.len()];

        for &[a, b, c] in self.base.faces() {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            let pa = self.output.position(a);
            let pb = self.output.position(b);
            let pc = self.output.position(c);

            // Cross product length is twice the triangle area
            let face_normal = (pb - pa).cross(pc - pa);
            accumulated[a] += face_normal;
            accumulated[b] += face_normal;
            accumulated[c] += face_normal;
        }

        for ((vertex, sum), base_normal) in self
            .output
            .vertices
            .iter_mut()
            .zip(accumulated)
            .zip(self.base.normals())
        {
            vertex.normal = sum.try_normalize().unwrap_or(*base_normal).to_array();
        }
    }
}

/// Latitude band: south pole (y = -1) maps to band 0, north pole to the last band
fn band_for_normal(normal: Vec3, band_count: usize) -> usize {
    if band_count == 0 {
        return 0;
    }
    let t = ((normal.y + 1.0) * 0.5).clamp(0.0, 1.0);
    ((t * band_count as f32) as usize).min(band_count - 1)
}
