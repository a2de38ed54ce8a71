//! Icosphere construction by recursive midpoint subdivision.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// GPU vertex: displaced position, recomputed normal, and the energy of the vertex's band
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub level: f32,
}

/// Vertex count of an icosphere at `level`: 10 * 4^level + 2 (level 2 = 162)
pub fn vertex_count_for_level(level: u32) -> usize {
    10 * 4usize.pow(level) + 2
}

/// Static sphere mesh, immutable once built
#[derive(Debug, Clone)]
pub struct BaseGeometry {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    faces: Vec<[u32; 3]>,
    radius: f32,
    level: u32,
}

impl BaseGeometry {
    /// Subdivide a regular icosahedron `level` times and project onto a sphere of `radius`
    ///
    /// Faces are wound counter-clockwise when seen from outside.
    pub fn build(level: u32, radius: f32) -> Self {
        let (mut unit, mut faces) = icosahedron();

        for _ in 0..level {
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
            let mut next_faces = Vec::with_capacity(faces.len() * 4);

            for &[a, b, c] in &faces {
                let ab = midpoint(&mut unit, &mut midpoints, a, b);
                let bc = midpoint(&mut unit, &mut midpoints, b, c);
                let ca = midpoint(&mut unit, &mut midpoints, c, a);

                next_faces.push([a, ab, ca]);
                next_faces.push([b, bc, ab]);
                next_faces.push([c, ca, bc]);
                next_faces.push([ab, bc, ca]);
            }
            faces = next_faces;
        }

        let positions = unit.iter().map(|&n| n * radius).collect();
        Self {
            positions,
            normals: unit,
            faces,
            radius,
            level,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Unit outward normals, one per vertex
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Flat index list for an index buffer
    pub fn indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.faces)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn subdivision_level(&self) -> u32 {
        self.level
    }
}

/// Unit icosahedron: 12 vertices, 20 outward-wound faces
fn icosahedron() -> (Vec<Vec3>, Vec<[u32; 3]>) {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;

    let vertices = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .iter()
    .map(|&v| Vec3::from_array(v).normalize())
    .collect();

    let faces = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    (vertices, faces)
}

/// Index of the unit-length midpoint of edge (a, b), shared between neighbouring faces
fn midpoint(
    vertices: &mut Vec<Vec3>,
    cache: &mut HashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = (a.min(b), a.max(b));
    *cache.entry(key).or_insert_with(|| {
        let mid = (vertices[a as usize] + vertices[b as usize]).normalize();
        vertices.push(mid);
        (vertices.len() - 1) as u32
    })
}
