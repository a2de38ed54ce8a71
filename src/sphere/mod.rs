//! Deformable sphere: static icosphere plus per-frame audio-driven displacement.

mod mesh;
mod model;

pub use mesh::{vertex_count_for_level, BaseGeometry, Vertex};
pub use model::{DisplacedGeometry, GeometryModel};
