//! PulseSphere library - audio-reactive sphere visualization

pub mod analysis;
pub mod audio;
pub mod camera;
pub mod cli;
pub mod error;
pub mod params;
pub mod rendering;
pub mod sphere;
pub mod visualizer;

pub use error::{PipelineError, Result};
