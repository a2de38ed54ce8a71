//! Parameter definitions with physical units and documented semantics.
//!
//! All tunables live here with:
//! - Physical units (seconds, Hz, world units, etc.)
//! - Documented ranges and meanings
//! - A `validate()` that rejects values the pipeline cannot run with

mod audio;
mod camera;
mod render;
mod sphere;

use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, Result};

// Re-export all types
pub use audio::{AnalysisConfig, SourceConfig};
pub use camera::OrbitCameraParams;
pub use render::RenderConfig;
pub use sphere::SphereParams;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pulsesphere.toml";

/// Full configuration surface, one TOML table per section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub analysis: AnalysisConfig,
    pub sphere: SphereParams,
    pub render: RenderConfig,
    pub camera: OrbitCameraParams,
}

impl Config {
    /// Parse a TOML document; absent tables and fields keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PipelineError::InvalidConfig(e.to_string()))
    }

    /// Load from `path`, falling back to defaults when the file is missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if path.exists() {
                    log::warn!("Could not read {}: {}, using defaults", path.display(), e);
                }
                return Self::default();
            }
        };

        match Self::from_toml_str(&content) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.analysis.validate()?;
        self.sphere.validate()?;
        self.render.validate()?;
        self.camera.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [analysis]
            band_count = 16
            attack = 0.6

            [sphere]
            subdivision_level = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.band_count, 16);
        assert_eq!(config.analysis.attack, 0.6);
        assert_eq!(config.analysis.fft_size, AnalysisConfig::default().fft_size);
        assert_eq!(config.sphere.subdivision_level, 2);
        assert_eq!(config.render.target_fps, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = Config::from_toml_str("[analysis\nband_count = ");
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_or_default(Path::new("definitely/not/here.toml"));
        assert_eq!(config.analysis.band_count, AnalysisConfig::default().band_count);
    }
}
