//! Error kinds for the audio-to-geometry pipeline.
//!
//! Only configuration and GPU setup errors are fatal. Source errors are
//! recovered by substituting synthetic audio, device errors are logged, and
//! analysis anomalies are clamped in place.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("audio source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("analysis underrun: got {got} samples, expected {expected}")]
    AnalysisUnderrun { got: usize, expected: usize },

    #[error("numerical anomaly: {count} non-finite samples clamped to zero")]
    NumericalAnomaly { count: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("render setup failed: {0}")]
    Render(String),
}

impl PipelineError {
    /// Whether the pipeline substitutes synthetic audio for this error.
    pub fn is_recoverable_source_error(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceNotFound(_) | PipelineError::UnsupportedFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_errors_are_recoverable() {
        let missing = PipelineError::SourceNotFound(PathBuf::from("x.wav"));
        assert!(missing.is_recoverable_source_error());
        assert!(PipelineError::UnsupportedFormat("mp3".into()).is_recoverable_source_error());
        assert!(!PipelineError::DeviceUnavailable("none".into()).is_recoverable_source_error());
    }

    #[test]
    fn test_display_names_path() {
        let err = PipelineError::SourceNotFound(PathBuf::from("missing.wav"));
        assert!(err.to_string().contains("missing.wav"));
    }
}
