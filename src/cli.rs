//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::params::{Config, DEFAULT_CONFIG_FILE};

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "pulsesphere")]
#[command(about = "Audio-reactive sphere visualizer", long_about = None)]
pub struct Args {
    /// WAV file to play and analyze (falls back to a test tone if missing)
    #[arg(value_name = "AUDIO")]
    pub audio: Option<PathBuf>,

    /// TOML config file (default: ./pulsesphere.toml if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of frequency bands
    #[arg(long, value_name = "N")]
    pub bands: Option<usize>,

    /// Icosphere subdivision level
    #[arg(long, value_name = "LEVEL")]
    pub subdivision: Option<u32>,

    /// Target frame rate
    #[arg(long, value_name = "HZ")]
    pub fps: Option<u32>,

    /// FFT window size (power of two)
    #[arg(long, value_name = "SAMPLES")]
    pub fft_size: Option<usize>,

    /// Analyze without audible output
    #[arg(long)]
    pub mute: bool,

    /// Loop playback instead of settling after the end
    #[arg(long = "loop")]
    pub loop_playback: bool,
}

impl Args {
    /// Config file to load: the explicit `--config` path, else the default name
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Apply command-line overrides on top of file/default configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(audio) = &self.audio {
            config.source.path = audio.clone();
        }
        if let Some(bands) = self.bands {
            config.analysis.band_count = bands;
        }
        if let Some(level) = self.subdivision {
            config.sphere.subdivision_level = level;
        }
        if let Some(fps) = self.fps {
            config.render.target_fps = fps;
        }
        if let Some(fft_size) = self.fft_size {
            config.analysis.fft_size = fft_size;
        }
        if self.mute {
            config.source.enable_output = false;
        }
        if self.loop_playback {
            config.source.loop_playback = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_config_untouched() {
        let args = Args::parse_from(["pulsesphere"]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.source.path, PathBuf::from("output.wav"));
        assert!(config.source.enable_output);
        assert_eq!(args.config_path(), PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "pulsesphere",
            "song.wav",
            "--bands",
            "16",
            "--subdivision",
            "3",
            "--fps",
            "30",
            "--fft-size",
            "2048",
            "--mute",
            "--loop",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.source.path, PathBuf::from("song.wav"));
        assert_eq!(config.analysis.band_count, 16);
        assert_eq!(config.sphere.subdivision_level, 3);
        assert_eq!(config.render.target_fps, 30);
        assert_eq!(config.analysis.fft_size, 2048);
        assert!(!config.source.enable_output);
        assert!(config.source.loop_playback);
        assert!(config.validate().is_ok());
    }
}
