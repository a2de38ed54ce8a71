//! End-to-end: source -> analyzer -> geometry, without audio device or GPU.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pulsesphere::analysis::{SpectrumAnalyzer, SpectrumSnapshot};
use pulsesphere::audio::{AudioSource, ChunkRead, PipelineHandle};
use pulsesphere::params::{AnalysisConfig, Config, SourceConfig, SphereParams};
use pulsesphere::sphere::{BaseGeometry, GeometryModel};
use pulsesphere::visualizer::Visualizer;

fn muted_source_config(path: &str) -> SourceConfig {
    SourceConfig {
        path: path.into(),
        enable_output: false,
        ..SourceConfig::default()
    }
}

#[test]
fn missing_file_falls_back_and_drives_geometry() {
    let config = muted_source_config("no/such/file.wav");
    let mut source = AudioSource::open_or_fallback(Path::new("no/such/file.wav"), &config);
    assert!(source.is_fallback());
    assert_eq!(source.sample_rate(), config.fallback_sample_rate_hz);

    let analysis = AnalysisConfig::default();
    let mut analyzer = SpectrumAnalyzer::new(analysis.clone()).unwrap();
    for _ in 0..8 {
        match source.read_next_chunk(analysis.fft_size) {
            ChunkRead::Chunk(chunk) => analyzer.feed(&chunk),
            ChunkRead::EndOfStream => panic!("fallback tone ended early"),
        }
    }

    let snapshot = analyzer.latest_snapshot();
    assert_eq!(snapshot.sequence(), 8);
    assert!(snapshot.loudness() > 0.0);
    assert!(snapshot.bands().iter().all(|b| (0.0..=1.0).contains(b)));

    // The 440 Hz test tone lands in the band that covers 440 Hz
    let layout = analyzer.band_layout().unwrap();
    assert_eq!(snapshot.peak_band(), layout.band_for_frequency(440.0));

    let params = SphereParams {
        subdivision_level: 2,
        ..SphereParams::default()
    };
    let base = Arc::new(BaseGeometry::build(2, params.base_radius));
    let mut model = GeometryModel::new(Arc::clone(&base), params, analysis.band_count);
    let displaced = model.displace(&snapshot, 0.5);

    assert_eq!(displaced.len(), 162);
    for v in displaced.vertices() {
        assert!(v.position.iter().all(|c| c.is_finite()));
        assert!(v.normal.iter().all(|c| c.is_finite()));
    }
}

#[test]
fn corrupt_file_falls_back_and_drives_geometry() {
    let path = std::env::temp_dir().join(format!(
        "pulsesphere-it-{}-corrupt.wav",
        std::process::id()
    ));
    std::fs::write(&path, b"this is not a wav file at all").unwrap();

    let config = muted_source_config(path.to_str().unwrap());
    let mut source = AudioSource::open_or_fallback(&path, &config);
    let _ = std::fs::remove_file(&path);
    assert!(source.is_fallback());

    let analysis = AnalysisConfig::default();
    let mut analyzer = SpectrumAnalyzer::new(analysis.clone()).unwrap();
    match source.read_next_chunk(analysis.fft_size) {
        ChunkRead::Chunk(chunk) => analyzer.feed(&chunk),
        ChunkRead::EndOfStream => panic!("fallback buffer is empty"),
    }
    let snapshot = analyzer.latest_snapshot();
    assert!(snapshot.loudness() > 0.0);

    let params = SphereParams::default();
    let base = Arc::new(BaseGeometry::build(2, params.base_radius));
    let mut model = GeometryModel::new(base, params, analysis.band_count);
    let displaced = model.displace(&snapshot, 0.0);

    assert_eq!(displaced.len(), 162);
    for v in displaced.vertices() {
        assert!(v.position.iter().all(|c| c.is_finite()));
        assert!(v.normal.iter().all(|c| c.is_finite()));
    }
}

#[test]
fn silent_geometry_without_noise_matches_base() {
    let params = SphereParams {
        noise_weight: 0.0,
        ..SphereParams::default()
    };
    let base = Arc::new(BaseGeometry::build(2, params.base_radius));
    let mut model = GeometryModel::new(Arc::clone(&base), params, 32);

    let displaced = model.displace(&SpectrumSnapshot::zeroed(32), 3.0);
    for (i, p) in base.positions().iter().enumerate() {
        assert_eq!(displaced.position(i), *p);
    }
}

#[test]
fn running_pipeline_feeds_the_visualizer() {
    let mut config = Config::default();
    config.source = muted_source_config("no/such/file.wav");
    config.source.loop_playback = true;
    config.sphere.subdivision_level = 2;

    let mut pipeline = PipelineHandle::spawn(&config.source, config.analysis.clone()).unwrap();
    assert!(pipeline.is_fallback());

    let mut visualizer = Visualizer::new(&config, pipeline.reader(), Some(pipeline.cursor()));

    let deadline = Instant::now() + Duration::from_secs(3);
    let mut sequence = 0;
    let mut time_s = 0.0;
    while sequence < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
        time_s += 0.01;
        let frame = visualizer.frame(time_s, 16.0 / 9.0);
        assert_eq!(frame.vertices.len(), 162);
        sequence = frame.sequence;
    }

    assert!(sequence >= 2, "no snapshots reached the render side");
    assert!(visualizer.playback_seconds().is_some());

    pipeline.stop();
    assert!(!pipeline.is_running());
}
