//! Per-frame glue between the published snapshot, the sphere and the camera.
//!
//! Runs on the render thread. Nothing here blocks on audio: a frame always
//! uses whatever snapshot is current, even if it has not changed since the
//! last frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analysis::SnapshotReader;
use crate::audio::PlaybackCursor;
use crate::camera::OrbitCamera;
use crate::params::{Config, RenderConfig};
use crate::rendering::Uniforms;
use crate::sphere::{BaseGeometry, GeometryModel, Vertex};

/// Everything the renderer needs for one frame
#[derive(Debug)]
pub struct FrameData<'a> {
    pub vertices: &'a [Vertex],
    pub uniforms: Uniforms,
    /// Sequence number of the snapshot this frame was built from
    pub sequence: u64,
    /// True when no new snapshot arrived since the previous frame
    pub stale: bool,
    pub loudness: f32,
}

/// Snapshot -> geometry -> camera, once per rendered frame
pub struct Visualizer {
    model: GeometryModel,
    reader: SnapshotReader,
    cursor: Option<PlaybackCursor>,
    camera: OrbitCamera,
    render_config: RenderConfig,
    last_time_s: Option<f32>,
    last_sequence: Option<u64>,
}

impl Visualizer {
    pub fn new(config: &Config, reader: SnapshotReader, cursor: Option<PlaybackCursor>) -> Self {
        let base = Arc::new(BaseGeometry::build(
            config.sphere.subdivision_level,
            config.sphere.base_radius,
        ));
        log::info!(
            "Sphere: level {} ({} vertices, {} faces)",
            base.subdivision_level(),
            base.vertex_count(),
            base.face_count()
        );

        Self {
            model: GeometryModel::new(base, config.sphere.clone(), config.analysis.band_count),
            reader,
            cursor,
            camera: OrbitCamera::new(config.camera.clone()),
            render_config: config.render.clone(),
            last_time_s: None,
            last_sequence: None,
        }
    }

    /// Shared static mesh, for building GPU buffers
    pub fn base(&self) -> &Arc<BaseGeometry> {
        self.model.base()
    }

    /// Vertices of the most recent frame (the undisplaced sphere before the first)
    pub fn vertices(&self) -> &[Vertex] {
        self.model.displaced().vertices()
    }

    /// Audible playback position in seconds, if a source is attached
    pub fn playback_seconds(&self) -> Option<f32> {
        self.cursor.as_ref().map(PlaybackCursor::seconds)
    }

    /// Build the geometry and uniforms for the frame at `time_s`
    pub fn frame(&mut self, time_s: f32, aspect_ratio: f32) -> FrameData<'_> {
        let dt = self.last_time_s.map_or(0.0, |last| time_s - last);
        self.last_time_s = Some(time_s);

        let snapshot = self.reader.latest();
        let sequence = snapshot.sequence();
        let stale = self.last_sequence == Some(sequence);
        self.last_sequence = Some(sequence);

        let loudness = snapshot.loudness();
        self.camera.advance(dt, loudness);
        let (view_proj, eye) = self.camera.view_proj(&self.render_config, aspect_ratio);

        let uniforms = Uniforms {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: eye.to_array(),
            time: time_s,
            loudness,
            _padding: [0.0; 3],
        };

        let displaced = self.model.displace(&snapshot, time_s);
        FrameData {
            vertices: displaced.vertices(),
            uniforms,
            sequence,
            stale,
            loudness,
        }
    }
}

/// Frames-per-second over fixed measurement windows
#[derive(Debug)]
pub struct FpsCounter {
    window: Duration,
    window_start: Option<Instant>,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count a frame; returns the new rate whenever a window completes
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window || elapsed.is_zero() {
            return None;
        }

        self.fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = Some(now);
        Some(self.fps)
    }

    /// Rate measured over the last completed window
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// Fixed-rate frame deadlines for `ControlFlow::WaitUntil`
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Deadline of the next frame
    ///
    /// Deadlines advance in whole intervals; after a stall the schedule
    /// restarts from `now`.
    pub fn next_deadline(&mut self, now: Instant) -> Instant {
        let next = match self.deadline {
            Some(previous) if previous + self.interval > now => previous + self.interval,
            _ => now + self.interval,
        };
        self.deadline = Some(next);
        next
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Window title carrying the HUD values: playback time, level meter and FPS
pub fn hud_title(playback_s: Option<f32>, loudness: f32, fps: f32, is_fallback: bool) -> String {
    const METER_WIDTH: usize = 10;
    let level = loudness.clamp(0.0, 1.0) * METER_WIDTH as f32;
    let filled = (level.round() as usize).min(METER_WIDTH);
    let meter: String = "#".repeat(filled) + &"-".repeat(METER_WIDTH - filled);

    let time = match playback_s {
        Some(s) => {
            // Whole tenths, so seconds never round up to 60.0
            let tenths = (s.max(0.0) * 10.0).floor() as u64;
            let minutes = tenths / 600;
            let rem = tenths % 600;
            format!("{:02}:{:02}.{}", minutes, rem / 10, rem % 10)
        }
        None => "--:--.-".to_string(),
    };
    let source = if is_fallback { " (test tone)" } else { "" };

    format!(
        "PulseSphere{} | {} | [{}] | {:.0} fps",
        source, time, meter, fps
    )
}
