//! PulseSphere - a sphere that breathes with the music
//!
//! The audio thread decodes, plays and analyzes; the render loop reshapes an
//! icosphere from the latest spectrum snapshot at a fixed frame rate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use pulsesphere::analysis::SnapshotSlot;
use pulsesphere::audio::PipelineHandle;
use pulsesphere::cli::Args;
use pulsesphere::params::Config;
use pulsesphere::rendering::RenderSystem;
use pulsesphere::visualizer::{hud_title, FpsCounter, FramePacer, Visualizer};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Audio and frame glue
    pipeline: Option<PipelineHandle>,
    visualizer: Visualizer,
    is_fallback: bool,

    config: Config,

    // Frame timing
    start_time: Instant,
    pacer: FramePacer,
    next_frame: Instant,
    fps: FpsCounter,
}

impl App {
    fn new(config: Config) -> Self {
        let pipeline = match PipelineHandle::spawn(&config.source, config.analysis.clone()) {
            Ok(pipeline) => Some(pipeline),
            Err(e) => {
                log::error!("Audio pipeline unavailable, rendering without audio: {}", e);
                None
            }
        };

        let (reader, cursor, is_fallback) = match &pipeline {
            Some(p) => (p.reader(), Some(p.cursor()), p.is_fallback()),
            None => (SnapshotSlot::new(config.analysis.band_count).reader(), None, false),
        };

        let visualizer = Visualizer::new(&config, reader, cursor);
        let now = Instant::now();

        Self {
            window: None,
            render_system: None,
            pipeline,
            visualizer,
            is_fallback,
            pacer: FramePacer::new(config.render.frame_interval()),
            fps: FpsCounter::new(Duration::from_secs_f32(config.render.title_refresh_s)),
            config,
            start_time: now,
            next_frame: now,
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.stop();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title(hud_title(None, 0.0, 0.0, self.is_fallback))
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.render.window_width,
                self.config.render.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.visualizer.vertices(),
            self.visualizer.base().indices(),
        ));

        match render_system {
            Ok(render_system) => {
                log::info!("PulseSphere is running, press ESC to quit");
                self.window = Some(window);
                self.render_system = Some(render_system);
            }
            Err(e) => {
                log::error!("{}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame = self.pacer.next_deadline(now);
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

impl App {
    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(render_system) = &mut self.render_system else {
            return;
        };

        let time_s = self.start_time.elapsed().as_secs_f32();
        let frame = self.visualizer.frame(time_s, render_system.aspect_ratio());
        let loudness = frame.loudness;

        render_system.update_vertices(frame.vertices);
        render_system.update_uniforms(&frame.uniforms);

        match render_system.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = render_system.size();
                render_system.resize(width, height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
                return;
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }

        if let Some(fps) = self.fps.tick(Instant::now()) {
            if let Some(window) = &self.window {
                let playback = self.visualizer.playback_seconds();
                window.set_title(&hud_title(playback, loudness, fps, self.is_fallback));
            }
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let config_path = args.config_path();
    if args.config.is_some() && !config_path.exists() {
        log::warn!("Config file {} not found, using defaults", config_path.display());
    }
    let mut config = Config::load_or_default(&config_path);
    args.apply(&mut config);

    if let Err(e) = config.validate() {
        log::error!("{}", e);
        std::process::exit(2);
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
    }
    app.shutdown();
}
