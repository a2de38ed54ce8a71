//! Audio-delivery thread tying the playback clock to the analysis cadence.
//!
//! The thread owns the `AudioSource` (and with it the output device) and the
//! `SpectrumAnalyzer`. Once per chunk duration it re-aligns the analysis read
//! position with the audible frame if they drifted apart, reads one chunk and
//! feeds it to the analyzer. The only thing it shares with the render thread
//! is the snapshot slot; the playback cursor is handed out read-only.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use super::source::{frame_distance, AudioSource, ChunkRead, PlaybackCursor};
use super::SampleChunk;
use crate::analysis::{SnapshotReader, SpectrumAnalyzer};
use crate::error::{PipelineError, Result};
use crate::params::{AnalysisConfig, SourceConfig};

/// Running audio-delivery thread; stops and releases the device on drop
pub struct PipelineHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
    reader: SnapshotReader,
    cursor: PlaybackCursor,
    is_fallback: bool,
}

/// What one delivery step fed to the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A chunk read at the current position
    Chunk { start_frame: u64, resynced: bool },
    /// Playback finished; a silent chunk was fed so visuals settle
    Silence,
}

impl PipelineHandle {
    /// Open the configured file (or the synthetic fallback) and start delivering
    pub fn spawn(source_config: &SourceConfig, analysis: AnalysisConfig) -> Result<Self> {
        source_config.validate()?;
        let path = source_config.path.clone();
        let factory_config = source_config.clone();
        Self::spawn_with(
            move || AudioSource::open_or_fallback(&path, &factory_config),
            source_config,
            analysis,
        )
    }

    /// Start delivering from the source built by `factory` on the audio thread
    ///
    /// The source and analyzer are created on the delivery thread; the output
    /// stream a source may own cannot move between threads.
    pub fn spawn_with<F>(
        factory: F,
        source_config: &SourceConfig,
        analysis: AnalysisConfig,
    ) -> Result<Self>
    where
        F: FnOnce() -> AudioSource + Send + 'static,
    {
        analysis.validate()?;
        let (stop_tx, stop_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let config = source_config.clone();

        let thread = thread::Builder::new()
            .name("audio-delivery".into())
            .spawn(move || {
                let mut analyzer = match SpectrumAnalyzer::new(analysis) {
                    Ok(analyzer) => analyzer,
                    Err(e) => {
                        log::error!("{}", e);
                        return;
                    }
                };
                let mut source = factory();
                if let Err(e) = source.start_playback(config.enable_output) {
                    log::warn!("{}; continuing without audible output", e);
                }
                let ready = (source.cursor(), analyzer.reader(), source.is_fallback());
                if ready_tx.send(ready).is_err() {
                    return;
                }

                run_delivery(&mut source, &mut analyzer, &config, &stop_rx);
                log::debug!("Audio delivery stopped");
            })
            .map_err(|e| PipelineError::DeviceUnavailable(format!("audio thread: {}", e)))?;

        let (cursor, reader, is_fallback) = ready_rx.recv().map_err(|_| {
            PipelineError::DeviceUnavailable("audio thread exited during startup".into())
        })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            reader,
            cursor,
            is_fallback,
        })
    }

    /// New snapshot reader for a render-side consumer
    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Read-only playback position handle
    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor.clone()
    }

    /// True when the synthetic buffer replaced the configured file
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop delivery and release the output device (idempotent)
    pub fn stop(&mut self) {
        // Dropping the sender wakes the delivery thread immediately
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Audio delivery thread panicked");
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fixed-interval loop: one chunk per chunk duration until `stop` fires or disconnects
fn run_delivery(
    source: &mut AudioSource,
    analyzer: &mut SpectrumAnalyzer,
    config: &SourceConfig,
    stop: &mpsc::Receiver<()>,
) {
    let chunk_size = analyzer.fft_size();
    let sample_rate = source.sample_rate();
    let interval = Duration::from_secs_f64(chunk_size as f64 / sample_rate.max(1) as f64);
    let max_lag = config.max_sync_lag_frames(sample_rate);

    let mut next_tick = Instant::now();
    loop {
        deliver_one(source, analyzer, chunk_size, max_lag);

        next_tick += interval;
        let now = Instant::now();
        let wait = if next_tick > now {
            next_tick - now
        } else {
            // Stalled: skip the missed ticks
            next_tick = now;
            Duration::ZERO
        };

        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Align the read position with playback (within `max_lag` frames) and feed one chunk
pub(crate) fn deliver_one(
    source: &mut AudioSource,
    analyzer: &mut SpectrumAnalyzer,
    chunk_size: usize,
    max_lag: u64,
) -> Delivery {
    let cursor = source.cursor();
    let sample_rate = source.sample_rate();
    let total = source.total_frames();

    if cursor.is_finished() {
        analyzer.feed(&SampleChunk::silent(chunk_size, sample_rate, total));
        return Delivery::Silence;
    }

    // Analyze the window that ends at the audible frame
    let playing = cursor.frame();
    let target = if source.is_looping() && total > 0 {
        (playing + total - (chunk_size as u64 % total)) % total
    } else {
        playing.saturating_sub(chunk_size as u64)
    };

    let drift = frame_distance(source.read_position(), target, total, source.is_looping());
    let resynced = drift > max_lag;
    if resynced {
        log::debug!(
            "Resync analysis cursor {} -> {} (drift {} frames)",
            source.read_position(),
            target,
            drift
        );
        source.seek(target);
    }

    match source.read_next_chunk(chunk_size) {
        ChunkRead::Chunk(chunk) => {
            analyzer.feed(&chunk);
            Delivery::Chunk {
                start_frame: chunk.start_frame(),
                resynced,
            }
        }
        ChunkRead::EndOfStream => {
            analyzer.feed(&SampleChunk::silent(chunk_size, sample_rate, total));
            Delivery::Silence
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::synthesize_tone;

    fn silent_config() -> SourceConfig {
        SourceConfig {
            enable_output: false,
            ..SourceConfig::default()
        }
    }

    fn tone_source(seconds: f32, looping: bool) -> AudioSource {
        AudioSource::from_decoded(synthesize_tone(440.0, 0.3, 24_000, seconds), looping, true)
    }

    #[test]
    fn test_deliver_reads_sequentially_when_in_sync() {
        let mut source = tone_source(5.0, false);
        let mut analyzer = SpectrumAnalyzer::new(AnalysisConfig::default()).unwrap();

        // Playback clock not started: audible frame stays 0, so reads stay
        // within the lag bound of the start and advance normally
        let first = deliver_one(&mut source, &mut analyzer, 1024, 2_400);
        let second = deliver_one(&mut source, &mut analyzer, 1024, 2_400);

        assert_eq!(
            first,
            Delivery::Chunk {
                start_frame: 0,
                resynced: false
            }
        );
        assert_eq!(
            second,
            Delivery::Chunk {
                start_frame: 1024,
                resynced: false
            }
        );
        assert_eq!(analyzer.latest_snapshot().sequence(), 2);
    }

    #[test]
    fn test_deliver_resyncs_when_drifted() {
        let mut source = tone_source(5.0, false);
        let mut analyzer = SpectrumAnalyzer::new(AnalysisConfig::default()).unwrap();
        source.seek(100_000);

        let delivery = deliver_one(&mut source, &mut analyzer, 1024, 2_400);
        assert_eq!(
            delivery,
            Delivery::Chunk {
                start_frame: 0,
                resynced: true
            }
        );
    }

    #[test]
    fn test_deliver_feeds_silence_after_end() {
        let mut source = tone_source(0.01, false);
        let mut analyzer = SpectrumAnalyzer::new(AnalysisConfig::default()).unwrap();
        source.start_playback(false).unwrap();
        thread::sleep(Duration::from_millis(30));

        let delivery = deliver_one(&mut source, &mut analyzer, 1024, 2_400);
        assert_eq!(delivery, Delivery::Silence);
        assert_eq!(analyzer.latest_snapshot().loudness(), 0.0);
    }

    #[test]
    fn test_spawned_pipeline_publishes_and_stops() {
        let config = silent_config();
        let mut handle = PipelineHandle::spawn_with(
            || tone_source(5.0, true),
            &config,
            AnalysisConfig::default(),
        )
        .unwrap();

        let mut reader = handle.reader();
        let deadline = Instant::now() + Duration::from_secs(2);
        while reader.latest().sequence() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let snapshot = reader.latest();
        assert!(snapshot.sequence() >= 3);
        assert!(snapshot.loudness() > 0.0);
        assert!(handle.is_fallback());

        handle.stop();
        assert!(!handle.is_running());

        let frozen = reader.latest().sequence();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(reader.latest().sequence(), frozen);
    }

    #[test]
    fn test_stop_does_not_wait_for_long_chunk_interval() {
        // 1024 frames at 100 Hz: one delivery tick every 10.24 s
        let config = silent_config();
        let mut handle = PipelineHandle::spawn_with(
            || AudioSource::from_decoded(synthesize_tone(10.0, 0.3, 100, 60.0), true, true),
            &config,
            AnalysisConfig::default(),
        )
        .unwrap();

        let mut reader = handle.reader();
        let deadline = Instant::now() + Duration::from_secs(2);
        while reader.latest().sequence() < 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(reader.latest().sequence(), 1);

        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!handle.is_running());
    }
}
