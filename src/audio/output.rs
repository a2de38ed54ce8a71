//! Output device playback driven by cpal.
//!
//! The device callback is the playback authority: it advances a shared frame
//! counter (in source frames) as it writes samples, so the render side can ask
//! which frame is audible without touching the stream.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{PipelineError, Result};

/// Open the default output device and start playing `samples` (mono)
///
/// Returns the live stream; dropping it stops playback and releases the device.
pub(super) fn start_output(
    samples: Arc<[f32]>,
    sample_rate: u32,
    looping: bool,
    frames_played: Arc<AtomicU64>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PipelineError::DeviceUnavailable("no audio output device found".into()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| PipelineError::DeviceUnavailable(format!("no output config: {}", e)))?;

    log::info!(
        "Audio: {} @ {}Hz ({} channels)",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        supported.sample_rate().0,
        supported.channels()
    );

    let format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let player = Player {
        samples,
        step: sample_rate as f64 / config.sample_rate.0 as f64,
        position: 0.0,
        looping,
        frames_played,
    };

    let stream = match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, player)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, player)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, player)?,
        other => {
            return Err(PipelineError::DeviceUnavailable(format!(
                "unsupported output sample format {:?}",
                other
            )))
        }
    };

    stream
        .play()
        .map_err(|e| PipelineError::DeviceUnavailable(format!("failed to start stream: {}", e)))?;

    Ok(stream)
}

/// Nearest-sample resampler from the source rate to the device rate
struct Player {
    samples: Arc<[f32]>,
    /// Source frames per device frame
    step: f64,
    position: f64,
    looping: bool,
    frames_played: Arc<AtomicU64>,
}

impl Player {
    fn next_sample(&mut self) -> f32 {
        let total = self.samples.len() as u64;
        let index = self.position as u64;
        self.position += self.step;

        if total == 0 {
            0.0
        } else if self.looping {
            self.samples[(index % total) as usize]
        } else if index < total {
            self.samples[index as usize]
        } else {
            0.0
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut player: Player,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let value = T::from_sample(player.next_sample());
                    for out in frame.iter_mut() {
                        *out = value;
                    }
                }
                player
                    .frames_played
                    .store(player.position as u64, Ordering::Release);
            },
            |err| log::warn!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| PipelineError::DeviceUnavailable(format!("failed to build stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(samples: Vec<f32>, step: f64, looping: bool) -> Player {
        Player {
            samples: samples.into(),
            step,
            position: 0.0,
            looping,
            frames_played: Arc::new(AtomicU64::new(0)),
        }
    }

    #[test]
    fn test_player_resamples_by_step() {
        // Source at half the device rate: every sample is emitted twice
        let mut p = player(vec![0.1, 0.2, 0.3], 0.5, false);
        let out: Vec<f32> = (0..6).map(|_| p.next_sample()).collect();
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_player_silent_after_end() {
        let mut p = player(vec![0.5, 0.5], 1.0, false);
        p.next_sample();
        p.next_sample();
        assert_eq!(p.next_sample(), 0.0);
    }

    #[test]
    fn test_player_empty_buffer_is_silent() {
        let mut looping = player(Vec::new(), 1.0, true);
        let mut once = player(Vec::new(), 1.0, false);
        for _ in 0..4 {
            assert_eq!(looping.next_sample(), 0.0);
            assert_eq!(once.next_sample(), 0.0);
        }
    }

    #[test]
    fn test_player_wraps_when_looping() {
        let mut p = player(vec![0.1, 0.2], 1.0, true);
        let out: Vec<f32> = (0..4).map(|_| p.next_sample()).collect();
        assert_eq!(out, vec![0.1, 0.2, 0.1, 0.2]);
    }
}
