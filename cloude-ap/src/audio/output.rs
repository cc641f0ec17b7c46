//! Audio device output using cpal
//!
//! The stream is built and held on a dedicated thread: cpal streams are not
//! `Send` on every platform, while the engine that drives the voices moves
//! between tokio workers. Dropping [`AudioOutput`] stops the stream.

use crate::audio::mixer::Mixer;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Device details reported once the stream is running
#[derive(Debug, Clone, PartialEq)]
pub struct OutputInfo {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Running output stream on the default device
pub struct AudioOutput {
    info: OutputInfo,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioOutput {
    /// Open the default output device and start rendering `mixer`
    pub fn start(mixer: Arc<Mixer>) -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<OutputInfo>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("cloude-output".to_string())
            .spawn(move || match open_stream(mixer) {
                Ok((stream, info)) => {
                    if ready_tx.send(Ok(info)).is_err() {
                        return;
                    }
                    // Returns once the sender is dropped
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    debug!("Output stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        let info = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("output thread exited before reporting".to_string()))??;
        info!(
            "Audio output on '{}': {} Hz, {} channels",
            info.device_name, info.sample_rate, info.channels
        );

        Ok(Self {
            info,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn info(&self) -> &OutputInfo {
        &self.info
    }

    pub fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Output thread panicked");
            }
        }
    }
}

fn open_stream(mixer: Arc<Mixer>) -> Result<(Stream, OutputInfo)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();
    debug!(
        "Output config: {} Hz, {} channels, {:?}",
        config.sample_rate.0, config.channels, sample_format
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer)?,
        other => {
            return Err(Error::AudioOutput(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    };
    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

    let info = OutputInfo {
        device_name,
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };
    Ok((stream, info))
}

fn build_stream<T>(device: &Device, config: &StreamConfig, mixer: Arc<Mixer>) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut stereo: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                stereo.resize(frames * 2, 0.0);
                mixer.render(&mut stereo);
                write_frames(data, channels, &stereo);
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
}

/// Spread interleaved stereo over a device buffer of `channels` per frame
///
/// Mono devices get the average; channels past the second are silent.
fn write_frames<T>(data: &mut [T], channels: usize, stereo: &[f32])
where
    T: Sample + FromSample<f32>,
{
    if channels == 0 {
        return;
    }
    for (frame, pair) in data.chunks_mut(channels).zip(stereo.chunks_exact(2)) {
        for (channel, sample) in frame.iter_mut().enumerate() {
            let value = match (channels, channel) {
                (1, _) => (pair[0] + pair[1]) * 0.5,
                (_, 0) => pair[0],
                (_, 1) => pair[1],
                _ => 0.0,
            };
            *sample = T::from_sample(value.clamp(-1.0, 1.0));
        }
    }
}
