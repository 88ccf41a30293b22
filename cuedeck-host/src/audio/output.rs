//! Audio output
//!
//! Two sinks pull from the shared mixer:
//! - a cpal stream on the chosen (or default) device
//! - a null sink that renders at real-time pace and discards the result,
//!   used when running headless or when no device can be opened
//!
//! cpal streams are not `Send` on every platform, so the stream is built,
//! owned and dropped on a dedicated thread that parks until shutdown.

use crate::audio::lock_mixer;
use crate::audio::mixer::{Mixer, CHANNELS, DEFAULT_SAMPLE_RATE};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Null sink render period
const NULL_PERIOD: Duration = Duration::from_millis(10);

pub struct AudioOutput {
    description: String,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AudioOutput {
    /// List available audio output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();
        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open a device (None = default) and start pulling from `mixer`
    pub fn open_device(device_name: Option<String>, mixer: Arc<Mutex<Mixer>>) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<String>>();

        let flag = Arc::clone(&shutdown);
        let thread = std::thread::Builder::new()
            .name("cuedeck-audio-output".to_string())
            .spawn(move || {
                let (stream, description) = match start_stream(device_name, mixer) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(description));
                while !flag.load(Ordering::Acquire) {
                    std::thread::park_timeout(Duration::from_millis(250));
                }
                drop(stream);
                debug!("Audio output thread exiting");
            })?;

        let description = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Audio output thread exited during startup".to_string()))??;
        info!("Audio output started: {}", description);

        Ok(Self {
            description,
            shutdown,
            thread: Some(thread),
        })
    }

    /// Render at real-time pace without a device
    pub fn open_null(mixer: Arc<Mutex<Mixer>>) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let sample_rate = {
            let mut guard = lock_mixer(&mixer);
            guard.set_sample_rate(DEFAULT_SAMPLE_RATE);
            guard.sample_rate()
        };
        let frames_per_period = (sample_rate as u128 * NULL_PERIOD.as_millis() / 1000) as usize;

        let thread = std::thread::Builder::new()
            .name("cuedeck-null-output".to_string())
            .spawn(move || {
                let mut buffer = vec![0.0f32; frames_per_period * CHANNELS];
                let mut deadline = Instant::now();
                while !flag.load(Ordering::Acquire) {
                    lock_mixer(&mixer).render(&mut buffer);
                    deadline += NULL_PERIOD;
                    let now = Instant::now();
                    if deadline > now {
                        std::thread::park_timeout(deadline - now);
                    } else {
                        deadline = now;
                    }
                }
            })?;

        info!("Audio output started: null sink at {}Hz", sample_rate);
        Ok(Self {
            description: "null sink".to_string(),
            shutdown,
            thread: Some(thread),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }
}

fn select_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Found requested audio device: {}", name);
            return Ok(device);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    host.default_output_device()
        .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
}

fn start_stream(device_name: Option<String>, mixer: Arc<Mutex<Mixer>>) -> Result<(Stream, String)> {
    let device = select_device(device_name.as_deref())?;
    let supported = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();

    lock_mixer(&mixer).set_sample_rate(config.sample_rate.0);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer)?,
        other => {
            return Err(Error::AudioOutput(format!("Unsupported sample format: {:?}", other)));
        }
    };
    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let description = format!(
        "{} ({}Hz, {} channels, {:?})",
        name, config.sample_rate.0, config.channels, sample_format
    );
    Ok((stream, description))
}

fn build_stream<T>(device: &Device, config: &StreamConfig, mixer: Arc<Mutex<Mixer>>) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                scratch.resize(frames * CHANNELS, 0.0);
                lock_mixer(&mixer).render(&mut scratch);

                for (out, frame) in data.chunks_mut(channels).zip(scratch.chunks_exact(CHANNELS)) {
                    let left = frame[0].clamp(-1.0, 1.0);
                    let right = frame[1].clamp(-1.0, 1.0);
                    if out.len() == 1 {
                        out[0] = T::from_sample((left + right) * 0.5);
                        continue;
                    }
                    out[0] = T::from_sample(left);
                    out[1] = T::from_sample(right);
                    for extra in out.iter_mut().skip(2) {
                        *extra = T::EQUILIBRIUM;
                    }
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::engine::InstanceSpec;
    use cuedeck_common::FadeCurve;

    #[test]
    fn test_null_sink_advances_voices() {
        let mixer = Arc::new(Mutex::new(Mixer::new(FadeCurve::Linear)));
        {
            let mut guard = lock_mixer(&mixer);
            guard.add(
                1,
                &InstanceSpec {
                    url: "file:///x.wav".into(),
                    volume: 1.0,
                    looping: true,
                    fade_in_ms: 0,
                },
            );
            guard.load(1, vec![0.0; 2 * 44_100]);
        }

        let output = AudioOutput::open_null(Arc::clone(&mixer)).unwrap();
        assert_eq!(output.description(), "null sink");
        std::thread::sleep(Duration::from_millis(100));
        drop(output);

        let position = lock_mixer(&mixer).status(1).unwrap().position_ms;
        assert!(position > 0, "position did not advance");
    }
}
