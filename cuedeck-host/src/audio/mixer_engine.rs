//! [`AudioEngine`] backed by the in-process mixer
//!
//! Each `start` registers a Loading voice and gives it a decoder thread that
//! streams the file into the mixer chunk by chunk (decode, resample, append).
//! Control calls only touch the mixer under its lock, so none of them block
//! on I/O.

use crate::audio::decode::{StreamingDecoder, CHUNK_MS};
use crate::audio::mixer::{ms_to_frames, Demand, CHANNELS};
use crate::audio::output::AudioOutput;
use crate::audio::resampler::ChunkResampler;
use crate::audio::{lock_mixer, Mixer};
use crate::error::Result;
use crate::playback::engine::{
    local_path, AudioEngine, EngineError, InstanceId, InstanceSpec, InstanceStatus,
};
use cuedeck_common::FadeCurve;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Decoder sleep while its voice has enough buffered
const IDLE_POLL: Duration = Duration::from_millis(20);

/// How to open the engine
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Output device name (None = system default)
    pub device: Option<String>,
    /// Skip the device and render into a null sink
    pub headless: bool,
    pub fade_curve: FadeCurve,
}

pub struct MixerEngine {
    mixer: Arc<Mutex<Mixer>>,
    next_id: InstanceId,
    /// Held so the stream keeps running
    _output: Option<AudioOutput>,
}

impl MixerEngine {
    /// Engine without any output attached; nothing advances until one is
    pub fn detached(curve: FadeCurve) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(curve))),
            next_id: 0,
            _output: None,
        }
    }

    /// Engine rendering to a device, or to the null sink when headless or
    /// when the device cannot be opened
    pub fn open(options: &EngineOptions) -> crate::Result<Self> {
        let mut engine = Self::detached(options.fade_curve);
        let mixer = Arc::clone(&engine.mixer);

        let output = if options.headless {
            AudioOutput::open_null(mixer)?
        } else {
            match AudioOutput::open_device(options.device.clone(), Arc::clone(&mixer)) {
                Ok(output) => output,
                Err(e) => {
                    warn!("Audio device unavailable ({}), using null sink", e);
                    AudioOutput::open_null(mixer)?
                }
            }
        };
        info!("Mixer engine ready on {}", output.description());
        engine._output = Some(output);
        Ok(engine)
    }
}

/// Decoder and resampler for one voice, from `start_frame` at the output rate
struct VoiceFeed {
    decoder: StreamingDecoder,
    resampler: ChunkResampler,
    /// Native frames still to discard before output begins
    skip: usize,
    length_hint: Option<usize>,
    done: bool,
}

impl VoiceFeed {
    fn open(path: &Path, output_rate: u32, start_frame: usize) -> Result<Self> {
        let decoder = StreamingDecoder::open(path)?;
        let native_rate = decoder.sample_rate();
        let resampler = ChunkResampler::new(native_rate, output_rate, ms_to_frames(CHUNK_MS, native_rate))?;
        let skip = (start_frame as u64 * native_rate as u64 / output_rate.max(1) as u64) as usize;
        let length_hint = decoder
            .total_frames()
            .map(|frames| (frames * output_rate as u64 / native_rate.max(1) as u64) as usize);
        Ok(Self {
            decoder,
            resampler,
            skip,
            length_hint,
            done: false,
        })
    }

    /// Next resampled chunk; `None` once the file and the filter are drained
    fn next_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        while !self.done {
            let Some(mut samples) = self.decoder.decode_chunk(CHUNK_MS)? else {
                self.done = true;
                let tail = self.resampler.finish()?;
                return Ok((!tail.is_empty()).then_some(tail));
            };
            if self.skip > 0 {
                let skipped = (self.skip * CHANNELS).min(samples.len());
                samples.drain(..skipped);
                self.skip -= skipped / CHANNELS;
            }
            let out = self.resampler.process(&samples)?;
            if !out.is_empty() {
                return Ok(Some(out));
            }
        }
        Ok(None)
    }
}

/// Decoder thread body: feed `id` until the mixer no longer wants audio
fn feed_voice(id: InstanceId, path: PathBuf, mixer: Arc<Mutex<Mixer>>) {
    if let Err(e) = stream_voice(id, &path, &mixer) {
        warn!("Instance {} failed to load {}: {}", id, path.display(), e);
        lock_mixer(&mixer).fail(id, e.to_string());
    }
}

fn stream_voice(id: InstanceId, path: &Path, mixer: &Mutex<Mixer>) -> Result<()> {
    let output_rate = lock_mixer(mixer).sample_rate();
    let mut feed = VoiceFeed::open(path, output_rate, 0)?;
    lock_mixer(mixer).set_length_hint(id, feed.length_hint);
    let mut generation = 0;

    loop {
        let demand = lock_mixer(mixer).demand(id);
        match demand {
            Demand::Stop => {
                debug!("Instance {} decoder done", id);
                return Ok(());
            }
            Demand::Wait => std::thread::sleep(IDLE_POLL),
            Demand::Restart {
                frame,
                generation: next,
            } => {
                debug!("Instance {} decoder restarting at frame {}", id, frame);
                feed = VoiceFeed::open(path, output_rate, frame)?;
                generation = next;
            }
            Demand::More => match feed.next_chunk()? {
                Some(samples) => lock_mixer(mixer).append(id, generation, &samples),
                None => lock_mixer(mixer).finish(id, generation),
            },
        }
    }
}

impl AudioEngine for MixerEngine {
    fn start(&mut self, spec: InstanceSpec) -> std::result::Result<InstanceId, EngineError> {
        let path = local_path(&spec.url)?;
        self.next_id += 1;
        let id = self.next_id;
        lock_mixer(&self.mixer).add(id, &spec);

        let mixer = Arc::clone(&self.mixer);
        let spawned = std::thread::Builder::new()
            .name(format!("cuedeck-decode-{}", id))
            .spawn(move || feed_voice(id, path, mixer));
        if let Err(e) = spawned {
            lock_mixer(&self.mixer).fail(id, format!("Failed to spawn decoder: {}", e));
        }
        Ok(id)
    }

    fn stop(&mut self, id: InstanceId, fade_out_ms: u64) {
        lock_mixer(&self.mixer).stop(id, fade_out_ms);
    }

    fn set_volume(&mut self, id: InstanceId, volume: f32) {
        lock_mixer(&self.mixer).set_volume(id, volume);
    }

    fn set_looping(&mut self, id: InstanceId, looping: bool) {
        lock_mixer(&self.mixer).set_looping(id, looping);
    }

    fn set_paused(&mut self, id: InstanceId, paused: bool) {
        lock_mixer(&self.mixer).set_paused(id, paused);
    }

    fn seek(&mut self, id: InstanceId, position_ms: u64) {
        lock_mixer(&self.mixer).seek(id, position_ms);
    }

    fn status(&self, id: InstanceId) -> Option<InstanceStatus> {
        lock_mixer(&self.mixer).status(id)
    }
}
