//! Voice mixer
//!
//! Sums every active voice into an interleaved stereo f32 buffer. Each voice
//! carries its own gain, loop flag, pause flag and fade envelope. A stopped
//! voice leaves the addressable set immediately and keeps rendering its
//! fade-out from whatever gain it had at that moment.
//!
//! Audio reaches a voice in chunks from its decoder thread, which asks
//! [`Mixer::demand`] before every chunk. A voice starts playing with the
//! first chunk; the decoder pauses once [`READ_AHEAD_MS`] is buffered, and
//! non-looping voices shed audio that is well behind the playhead.
//!
//! The output callback owns the render path through `Arc<Mutex<Mixer>>`;
//! control calls take the same lock briefly.

use crate::playback::engine::{InstanceId, InstanceSpec, InstanceState, InstanceStatus};
use cuedeck_common::FadeCurve;
use std::collections::HashMap;
use tracing::debug;

/// Interleaved channel count of everything the mixer handles
pub const CHANNELS: usize = 2;

/// Rate used until an output reports its own
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Decoding stops once this much audio is buffered past the playhead
pub const READ_AHEAD_MS: u64 = 10_000;

/// Played audio kept for short backward seeks on non-looping voices
pub const KEEP_BEHIND_MS: u64 = 5_000;

pub(crate) fn ms_to_frames(ms: u64, sample_rate: u32) -> usize {
    (ms.saturating_mul(sample_rate as u64) / 1000) as usize
}

fn frames_to_ms(frames: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    frames as u64 * 1000 / sample_rate as u64
}

/// Next step for the decoder feeding a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
    /// Decode and append another chunk
    More,
    /// Enough is buffered; ask again shortly
    Wait,
    /// Reopen the file at `frame`; appends from older generations are dropped
    Restart { frame: usize, generation: u64 },
    /// Nothing more will ever be needed
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FadeKind {
    In,
    Out { from_gain: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Envelope {
    kind: FadeKind,
    total: usize,
    elapsed: usize,
}

impl Envelope {
    fn gain(&self, curve: FadeCurve) -> f32 {
        let progress = if self.total == 0 {
            1.0
        } else {
            self.elapsed as f32 / self.total as f32
        };
        match self.kind {
            FadeKind::In => curve.fade_in_gain(progress),
            FadeKind::Out { from_gain } => from_gain * curve.fade_out_gain(progress),
        }
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.total
    }
}

/// Decoded window of a voice at the mixer rate
#[derive(Debug, Default)]
struct Stream {
    /// Interleaved stereo beginning at frame `start`
    samples: Vec<f32>,
    start: usize,
    /// Any audio has arrived (or the file turned out empty)
    loaded: bool,
    /// End of file reached for the current generation
    complete: bool,
    /// Length announced by the container before decoding finishes
    length_hint: Option<usize>,
    generation: u64,
    restart: Option<usize>,
}

impl Stream {
    fn end(&self) -> usize {
        self.start + self.samples.len() / CHANNELS
    }

    /// Total frames: exact once the file is exhausted, else the hint
    fn length(&self) -> Option<usize> {
        if self.complete {
            Some(self.end())
        } else {
            self.length_hint
        }
    }

    /// Drop the window and have the decoder start over at `frame`
    fn restart_at(&mut self, frame: usize) {
        self.samples.clear();
        self.start = frame;
        self.complete = false;
        self.generation += 1;
        self.restart = Some(frame);
    }
}

#[derive(Debug)]
struct Voice {
    stream: Stream,
    failed: Option<String>,
    volume: f32,
    looping: bool,
    paused: bool,
    frame: usize,
    fade: Option<Envelope>,
    ended: bool,
}

impl Voice {
    fn envelope_gain(&self, curve: FadeCurve) -> f32 {
        self.fade.map(|fade| fade.gain(curve)).unwrap_or(1.0)
    }

    fn audible(&self) -> bool {
        self.stream.loaded && self.failed.is_none() && !self.paused && !self.ended
    }

    /// Mix into `out`; returns false once a releasing fade has finished
    fn render(&mut self, out: &mut [f32], curve: FadeCurve) -> bool {
        if !self.audible() {
            return true;
        }
        if self.stream.complete && self.stream.end() == 0 {
            self.ended = true;
            return true;
        }

        for frame in out.chunks_exact_mut(CHANNELS) {
            if self.frame >= self.stream.end() {
                if !self.stream.complete {
                    // Underrun: hold position until the decoder catches up
                    break;
                }
                if !self.looping {
                    self.ended = true;
                    break;
                }
                self.frame = 0;
                if self.stream.start > 0 {
                    self.stream.restart_at(0);
                    break;
                }
            }
            if self.frame < self.stream.start {
                break;
            }

            let gain = self.volume * self.envelope_gain(curve);
            let base = (self.frame - self.stream.start) * CHANNELS;
            frame[0] += self.stream.samples[base] * gain;
            frame[1] += self.stream.samples[base + 1] * gain;
            self.frame += 1;

            if let Some(fade) = self.fade.as_mut() {
                fade.elapsed += 1;
                if fade.is_complete() {
                    match fade.kind {
                        FadeKind::In => self.fade = None,
                        FadeKind::Out { .. } => return false,
                    }
                }
            }
        }
        true
    }
}

pub struct Mixer {
    sample_rate: u32,
    curve: FadeCurve,
    voices: HashMap<InstanceId, Voice>,
    releasing: Vec<Voice>,
}

impl Mixer {
    pub fn new(curve: FadeCurve) -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            curve,
            voices: HashMap::new(),
            releasing: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Called by the output once the device rate is known
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            debug!("Mixer sample rate {} -> {}", self.sample_rate, sample_rate);
            self.sample_rate = sample_rate;
        }
    }

    /// Addressable voices (releasing fades are not counted)
    #[cfg(test)]
    fn voice_count(&self) -> usize {
        self.voices.len()
    }

    #[cfg(test)]
    fn releasing_count(&self) -> usize {
        self.releasing.len()
    }

    /// Register a voice in the Loading state
    pub fn add(&mut self, id: InstanceId, spec: &InstanceSpec) {
        let fade = (spec.fade_in_ms > 0).then(|| Envelope {
            kind: FadeKind::In,
            total: ms_to_frames(spec.fade_in_ms, self.sample_rate),
            elapsed: 0,
        });
        self.voices.insert(
            id,
            Voice {
                stream: Stream::default(),
                failed: None,
                volume: spec.volume.clamp(0.0, 1.0),
                looping: spec.looping,
                paused: false,
                frame: 0,
                fade,
                ended: false,
            },
        );
    }

    /// Decoder side: what to do next for `id`. Also trims audio that fell
    /// far enough behind the playhead.
    pub fn demand(&mut self, id: InstanceId) -> Demand {
        let read_ahead = ms_to_frames(READ_AHEAD_MS, self.sample_rate);
        let keep_behind = ms_to_frames(KEEP_BEHIND_MS, self.sample_rate);
        let Some(voice) = self.voices.get_mut(&id) else {
            return Demand::Stop;
        };
        if voice.failed.is_some() {
            return Demand::Stop;
        }
        let stream = &mut voice.stream;
        if let Some(frame) = stream.restart.take() {
            return Demand::Restart {
                frame,
                generation: stream.generation,
            };
        }
        if stream.complete {
            // A trimmed window may still need a restart for a seek or loop
            return if stream.start == 0 { Demand::Stop } else { Demand::Wait };
        }

        let played = voice.frame.saturating_sub(stream.start);
        if !voice.looping && played > keep_behind * 2 {
            let drop = (played - keep_behind).min(stream.samples.len() / CHANNELS);
            stream.samples.drain(..drop * CHANNELS);
            stream.start += drop;
        }

        if stream.end() >= voice.frame.saturating_add(read_ahead) {
            Demand::Wait
        } else {
            Demand::More
        }
    }

    /// Decoder side: append interleaved frames for `generation`
    pub fn append(&mut self, id: InstanceId, generation: u64, samples: &[f32]) {
        if let Some(voice) = self.voices.get_mut(&id) {
            if voice.stream.generation == generation {
                voice.stream.samples.extend_from_slice(samples);
                voice.stream.loaded = true;
            }
        }
    }

    /// Decoder side: the file is exhausted for `generation`
    pub fn finish(&mut self, id: InstanceId, generation: u64) {
        if let Some(voice) = self.voices.get_mut(&id) {
            let stream = &mut voice.stream;
            if stream.generation == generation {
                stream.complete = true;
                stream.loaded = true;
                if voice.frame > stream.end() {
                    voice.frame = stream.end();
                }
            }
        }
    }

    /// Decoder side: container-reported length at the mixer rate
    pub fn set_length_hint(&mut self, id: InstanceId, frames: Option<usize>) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.stream.length_hint = frames;
        }
    }

    pub fn fail(&mut self, id: InstanceId, message: String) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.failed = Some(message);
        }
    }

    pub fn stop(&mut self, id: InstanceId, fade_out_ms: u64) {
        let Some(mut voice) = self.voices.remove(&id) else {
            return;
        };
        if fade_out_ms == 0 || !voice.audible() {
            return;
        }
        let from_gain = voice.envelope_gain(self.curve);
        voice.fade = Some(Envelope {
            kind: FadeKind::Out { from_gain },
            total: ms_to_frames(fade_out_ms, self.sample_rate),
            elapsed: 0,
        });
        voice.looping = false;
        // Its decoder stops with the id; the fade ends at the buffered audio
        voice.stream.complete = true;
        voice.stream.restart = None;
        self.releasing.push(voice);
    }

    pub fn set_volume(&mut self, id: InstanceId, volume: f32) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.volume = volume.clamp(0.0, 1.0);
        }
    }

    pub fn set_looping(&mut self, id: InstanceId, looping: bool) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.looping = looping;
        }
    }

    pub fn set_paused(&mut self, id: InstanceId, paused: bool) {
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.paused = paused;
        }
    }

    /// Jump within the buffered window, or restart the decoder when the
    /// target is behind it or well past it
    pub fn seek(&mut self, id: InstanceId, position_ms: u64) {
        let read_ahead = ms_to_frames(READ_AHEAD_MS, self.sample_rate);
        let Some(voice) = self.voices.get_mut(&id) else {
            return;
        };
        let mut frame = ms_to_frames(position_ms, self.sample_rate);
        let stream = &mut voice.stream;
        if stream.complete {
            frame = frame.min(stream.end());
        }
        let far_ahead = !stream.complete && frame > stream.end().saturating_add(read_ahead);
        if frame < stream.start || far_ahead {
            stream.restart_at(frame);
        }
        voice.ended = stream.complete && frame >= stream.end() && !voice.looping;
        voice.frame = frame;
    }

    pub fn status(&self, id: InstanceId) -> Option<InstanceStatus> {
        let voice = self.voices.get(&id)?;
        let position_ms = frames_to_ms(voice.frame, self.sample_rate);
        let duration_ms = voice.stream.length().map(|frames| frames_to_ms(frames, self.sample_rate));
        let status = if let Some(message) = &voice.failed {
            InstanceStatus {
                position_ms: 0,
                duration_ms: None,
                state: InstanceState::Failed(message.clone()),
            }
        } else if !voice.stream.loaded {
            InstanceStatus {
                position_ms,
                duration_ms,
                state: InstanceState::Loading,
            }
        } else {
            InstanceStatus {
                position_ms,
                duration_ms,
                state: if voice.ended {
                    InstanceState::Ended
                } else if voice.paused {
                    InstanceState::Paused
                } else {
                    InstanceState::Playing
                },
            }
        };
        Some(status)
    }

    /// Attach a whole buffer at once
    #[cfg(test)]
    pub(crate) fn load(&mut self, id: InstanceId, samples: Vec<f32>) {
        let generation = self.voices.get(&id).map(|voice| voice.stream.generation);
        if let Some(generation) = generation {
            self.append(id, generation, &samples);
            self.finish(id, generation);
        }
    }

    /// Buffered frame range of a voice
    #[cfg(test)]
    pub(crate) fn buffered(&self, id: InstanceId) -> Option<(usize, usize)> {
        self.voices
            .get(&id)
            .map(|voice| (voice.stream.start, voice.stream.end()))
    }

    /// Fill `out` (interleaved stereo) with the sum of all voices
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let curve = self.curve;
        for voice in self.voices.values_mut() {
            voice.render(out, curve);
        }
        self.releasing
            .retain_mut(|voice| voice.render(out, curve) && !voice.ended);
    }
}
