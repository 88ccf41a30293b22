//! Audio resampling using rubato
//!
//! [`ChunkResampler`] converts a decoded stream to the output rate one chunk
//! at a time. Filter state carries across chunks, so chunk edges do not click.

use crate::audio::mixer::CHANNELS;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

pub struct ChunkResampler {
    /// `None` when input and output rates match
    inner: Option<FastFixedIn<f32>>,
    ratio: f64,
    /// Planar input not yet handed to rubato
    pending: Vec<Vec<f32>>,
    /// Leading output frames that are filter latency
    delay: usize,
    frames_in: usize,
    frames_out: usize,
}

impl ChunkResampler {
    pub fn new(input_rate: u32, output_rate: u32, chunk_frames: usize) -> Result<Self> {
        let ratio = output_rate as f64 / input_rate.max(1) as f64;
        let inner = if input_rate == output_rate {
            None
        } else {
            debug!("Resampling from {}Hz to {}Hz", input_rate, output_rate);
            let resampler = FastFixedIn::<f32>::new(
                ratio,
                1.0,
                PolynomialDegree::Septic,
                chunk_frames.max(1),
                CHANNELS,
            )
            .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;
            Some(resampler)
        };
        let delay = inner.as_ref().map(|r| r.output_delay()).unwrap_or(0);

        Ok(Self {
            inner,
            ratio,
            pending: vec![Vec::with_capacity(chunk_frames); CHANNELS],
            delay,
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Feed interleaved stereo; returns the output that is ready so far
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(input.to_vec());
        };
        self.frames_in += input.len() / CHANNELS;
        for frame in input.chunks_exact(CHANNELS) {
            for (channel, sample) in self.pending.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        let mut output = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|channel| channel.drain(..needed).collect())
                .collect();
            let planar = resampler
                .process(&chunk, None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            output.extend(interleave(planar));
        }
        Ok(self.emit(output))
    }

    /// Drain buffered input and the filter tail
    pub fn finish(&mut self) -> Result<Vec<f32>> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };

        let mut output = Vec::new();
        if !self.pending[0].is_empty() {
            let rest: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
            let planar = resampler
                .process_partial(Some(rest.as_slice()), None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            output.extend(interleave(planar));
        }
        let tail = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
        output.extend(interleave(tail));

        // Zero padding in the last chunks runs past the real end
        let before = self.frames_out;
        let mut output = self.emit(output);
        let limit = (self.frames_in as f64 * self.ratio).round() as usize;
        output.truncate(limit.saturating_sub(before) * CHANNELS);
        self.frames_out = before + output.len() / CHANNELS;
        Ok(output)
    }

    /// Strip filter latency and count what goes out
    fn emit(&mut self, mut output: Vec<f32>) -> Vec<f32> {
        let latency = (self.delay * CHANNELS).min(output.len());
        output.drain(..latency);
        self.delay -= latency / CHANNELS;
        self.frames_out += output.len() / CHANNELS;
        output
    }
}

/// [[L, L, ...], [R, R, ...]] -> [L, R, L, R, ...]
fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
    let frames = planar.first().map(Vec::len).unwrap_or(0);
    let mut interleaved = Vec::with_capacity(frames * planar.len());
    for frame in 0..frames {
        for channel in &planar {
            interleaved.push(channel[frame]);
        }
    }
    interleaved
}
