//! Audio decoder using symphonia
//!
//! Reads a file (MP3, FLAC, AAC, Vorbis, WAV) a chunk at a time into
//! interleaved stereo f32 at the file's own rate. Mono is duplicated to both
//! channels; anything wider keeps the first two channels.

use crate::audio::mixer::CHANNELS;
use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Preferred length of one decoded chunk
pub const CHUNK_MS: u64 = 500;

pub struct StreamingDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    total_frames: Option<u64>,
    finished: bool,
}

impl StreamingDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Opening decoder: {}", path.display());

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;
        let total_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            total_frames,
            finished: false,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frame count from the container header, when it carries one
    pub fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    /// About `chunk_ms` of audio, or `None` once the file is exhausted
    pub fn decode_chunk(&mut self, chunk_ms: u64) -> Result<Option<Vec<f32>>> {
        if self.finished {
            return Ok(None);
        }
        let wanted = ((self.sample_rate as u64 * chunk_ms / 1000).max(1) as usize) * CHANNELS;
        let mut samples = Vec::with_capacity(wanted);

        while samples.len() < wanted {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    self.finished = true;
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    self.finished = true;
                    break;
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("Decoder failed: {}", e))),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            append_stereo(buffer.samples(), channels, &mut samples);
        }

        if samples.is_empty() && self.finished {
            Ok(None)
        } else {
            Ok(Some(samples))
        }
    }
}

/// Fold interleaved `channels`-wide samples into stereo
fn append_stereo(input: &[f32], channels: usize, output: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            for &sample in input {
                output.push(sample);
                output.push(sample);
            }
        }
        n => {
            for frame in input.chunks_exact(n) {
                output.push(frame[0]);
                output.push(frame[1]);
            }
        }
    }
}
