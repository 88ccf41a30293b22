//! Audio engine implementation
//!
//! symphonia decode → rubato resample → mixer → cpal (or null) output,
//! streamed a chunk at a time per voice.

pub mod decode;
pub mod mixer;
pub mod mixer_engine;
pub mod output;
pub mod resampler;

pub use mixer::Mixer;
pub use mixer_engine::MixerEngine;
pub use output::AudioOutput;

use std::sync::{Mutex, MutexGuard};

/// Lock the mixer, recovering from a poisoned lock
///
/// A panic on one side of the lock must not silence the other.
pub(crate) fn lock_mixer(mixer: &Mutex<Mixer>) -> MutexGuard<'_, Mixer> {
    mixer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
