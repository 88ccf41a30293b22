//! Test helper modules for cuedeck-host integration tests
//!
//! - RecordingEngine: scriptable `AudioEngine` that records every call
//! - fixtures: small libraries and players built on them

#![allow(dead_code)]

pub mod fixtures;
pub mod recording_engine;

// Each test binary uses its own subset
#[allow(unused_imports)]
pub use fixtures::{library, player, sound, track, Fixture};
#[allow(unused_imports)]
pub use recording_engine::{Call, RecordingEngine};
