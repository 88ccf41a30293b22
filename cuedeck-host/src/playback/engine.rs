//! Audio engine boundary
//!
//! Control calls are synchronous and fire-and-forget: `start` hands back an
//! instance id at once and loading happens in the background. Setters on an
//! unknown or already released instance are ignored. Callers learn about
//! progress, end of file and failures by polling [`AudioEngine::status`].

use thiserror::Error;

/// Handle for one playing file
pub type InstanceId = u64;

/// What to start
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub url: String,
    /// Linear gain, 0.0-1.0
    pub volume: f32,
    pub looping: bool,
    /// Fade-in length in milliseconds (0 = none)
    pub fade_in_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceState {
    Loading,
    Playing,
    Paused,
    /// Reached the end of a non-looping file
    Ended,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStatus {
    pub position_ms: u64,
    /// Known once the file is loaded
    pub duration_ms: Option<u64>,
    pub state: InstanceState,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unsupported audio url: {0}")]
    UnsupportedUrl(String),

    #[error("Audio engine unavailable: {0}")]
    Unavailable(String),
}

pub trait AudioEngine: Send {
    fn start(&mut self, spec: InstanceSpec) -> Result<InstanceId, EngineError>;

    /// Fade out over `fade_out_ms` from the current gain, then release.
    /// The id is unknown to the engine as soon as this returns.
    fn stop(&mut self, id: InstanceId, fade_out_ms: u64);

    fn set_volume(&mut self, id: InstanceId, volume: f32);

    fn set_looping(&mut self, id: InstanceId, looping: bool);

    fn set_paused(&mut self, id: InstanceId, paused: bool);

    fn seek(&mut self, id: InstanceId, position_ms: u64);

    fn status(&self, id: InstanceId) -> Option<InstanceStatus>;
}

/// Turn a track or sound url into a local path
///
/// Accepts `file://` urls and bare paths.
pub fn local_path(url: &str) -> Result<std::path::PathBuf, EngineError> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(std::path::PathBuf::from(path));
    }
    if url.contains("://") {
        return Err(EngineError::UnsupportedUrl(url.to_string()));
    }
    Ok(std::path::PathBuf::from(url))
}
