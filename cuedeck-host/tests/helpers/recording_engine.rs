//! Scriptable audio engine
//!
//! Clones share one recording, so a test keeps a handle after boxing a clone
//! into the player. Started instances report `Playing` at position 0 until
//! the test says otherwise.

use cuedeck_host::playback::{
    AudioEngine, EngineError, InstanceId, InstanceSpec, InstanceState, InstanceStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Start { id: InstanceId, spec: InstanceSpec },
    Stop { id: InstanceId, fade_out_ms: u64 },
    SetVolume { id: InstanceId, volume: f32 },
    SetLooping { id: InstanceId, looping: bool },
    SetPaused { id: InstanceId, paused: bool },
    Seek { id: InstanceId, position_ms: u64 },
}

#[derive(Default)]
struct Recording {
    next_id: InstanceId,
    calls: Vec<Call>,
    statuses: HashMap<InstanceId, InstanceStatus>,
    urls: HashMap<InstanceId, String>,
    refused_urls: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct RecordingEngine {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Every later `start` of `url` fails
    pub fn refuse(&self, url: &str) {
        self.lock().refused_urls.insert(url.to_string());
    }

    /// Urls of started instances, in start order
    pub fn started_urls(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Start { spec, .. } => Some(spec.url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn starts(&self) -> Vec<(InstanceId, InstanceSpec)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Start { id, spec } => Some((*id, spec.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn stops(&self) -> Vec<(InstanceId, u64)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Stop { id, fade_out_ms } => Some((*id, *fade_out_ms)),
                _ => None,
            })
            .collect()
    }

    /// Live instance currently playing `url`
    pub fn instance_for(&self, url: &str) -> Option<InstanceId> {
        let recording = self.lock();
        recording
            .urls
            .iter()
            .filter(|(id, u)| u.as_str() == url && recording.statuses.contains_key(id))
            .map(|(id, _)| *id)
            .max()
    }

    pub fn live_count(&self) -> usize {
        self.lock().statuses.len()
    }

    pub fn status_of(&self, id: InstanceId) -> Option<InstanceStatus> {
        self.lock().statuses.get(&id).cloned()
    }

    pub fn set_position(&self, id: InstanceId, position_ms: u64, duration_ms: u64) {
        if let Some(status) = self.lock().statuses.get_mut(&id) {
            status.position_ms = position_ms;
            status.duration_ms = Some(duration_ms);
        }
    }

    pub fn set_state(&self, id: InstanceId, state: InstanceState) {
        if let Some(status) = self.lock().statuses.get_mut(&id) {
            status.state = state;
        }
    }

    pub fn finish(&self, id: InstanceId) {
        self.set_state(id, InstanceState::Ended);
    }

    /// Engine forgets the instance without being asked
    pub fn release(&self, id: InstanceId) {
        self.lock().statuses.remove(&id);
    }
}

impl AudioEngine for RecordingEngine {
    fn start(&mut self, spec: InstanceSpec) -> Result<InstanceId, EngineError> {
        let mut recording = self.lock();
        if recording.refused_urls.contains(&spec.url) {
            return Err(EngineError::Unavailable(format!("cannot open {}", spec.url)));
        }
        recording.next_id += 1;
        let id = recording.next_id;
        recording.statuses.insert(
            id,
            InstanceStatus {
                position_ms: 0,
                duration_ms: None,
                state: InstanceState::Playing,
            },
        );
        recording.urls.insert(id, spec.url.clone());
        recording.calls.push(Call::Start { id, spec });
        Ok(id)
    }

    fn stop(&mut self, id: InstanceId, fade_out_ms: u64) {
        let mut recording = self.lock();
        recording.statuses.remove(&id);
        recording.calls.push(Call::Stop { id, fade_out_ms });
    }

    fn set_volume(&mut self, id: InstanceId, volume: f32) {
        self.lock().calls.push(Call::SetVolume { id, volume });
    }

    fn set_looping(&mut self, id: InstanceId, looping: bool) {
        self.lock().calls.push(Call::SetLooping { id, looping });
    }

    fn set_paused(&mut self, id: InstanceId, paused: bool) {
        let mut recording = self.lock();
        if let Some(status) = recording.statuses.get_mut(&id) {
            if matches!(status.state, InstanceState::Playing | InstanceState::Paused) {
                status.state = if paused {
                    InstanceState::Paused
                } else {
                    InstanceState::Playing
                };
            }
        }
        recording.calls.push(Call::SetPaused { id, paused });
    }

    fn seek(&mut self, id: InstanceId, position_ms: u64) {
        let mut recording = self.lock();
        if let Some(status) = recording.statuses.get_mut(&id) {
            status.position_ms = position_ms;
        }
        recording.calls.push(Call::Seek { id, position_ms });
    }

    fn status(&self, id: InstanceId) -> Option<InstanceStatus> {
        self.lock().statuses.get(&id).cloned()
    }
}
