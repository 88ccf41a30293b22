//! Events emitted by the playback host
//!
//! Broadcast inside the host and forwarded over the link, where the gateway
//! republishes them on its SSE stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostEvent {
    /// Queue playing/paused flag or current track changed
    PlaybackStateChanged {
        playing: bool,
        track_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A queue track instance started
    TrackStarted {
        track_id: String,
        playlist_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Queue ran out with repeat off
    QueueFinished {
        playlist_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Soundboard sound started
    SoundStarted {
        sound_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Soundboard sound stopped (explicitly or by reaching its end)
    SoundStopped {
        sound_id: String,
        timestamp: DateTime<Utc>,
    },

    /// One engine instance failed; siblings keep playing
    EngineError {
        id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl HostEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            HostEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            HostEvent::TrackStarted { .. } => "TrackStarted",
            HostEvent::QueueFinished { .. } => "QueueFinished",
            HostEvent::SoundStarted { .. } => "SoundStarted",
            HostEvent::SoundStopped { .. } => "SoundStopped",
            HostEvent::EngineError { .. } => "EngineError",
        }
    }
}
