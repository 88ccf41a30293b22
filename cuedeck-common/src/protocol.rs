//! Remote control message protocol
//!
//! The gateway sends a [`RemoteRequest`] to the playback host and waits for
//! exactly one [`RemoteReply`] carrying the same [`CorrelationToken`]. Tokens
//! let any number of requests of the same kind be in flight at once.
//!
//! Every message is serde-serializable so the link can run over any transport.

use crate::events::HostEvent;
use crate::models::{Collection, Playlist, Repeat, Sound, SoundPlayback, Track, TrackPlayback};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pairs a remote request with its eventual reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(pub u64);

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Message kind shared by a request and its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    PlaylistGetAll,
    PlaylistPlay,
    PlaylistPlaybackRequest,
    PlaylistPlaybackPlay,
    PlaylistPlaybackPause,
    PlaylistPlaybackNext,
    PlaylistPlaybackPrevious,
    PlaylistPlaybackMute,
    PlaylistPlaybackVolume,
    PlaylistPlaybackShuffle,
    PlaylistPlaybackRepeat,
    SoundboardGetAll,
    SoundboardPlay,
    SoundboardStop,
    SoundboardPlaybackRequest,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::PlaylistGetAll => "playlist-get-all",
            RequestKind::PlaylistPlay => "playlist-play",
            RequestKind::PlaylistPlaybackRequest => "playlist-playback-request",
            RequestKind::PlaylistPlaybackPlay => "playlist-playback-play",
            RequestKind::PlaylistPlaybackPause => "playlist-playback-pause",
            RequestKind::PlaylistPlaybackNext => "playlist-playback-next",
            RequestKind::PlaylistPlaybackPrevious => "playlist-playback-previous",
            RequestKind::PlaylistPlaybackMute => "playlist-playback-mute",
            RequestKind::PlaylistPlaybackVolume => "playlist-playback-volume",
            RequestKind::PlaylistPlaybackShuffle => "playlist-playback-shuffle",
            RequestKind::PlaylistPlaybackRepeat => "playlist-playback-repeat",
            RequestKind::SoundboardGetAll => "soundboard-get-all",
            RequestKind::SoundboardPlay => "soundboard-play",
            RequestKind::SoundboardStop => "soundboard-stop",
            RequestKind::SoundboardPlaybackRequest => "soundboard-playback-request",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the remote caller wants the host to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RemoteIntent {
    PlaylistGetAll,
    PlaylistPlay { id: String },
    PlaylistPlaybackRequest,
    PlaylistPlaybackPlay,
    PlaylistPlaybackPause,
    PlaylistPlaybackNext,
    PlaylistPlaybackPrevious,
    PlaylistPlaybackMute { mute: bool },
    PlaylistPlaybackVolume { volume: f32 },
    PlaylistPlaybackShuffle { shuffle: bool },
    PlaylistPlaybackRepeat { repeat: Repeat },
    SoundboardGetAll,
    SoundboardPlay { id: String },
    SoundboardStop { id: String },
    SoundboardPlaybackRequest,
}

impl RemoteIntent {
    pub fn kind(&self) -> RequestKind {
        match self {
            RemoteIntent::PlaylistGetAll => RequestKind::PlaylistGetAll,
            RemoteIntent::PlaylistPlay { .. } => RequestKind::PlaylistPlay,
            RemoteIntent::PlaylistPlaybackRequest => RequestKind::PlaylistPlaybackRequest,
            RemoteIntent::PlaylistPlaybackPlay => RequestKind::PlaylistPlaybackPlay,
            RemoteIntent::PlaylistPlaybackPause => RequestKind::PlaylistPlaybackPause,
            RemoteIntent::PlaylistPlaybackNext => RequestKind::PlaylistPlaybackNext,
            RemoteIntent::PlaylistPlaybackPrevious => RequestKind::PlaylistPlaybackPrevious,
            RemoteIntent::PlaylistPlaybackMute { .. } => RequestKind::PlaylistPlaybackMute,
            RemoteIntent::PlaylistPlaybackVolume { .. } => RequestKind::PlaylistPlaybackVolume,
            RemoteIntent::PlaylistPlaybackShuffle { .. } => RequestKind::PlaylistPlaybackShuffle,
            RemoteIntent::PlaylistPlaybackRepeat { .. } => RequestKind::PlaylistPlaybackRepeat,
            RemoteIntent::SoundboardGetAll => RequestKind::SoundboardGetAll,
            RemoteIntent::SoundboardPlay { .. } => RequestKind::SoundboardPlay,
            RemoteIntent::SoundboardStop { .. } => RequestKind::SoundboardStop,
            RemoteIntent::SoundboardPlaybackRequest => RequestKind::SoundboardPlaybackRequest,
        }
    }
}

/// Gateway → host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub token: CorrelationToken,
    #[serde(flatten)]
    pub intent: RemoteIntent,
}

impl RemoteRequest {
    pub fn kind(&self) -> RequestKind {
        self.intent.kind()
    }
}

/// Host → gateway, answering exactly one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReply {
    pub token: CorrelationToken,
    pub kind: RequestKind,
    pub payload: serde_json::Value,
}

/// Everything the host sends over the link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "body")]
pub enum HostMessage {
    Reply(RemoteReply),
    Event(HostEvent),
}

// ============================================================================
// Reply payloads
// ============================================================================

/// `soundboard-get-all` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionsReply {
    pub collections: Vec<Collection>,
    pub sounds: Vec<Sound>,
}

/// `playlist-get-all` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistsReply {
    pub playlists: Vec<Playlist>,
    pub tracks: Vec<Track>,
}

/// `soundboard-playback-request` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPlaybackReply {
    pub sounds: Vec<SoundPlayback>,
}

/// Queue summary inside a playlist playback reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueInfo {
    pub playlist_id: String,
    pub track_ids: Vec<String>,
    pub cursor: usize,
    pub track_id: String,
}

/// `playlist-playback-request` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistPlaybackReply {
    pub playing: bool,
    pub volume: f32,
    pub muted: bool,
    pub shuffle: bool,
    pub repeat: Repeat,
    pub track: Option<TrackPlayback>,
    pub queue: Option<QueueInfo>,
}

/// Payload for replies that only acknowledge a command
pub fn ack() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
