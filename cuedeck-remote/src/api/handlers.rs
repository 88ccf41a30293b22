//! HTTP request handlers
//!
//! Each handler turns its route into one [`RemoteIntent`] and returns the
//! host's reply payload as-is. Malformed bodies are rejected by the `Json`
//! extractor before the gateway is involved.

use crate::error::GatewayError;
use crate::gateway::Gateway;
use axum::{extract::State, Json};
use cuedeck_common::models::Repeat;
use cuedeck_common::protocol::RemoteIntent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

type Reply = Result<Json<Value>, GatewayError>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    host_attached: bool,
}

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    mute: bool,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    volume: f32,
}

#[derive(Debug, Deserialize)]
pub struct ShuffleRequest {
    shuffle: bool,
}

#[derive(Debug, Deserialize)]
pub struct RepeatRequest {
    repeat: Repeat,
}

async fn forward(gateway: &Gateway, intent: RemoteIntent) -> Reply {
    gateway.request(intent).await.map(Json)
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health(State(gateway): State<Arc<Gateway>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "cuedeck-remote".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        host_attached: gateway.is_attached(),
    })
}

// ============================================================================
// Playlists
// ============================================================================

/// GET /v1/playlist
pub async fn get_playlists(State(gateway): State<Arc<Gateway>>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistGetAll).await
}

/// POST /v1/playlist/play - track id or playlist id
pub async fn play_playlist(State(gateway): State<Arc<Gateway>>, Json(req): Json<IdRequest>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlay { id: req.id }).await
}

/// GET /v1/playlist/playback
pub async fn get_playlist_playback(State(gateway): State<Arc<Gateway>>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackRequest).await
}

/// PUT /v1/playlist/playback/play
pub async fn resume_playlist(State(gateway): State<Arc<Gateway>>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackPlay).await
}

/// PUT /v1/playlist/playback/pause
pub async fn pause_playlist(State(gateway): State<Arc<Gateway>>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackPause).await
}

/// POST /v1/playlist/playback/next
pub async fn next_track(State(gateway): State<Arc<Gateway>>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackNext).await
}

/// POST /v1/playlist/playback/previous
pub async fn previous_track(State(gateway): State<Arc<Gateway>>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackPrevious).await
}

/// PUT /v1/playlist/playback/mute
pub async fn set_mute(State(gateway): State<Arc<Gateway>>, Json(req): Json<MuteRequest>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackMute { mute: req.mute }).await
}

/// PUT /v1/playlist/playback/volume
pub async fn set_volume(State(gateway): State<Arc<Gateway>>, Json(req): Json<VolumeRequest>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackVolume { volume: req.volume }).await
}

/// PUT /v1/playlist/playback/shuffle
pub async fn set_shuffle(State(gateway): State<Arc<Gateway>>, Json(req): Json<ShuffleRequest>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackShuffle { shuffle: req.shuffle }).await
}

/// PUT /v1/playlist/playback/repeat
pub async fn set_repeat(State(gateway): State<Arc<Gateway>>, Json(req): Json<RepeatRequest>) -> Reply {
    forward(&gateway, RemoteIntent::PlaylistPlaybackRepeat { repeat: req.repeat }).await
}

// ============================================================================
// Collections
// ============================================================================

/// GET /v1/collection
pub async fn get_collections(State(gateway): State<Arc<Gateway>>) -> Reply {
    forward(&gateway, RemoteIntent::SoundboardGetAll).await
}

/// POST /v1/collection/play - sound id or collection id
pub async fn play_sound(State(gateway): State<Arc<Gateway>>, Json(req): Json<IdRequest>) -> Reply {
    forward(&gateway, RemoteIntent::SoundboardPlay { id: req.id }).await
}

/// POST /v1/collection/stop - sound id or collection id
pub async fn stop_sound(State(gateway): State<Arc<Gateway>>, Json(req): Json<IdRequest>) -> Reply {
    forward(&gateway, RemoteIntent::SoundboardStop { id: req.id }).await
}

/// GET /v1/collection/playback
pub async fn get_collection_playback(State(gateway): State<Arc<Gateway>>) -> Reply {
    forward(&gateway, RemoteIntent::SoundboardPlaybackRequest).await
}
