//! Message bridge
//!
//! Turns one inbound [`RemoteRequest`] into player commands or a selector
//! query and answers with exactly one [`RemoteReply`] carrying the same token
//! and kind. A command that fails is logged and still acknowledged; the
//! remote side never waits on an error that only the host can see.

use crate::playback::{Player, PlayerCommand};
use crate::store::selectors;
use cuedeck_common::protocol::{ack, RemoteIntent, RemoteReply, RemoteRequest};
use serde::Serialize;
use tracing::{debug, warn};

/// Handle one remote request against the player
pub fn dispatch(player: &mut Player, request: RemoteRequest) -> RemoteReply {
    let token = request.token;
    let kind = request.kind();
    debug!("Remote request {} {}", token, kind);

    let payload = match command_for(request.intent) {
        Ok(command) => {
            if let Err(e) = player.handle(command) {
                warn!("Remote {} {} failed: {}", kind, token, e);
            }
            ack()
        }
        Err(query) => answer(player, query),
    };

    RemoteReply { token, kind, payload }
}

/// Command for an intent that changes something; queries come back as `Err`
fn command_for(intent: RemoteIntent) -> Result<PlayerCommand, RemoteIntent> {
    let command = match intent {
        RemoteIntent::PlaylistPlay { id } => PlayerCommand::PlayPlaylist { id },
        RemoteIntent::PlaylistPlaybackPlay => PlayerCommand::PauseResume { playing: true },
        RemoteIntent::PlaylistPlaybackPause => PlayerCommand::PauseResume { playing: false },
        RemoteIntent::PlaylistPlaybackNext => PlayerCommand::Next,
        RemoteIntent::PlaylistPlaybackPrevious => PlayerCommand::Previous,
        RemoteIntent::PlaylistPlaybackMute { mute } => PlayerCommand::Mute { muted: mute },
        RemoteIntent::PlaylistPlaybackVolume { volume } => PlayerCommand::Volume { volume },
        RemoteIntent::PlaylistPlaybackShuffle { shuffle } => PlayerCommand::Shuffle { shuffle },
        RemoteIntent::PlaylistPlaybackRepeat { repeat } => PlayerCommand::Repeat { repeat },
        RemoteIntent::SoundboardPlay { id } => PlayerCommand::PlaySound { id },
        RemoteIntent::SoundboardStop { id } => PlayerCommand::StopSound { id },
        query => return Err(query),
    };
    Ok(command)
}

fn answer(player: &Player, query: RemoteIntent) -> serde_json::Value {
    let state = player.state();
    match query {
        RemoteIntent::PlaylistGetAll => to_payload(&selectors::playlists_reply(state)),
        RemoteIntent::PlaylistPlaybackRequest => to_payload(&selectors::playlist_playback_reply(state)),
        RemoteIntent::SoundboardGetAll => to_payload(&selectors::collections_reply(state)),
        RemoteIntent::SoundboardPlaybackRequest => {
            to_payload(&selectors::collection_playback_reply(state))
        }
        _ => ack(),
    }
}

fn to_payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!("Failed to serialize reply payload: {}", e);
        ack()
    })
}
