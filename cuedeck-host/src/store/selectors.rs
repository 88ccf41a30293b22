//! Read-only views over a store snapshot
//!
//! Plain functions: callers hold an `Arc<StoreState>` and nothing here can
//! mutate it.

use super::StoreState;
use cuedeck_common::protocol::{
    CollectionPlaybackReply, CollectionsReply, PlaylistPlaybackReply, PlaylistsReply,
};

pub fn collections_reply(state: &StoreState) -> CollectionsReply {
    CollectionsReply {
        collections: state.library.collections.iter().cloned().collect(),
        sounds: state.library.sounds.iter().cloned().collect(),
    }
}

pub fn playlists_reply(state: &StoreState) -> PlaylistsReply {
    PlaylistsReply {
        playlists: state.library.playlists.iter().cloned().collect(),
        tracks: state.library.tracks.iter().cloned().collect(),
    }
}

pub fn collection_playback_reply(state: &StoreState) -> CollectionPlaybackReply {
    CollectionPlaybackReply {
        sounds: state.sounds.iter().cloned().collect(),
    }
}

pub fn playlist_playback_reply(state: &StoreState) -> PlaylistPlaybackReply {
    let playback = &state.playback;
    PlaylistPlaybackReply {
        playing: playback.playing,
        volume: playback.volume,
        muted: playback.muted,
        shuffle: playback.shuffle,
        repeat: playback.repeat,
        track: playback.track.clone(),
        queue: playback.queue.as_ref().map(|queue| queue.info()),
    }
}
