//! Playlist playback domain
//!
//! Holds the queue, transport flags and the measured progress of the current
//! queue track. `track_epoch` bumps whenever the current track must (re)start
//! and `seek_epoch` whenever a seek is requested; the sync adapter compares
//! them against what it last applied.

use super::table::Table;
use crate::error::{Error, Result};
use cuedeck_common::models::{Repeat, Track, TrackPlayback};
use cuedeck_common::protocol::QueueInfo;
use serde::{Deserialize, Serialize};

/// Play order derived from a playlist
#[derive(Debug, Clone, PartialEq)]
pub struct Queue {
    playlist_id: String,
    track_ids: Vec<String>,
    cursor: usize,
}

impl Queue {
    /// Build a queue positioned at `track_id`
    ///
    /// Fails when the list is empty or does not contain `track_id`.
    pub fn new(playlist_id: impl Into<String>, track_ids: Vec<String>, track_id: &str) -> Result<Self> {
        let cursor = track_ids
            .iter()
            .position(|id| id == track_id)
            .ok_or_else(|| Error::invalid(format!("Track {} is not in the queue", track_id)))?;
        Ok(Self {
            playlist_id: playlist_id.into(),
            track_ids,
            cursor,
        })
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    pub fn track_ids(&self) -> &[String] {
        &self.track_ids
    }

    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current track id
    pub fn track_id(&self) -> &str {
        &self.track_ids[self.cursor]
    }

    fn set_cursor(&mut self, cursor: usize) -> Result<()> {
        if cursor >= self.track_ids.len() {
            return Err(Error::invalid(format!(
                "Cursor {} out of range for queue of {}",
                cursor,
                self.track_ids.len()
            )));
        }
        self.cursor = cursor;
        Ok(())
    }

    pub fn info(&self) -> QueueInfo {
        QueueInfo {
            playlist_id: self.playlist_id.clone(),
            track_ids: self.track_ids.clone(),
            cursor: self.cursor,
            track_id: self.track_id().to_string(),
        }
    }
}

/// Preferences persisted across restarts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPreferences {
    pub volume: f32,
    pub muted: bool,
    pub shuffle: bool,
    pub repeat: Repeat,
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            shuffle: false,
            repeat: Repeat::Off,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub playing: bool,
    pub muted: bool,
    pub volume: f32,
    pub shuffle: bool,
    pub repeat: Repeat,
    pub queue: Option<Queue>,
    pub track: Option<TrackPlayback>,
    pub track_epoch: u64,
    pub seek_epoch: u64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::from_preferences(PlaybackPreferences::default())
    }
}

impl PlaybackState {
    pub fn from_preferences(prefs: PlaybackPreferences) -> Self {
        Self {
            playing: false,
            muted: prefs.muted,
            volume: prefs.volume.clamp(0.0, 1.0),
            shuffle: prefs.shuffle,
            repeat: prefs.repeat,
            queue: None,
            track: None,
            track_epoch: 0,
            seek_epoch: 0,
        }
    }

    pub fn preferences(&self) -> PlaybackPreferences {
        PlaybackPreferences {
            volume: self.volume,
            muted: self.muted,
            shuffle: self.shuffle,
            repeat: self.repeat,
        }
    }

    /// Gain the queue track should be rendered at
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackIntent {
    /// Replace the queue wholesale and start playing its current track
    StartQueue(Queue),
    /// Point the cursor elsewhere and start that track
    MoveCursor(usize),
    /// Restart the current track from the beginning
    ReplayTrack,
    /// Drop the queue and go idle
    StopQueue,
    SetPlaying(bool),
    Seek(u64),
    Mute(bool),
    Volume(f32),
    Shuffle(bool),
    Repeat(Repeat),
    /// Measured position of the current track instance
    TrackProgress { progress: u64, duration: Option<u64> },
}

fn track_record(tracks: &Table<Track>, queue: &Queue) -> Option<TrackPlayback> {
    tracks.get(queue.track_id()).map(|track| TrackPlayback {
        track: track.clone(),
        progress: 0,
        duration: 0,
    })
}

/// Apply one intent in place
///
/// `tracks` resolves the current track id into its record.
pub fn apply(
    state: &mut PlaybackState,
    tracks: &Table<Track>,
    intent: PlaybackIntent,
) -> Result<()> {
    match intent {
        PlaybackIntent::StartQueue(queue) => {
            state.track = track_record(tracks, &queue);
            state.queue = Some(queue);
            state.playing = true;
            state.track_epoch += 1;
        }
        PlaybackIntent::MoveCursor(cursor) => {
            let Some(queue) = state.queue.as_mut() else {
                return Ok(());
            };
            queue.set_cursor(cursor)?;
            state.track = track_record(tracks, queue);
            state.playing = true;
            state.track_epoch += 1;
        }
        PlaybackIntent::ReplayTrack => {
            if let Some(queue) = state.queue.as_ref() {
                state.track = track_record(tracks, queue);
                state.playing = true;
                state.track_epoch += 1;
            }
        }
        PlaybackIntent::StopQueue => {
            state.queue = None;
            state.track = None;
            state.playing = false;
        }
        PlaybackIntent::SetPlaying(playing) => {
            state.playing = playing && state.queue.is_some();
        }
        PlaybackIntent::Seek(position) => {
            if state.queue.is_some() {
                if let Some(track) = state.track.as_mut() {
                    track.progress = position;
                }
                state.seek_epoch += 1;
            }
        }
        PlaybackIntent::Mute(muted) => state.muted = muted,
        PlaybackIntent::Volume(volume) => state.volume = volume.clamp(0.0, 1.0),
        PlaybackIntent::Shuffle(shuffle) => state.shuffle = shuffle,
        PlaybackIntent::Repeat(repeat) => state.repeat = repeat,
        PlaybackIntent::TrackProgress { progress, duration } => {
            if let Some(track) = state.track.as_mut() {
                track.progress = progress;
                if let Some(duration) = duration {
                    track.duration = duration;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks() -> Table<Track> {
        ["a", "b", "c"]
            .into_iter()
            .map(|id| Track {
                id: id.into(),
                url: format!("file:///{}.mp3", id),
                title: id.into(),
            })
            .collect()
    }

    fn queue(at: &str) -> Queue {
        Queue::new("p", vec!["a".into(), "b".into(), "c".into()], at).unwrap()
    }

    #[test]
    fn test_queue_requires_member_track() {
        assert!(Queue::new("p", vec!["a".into()], "z").is_err());
        assert!(Queue::new("p", vec![], "a").is_err());
        assert_eq!(queue("b").cursor(), 1);
    }

    #[test]
    fn test_start_queue_plays_and_bumps_epoch() {
        let mut state = PlaybackState::default();
        apply(&mut state, &tracks(), PlaybackIntent::StartQueue(queue("b"))).unwrap();

        assert!(state.playing);
        assert_eq!(state.track_epoch, 1);
        assert_eq!(state.track.as_ref().unwrap().track.id, "b");
    }

    #[test]
    fn test_playing_requires_queue() {
        let mut state = PlaybackState::default();
        apply(&mut state, &tracks(), PlaybackIntent::SetPlaying(true)).unwrap();
        assert!(!state.playing);

        apply(&mut state, &tracks(), PlaybackIntent::StartQueue(queue("a"))).unwrap();
        apply(&mut state, &tracks(), PlaybackIntent::StopQueue).unwrap();
        assert!(!state.playing);
        assert!(state.queue.is_none());
        assert!(state.track.is_none());
    }

    #[test]
    fn test_move_cursor_out_of_range_rejected() {
        let mut state = PlaybackState::default();
        apply(&mut state, &tracks(), PlaybackIntent::StartQueue(queue("a"))).unwrap();
        assert!(apply(&mut state, &tracks(), PlaybackIntent::MoveCursor(3)).is_err());
        assert_eq!(state.queue.as_ref().unwrap().cursor(), 0);
    }

    #[test]
    fn test_seek_without_queue_is_noop() {
        let mut state = PlaybackState::default();
        apply(&mut state, &tracks(), PlaybackIntent::Seek(1000)).unwrap();
        assert_eq!(state.seek_epoch, 0);
    }

    #[test]
    fn test_effective_volume_respects_mute() {
        let mut state = PlaybackState::default();
        apply(&mut state, &tracks(), PlaybackIntent::Volume(0.4)).unwrap();
        assert_eq!(state.effective_volume(), 0.4);
        apply(&mut state, &tracks(), PlaybackIntent::Mute(true)).unwrap();
        assert_eq!(state.effective_volume(), 0.0);
        assert_eq!(state.volume, 0.4);
    }
}
