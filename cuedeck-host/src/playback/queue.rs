//! Queue engine
//!
//! Decides where the cursor goes and expresses the decision as store
//! transitions. It never touches the audio engine; the sync adapter turns
//! the resulting `track_epoch` bump into a new track instance.
//!
//! States: Idle → Playing ⇄ Paused → (track end) → Playing | Idle.
//! Operations on an Idle queue are no-ops.
//!
//! Cursor rules:
//! - shuffle on: uniform pick over the other tracks (the only track when
//!   the queue holds one)
//! - shuffle off: ±1; repeat `all` wraps, otherwise the boundary ends the
//!   queue
//! - auto-advance: repeat `one` replays, anything else behaves like `next`

use crate::error::Result;
use crate::store::{PlaybackIntent, PlaybackState, Queue, Store};
use cuedeck_common::models::Repeat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Idle,
    Playing,
    Paused,
}

impl QueueStatus {
    pub fn of(state: &PlaybackState) -> Self {
        match (&state.queue, state.playing) {
            (None, _) => QueueStatus::Idle,
            (Some(_), true) => QueueStatus::Playing,
            (Some(_), false) => QueueStatus::Paused,
        }
    }
}

/// Outcome of a cursor move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    MoveTo(usize),
    Replay,
    /// Ran off the end; queue dropped
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

pub struct QueueEngine<R = StdRng> {
    rng: R,
}

impl QueueEngine<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for QueueEngine<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> QueueEngine<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Replace the queue and start at `track_id`
    pub fn start_queue(
        &mut self,
        store: &mut Store,
        tracks: Vec<String>,
        track_id: &str,
        playlist_id: &str,
    ) -> Result<()> {
        let queue = Queue::new(playlist_id, tracks, track_id)?;
        debug!(
            "Starting queue for playlist {} at {} ({} tracks)",
            playlist_id,
            track_id,
            queue.len()
        );
        store.apply(PlaybackIntent::StartQueue(queue))
    }

    /// Start a playlist from the top, or from a random track when shuffling
    pub fn start_playlist(&mut self, store: &mut Store, playlist_id: &str) -> Result<bool> {
        let Some(playlist) = store.state().library.playlists.get(playlist_id) else {
            return Ok(false);
        };
        if playlist.tracks.is_empty() {
            return Ok(false);
        }
        let tracks = playlist.tracks.clone();
        let start = if store.state().playback.shuffle {
            self.rng.gen_range(0..tracks.len())
        } else {
            0
        };
        let track_id = tracks[start].clone();
        self.start_queue(store, tracks, &track_id, playlist_id)?;
        Ok(true)
    }

    pub fn next(&mut self, store: &mut Store) -> Result<Option<Step>> {
        self.advance(store, Direction::Forward)
    }

    pub fn previous(&mut self, store: &mut Store) -> Result<Option<Step>> {
        self.advance(store, Direction::Backward)
    }

    /// Auto-advance after the current track finished on its own
    pub fn track_ended(&mut self, store: &mut Store) -> Result<Option<Step>> {
        if store.state().playback.queue.is_none() {
            return Ok(None);
        }
        if store.state().playback.repeat == Repeat::One {
            self.apply_step(store, Step::Replay)?;
            return Ok(Some(Step::Replay));
        }
        self.advance(store, Direction::Forward)
    }

    pub fn seek(&mut self, store: &mut Store, position_ms: u64) -> Result<()> {
        store.apply(PlaybackIntent::Seek(position_ms))
    }

    pub fn pause_resume(&mut self, store: &mut Store, playing: bool) -> Result<()> {
        store.apply(PlaybackIntent::SetPlaying(playing))
    }

    pub fn mute(&mut self, store: &mut Store, muted: bool) -> Result<()> {
        store.apply(PlaybackIntent::Mute(muted))
    }

    pub fn volume(&mut self, store: &mut Store, volume: f32) -> Result<()> {
        store.apply(PlaybackIntent::Volume(volume))
    }

    pub fn shuffle(&mut self, store: &mut Store, shuffle: bool) -> Result<()> {
        store.apply(PlaybackIntent::Shuffle(shuffle))
    }

    pub fn repeat(&mut self, store: &mut Store, repeat: Repeat) -> Result<()> {
        store.apply(PlaybackIntent::Repeat(repeat))
    }

    fn advance(&mut self, store: &mut Store, direction: Direction) -> Result<Option<Step>> {
        let Some(step) = self.plan(&store.state().playback, direction) else {
            return Ok(None);
        };
        self.apply_step(store, step)?;
        Ok(Some(step))
    }

    fn apply_step(&mut self, store: &mut Store, step: Step) -> Result<()> {
        debug!("Queue step: {:?}", step);
        match step {
            Step::MoveTo(cursor) => store.apply(PlaybackIntent::MoveCursor(cursor)),
            Step::Replay => store.apply(PlaybackIntent::ReplayTrack),
            Step::Finish => store.apply(PlaybackIntent::StopQueue),
        }
    }

    fn plan(&mut self, state: &PlaybackState, direction: Direction) -> Option<Step> {
        let queue = state.queue.as_ref()?;
        let len = queue.len();
        let cursor = queue.cursor();

        if state.shuffle {
            return Some(Step::MoveTo(self.random_other(len, cursor)));
        }

        let wrap = state.repeat == Repeat::All;
        let step = match direction {
            Direction::Forward if cursor + 1 < len => Step::MoveTo(cursor + 1),
            Direction::Forward if wrap => Step::MoveTo(0),
            Direction::Backward if cursor > 0 => Step::MoveTo(cursor - 1),
            Direction::Backward if wrap => Step::MoveTo(len - 1),
            _ => Step::Finish,
        };
        Some(step)
    }

    /// Uniform index in `[0, len)` other than `current` (when possible)
    fn random_other(&mut self, len: usize, current: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let pick = self.rng.gen_range(0..len - 1);
        if pick >= current {
            pick + 1
        } else {
            pick
        }
    }
}
