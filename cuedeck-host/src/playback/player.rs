//! Player: the playback host's single owner of state and engine
//!
//! Every command runs to completion and is followed by a reconcile pass, so
//! the engine never lags behind a store transition by more than one call.
//! The periodic [`tick`](Player::tick) pulls progress from the engine,
//! retires finished sounds and auto-advances the queue.

use crate::error::Result;
use crate::events::EventBus;
use crate::playback::engine::AudioEngine;
use crate::playback::queue::{QueueEngine, Step};
use crate::playback::sounds::SoundPlaybackManager;
use crate::playback::sync::{SyncAdapter, TrackSignal};
use crate::store::{LibraryIntent, Store, StoreState, ViewIntent};
use cuedeck_common::events::HostEvent;
use cuedeck_common::models::Repeat;
use cuedeck_common::time;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Everything the host can be asked to do locally
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Library(LibraryIntent),
    View(ViewIntent),

    /// Sound id or collection id (random member)
    PlaySound { id: String },
    /// Sound id or collection id (every playing member)
    StopSound { id: String },
    StopAllSounds,

    /// Explicit queue: `tracks` in order, starting at `track_id`
    StartQueue {
        tracks: Vec<String>,
        track_id: String,
        playlist_id: String,
    },
    /// Track id (queue of its playlist) or playlist id (from the top)
    PlayPlaylist { id: String },
    Next,
    Previous,
    PauseResume { playing: bool },
    Seek { position_ms: u64 },
    Mute { muted: bool },
    Volume { volume: f32 },
    Shuffle { shuffle: bool },
    Repeat { repeat: Repeat },
}

/// Parts of playback state worth an event when they change
#[derive(Debug, Clone, PartialEq)]
struct Summary {
    playing: bool,
    track_id: Option<String>,
    playlist_id: Option<String>,
}

impl Summary {
    fn of(state: &StoreState) -> Self {
        let queue = state.playback.queue.as_ref();
        Self {
            playing: state.playback.playing,
            track_id: queue.map(|q| q.track_id().to_string()),
            playlist_id: queue.map(|q| q.playlist_id().to_string()),
        }
    }
}

pub struct Player {
    store: Store,
    engine: Box<dyn AudioEngine>,
    queue: QueueEngine,
    sounds: SoundPlaybackManager,
    sync: SyncAdapter,
    events: EventBus,
    track_failures: usize,
}

impl Player {
    pub fn new(initial: StoreState, engine: Box<dyn AudioEngine>, events: EventBus) -> Self {
        Self {
            store: Store::new(initial),
            engine,
            queue: QueueEngine::new(),
            sounds: SoundPlaybackManager::new(),
            sync: SyncAdapter::new(),
            events,
            track_failures: 0,
        }
    }

    /// Deterministic random picks, for tests and benchmarks
    pub fn with_seed(initial: StoreState, engine: Box<dyn AudioEngine>, events: EventBus, seed: u64) -> Self {
        let mut player = Self::new(initial, engine, events);
        player.queue = QueueEngine::with_rng(StdRng::seed_from_u64(seed));
        player.sounds = SoundPlaybackManager::with_rng(StdRng::seed_from_u64(seed.wrapping_add(1)));
        player
    }

    pub fn state(&self) -> &StoreState {
        self.store.state()
    }

    pub fn snapshot(&self) -> Arc<StoreState> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreState>> {
        self.store.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn sounds(&self) -> &SoundPlaybackManager {
        &self.sounds
    }

    pub fn sync(&self) -> &SyncAdapter {
        &self.sync
    }

    /// Apply one command and reconcile the engine
    pub fn handle(&mut self, command: PlayerCommand) -> Result<()> {
        let before = Summary::of(self.store.state());
        let outcome = self.execute(command);
        let settled = self.settle();
        self.announce(before);
        outcome.and(settled)
    }

    /// Periodic progress pass
    pub fn tick(&mut self) -> Result<()> {
        let before = Summary::of(self.store.state());
        let outcome = self.poll();
        let settled = self.settle();
        self.announce(before);
        outcome.and(settled)
    }

    fn execute(&mut self, command: PlayerCommand) -> Result<()> {
        let engine = self.engine.as_mut();
        match command {
            PlayerCommand::Library(intent) => self.apply_library(intent),
            PlayerCommand::View(intent) => self.store.apply(intent),

            PlayerCommand::PlaySound { id } => {
                if let Some(sound) = self.store.state().library.sounds.get(&id).cloned() {
                    self.sounds.play(&mut self.store, engine, &self.events, sound)
                } else if self.store.state().library.collections.contains(&id) {
                    self.sounds
                        .play_random_from_collection(&mut self.store, engine, &self.events, &id)
                        .map(|_| ())
                } else {
                    debug!("Ignoring play for unknown id {}", id);
                    Ok(())
                }
            }
            PlayerCommand::StopSound { id } => {
                if self.store.state().library.collections.contains(&id) {
                    self.sounds
                        .stop_collection(&mut self.store, engine, &self.events, &id)
                        .map(|_| ())
                } else {
                    self.sounds
                        .stop(&mut self.store, engine, &self.events, &id)
                        .map(|_| ())
                }
            }
            PlayerCommand::StopAllSounds => self.sounds.stop_all(&mut self.store, engine, &self.events),

            PlayerCommand::StartQueue {
                tracks,
                track_id,
                playlist_id,
            } => {
                self.track_failures = 0;
                self.queue
                    .start_queue(&mut self.store, tracks, &track_id, &playlist_id)
            }
            PlayerCommand::PlayPlaylist { id } => {
                self.track_failures = 0;
                self.play_playlist_by_id(&id)
            }
            PlayerCommand::Next => self.queue.next(&mut self.store).map(|_| ()),
            PlayerCommand::Previous => self.queue.previous(&mut self.store).map(|_| ()),
            PlayerCommand::PauseResume { playing } => self.queue.pause_resume(&mut self.store, playing),
            PlayerCommand::Seek { position_ms } => self.queue.seek(&mut self.store, position_ms),
            PlayerCommand::Mute { muted } => self.queue.mute(&mut self.store, muted),
            PlayerCommand::Volume { volume } => self.queue.volume(&mut self.store, volume),
            PlayerCommand::Shuffle { shuffle } => self.queue.shuffle(&mut self.store, shuffle),
            PlayerCommand::Repeat { repeat } => self.queue.repeat(&mut self.store, repeat),
        }
    }

    fn play_playlist_by_id(&mut self, id: &str) -> Result<()> {
        let owner = self
            .store
            .state()
            .library
            .playlist_of_track(id)
            .map(|playlist| (playlist.id.clone(), playlist.tracks.clone()));
        if let Some((playlist_id, tracks)) = owner {
            return self.queue.start_queue(&mut self.store, tracks, id, &playlist_id);
        }
        if !self.queue.start_playlist(&mut self.store, id)? {
            debug!("Ignoring playlist play for unknown or empty id {}", id);
        }
        Ok(())
    }

    fn apply_library(&mut self, intent: LibraryIntent) -> Result<()> {
        let engine = self.engine.as_mut();
        match &intent {
            LibraryIntent::RemoveSound { id } => {
                self.sounds.stop(&mut self.store, engine, &self.events, id)?;
            }
            LibraryIntent::RemovePlaylist { id } => {
                let queued = self.store.state().playback.queue.as_ref().map(|q| q.playlist_id() == id);
                if queued == Some(true) {
                    info!("Queued playlist {} removed, stopping queue", id);
                    self.store.apply(crate::store::PlaybackIntent::StopQueue)?;
                }
            }
            LibraryIntent::RemoveTrack { track_id, .. } => {
                let current = self.store.state().playback.queue.as_ref().map(|q| q.track_id() == track_id);
                if current == Some(true) {
                    info!("Current track {} removed, stopping queue", track_id);
                    self.store.apply(crate::store::PlaybackIntent::StopQueue)?;
                }
            }
            _ => {}
        }

        let edited = match &intent {
            LibraryIntent::EditSound(edit) => edit.id.clone(),
            _ => None,
        };
        self.store.apply(intent)?;

        if let Some(id) = edited {
            if let Some(sound) = self.store.state().library.sounds.get(&id).cloned() {
                self.sounds.refresh(&mut self.store, sound)?;
            }
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<()> {
        let engine = self.engine.as_mut();
        self.sounds.poll(&mut self.store, engine, &self.events)?;

        match self.sync.poll_track(&mut self.store, engine, &self.events)? {
            TrackSignal::Ended => {
                self.track_failures = 0;
                if let Some(step) = self.queue.track_ended(&mut self.store)? {
                    debug!("Auto-advance: {:?}", step);
                }
            }
            TrackSignal::Failed => self.skip_failed_track()?,
            TrackSignal::Running => self.track_failures = 0,
            TrackSignal::Idle | TrackSignal::Loading => {}
        }
        Ok(())
    }

    /// Reconcile until the queue track is running, loading or idle
    fn settle(&mut self) -> Result<()> {
        loop {
            let engine = self.engine.as_mut();
            self.sync
                .reconcile_sounds(self.store.state(), self.sounds.instances_mut(), engine);
            match self.sync.reconcile_track(self.store.state(), engine, &self.events) {
                TrackSignal::Failed => self.skip_failed_track()?,
                _ => return Ok(()),
            }
        }
    }

    /// Move past a track that cannot play; give up once every track failed
    fn skip_failed_track(&mut self) -> Result<()> {
        self.track_failures += 1;
        let len = self
            .store
            .state()
            .playback
            .queue
            .as_ref()
            .map(|q| q.len())
            .unwrap_or(0);

        if self.track_failures >= len {
            warn!("No playable track left in queue, stopping");
            self.track_failures = 0;
            return self.store.apply(crate::store::PlaybackIntent::StopQueue);
        }
        match self.queue.next(&mut self.store)? {
            Some(Step::Finish) | None => self.track_failures = 0,
            Some(_) => {}
        }
        Ok(())
    }

    fn announce(&self, before: Summary) {
        let after = Summary::of(self.store.state());
        if after == before {
            return;
        }
        if before.playlist_id.is_some() && after.playlist_id.is_none() {
            if let Some(playlist_id) = before.playlist_id.clone() {
                self.events.emit(HostEvent::QueueFinished {
                    playlist_id,
                    timestamp: time::now(),
                });
            }
        }
        self.events.emit(HostEvent::PlaybackStateChanged {
            playing: after.playing,
            track_id: after.track_id,
            timestamp: time::now(),
        });
    }
}
