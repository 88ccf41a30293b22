//! Playback sync adapter
//!
//! Reconciles desired state in the store with live engine instances. It
//! remembers what it last pushed to each instance and calls an engine setter
//! only when the store disagrees with that.
//!
//! Queue track handling:
//! - a new `track_epoch` replaces the track instance (old one stops at once)
//! - gain is `volume`, or 0 while muted
//! - `playing == false` pauses the instance
//! - a new `seek_epoch` seeks to the stored track progress
//!
//! An epoch whose start failed is remembered and never retried, so a broken
//! file cannot be restarted on every tick.

use crate::error::Result;
use crate::events::EventBus;
use crate::playback::engine::{AudioEngine, InstanceId, InstanceSpec, InstanceState};
use crate::playback::sounds::SoundInstance;
use crate::store::{PlaybackIntent, StoreState, Store};
use cuedeck_common::events::HostEvent;
use cuedeck_common::time;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// What the queue track is doing after a reconcile or poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSignal {
    /// No queue, or nothing to drive
    Idle,
    Loading,
    Running,
    /// Reached its end on its own
    Ended,
    /// Could not start or failed while loading
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
struct TrackInstance {
    instance: InstanceId,
    track_id: String,
    epoch: u64,
    seek_epoch: u64,
    volume: f32,
    paused: bool,
}

#[derive(Debug, Default)]
pub struct SyncAdapter {
    track: Option<TrackInstance>,
    failed_epoch: Option<u64>,
}

impl SyncAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance currently rendering the queue track
    pub fn track_instance(&self) -> Option<InstanceId> {
        self.track.as_ref().map(|t| t.instance)
    }

    /// Push sound volume/loop changes; returns the number of setter calls
    pub fn reconcile_sounds(
        &mut self,
        state: &StoreState,
        instances: &mut HashMap<String, SoundInstance>,
        engine: &mut dyn AudioEngine,
    ) -> usize {
        if state.sounds.is_empty() && instances.is_empty() {
            return 0;
        }

        let mut calls = 0;
        for (id, live) in instances.iter_mut() {
            let Some(record) = state.sounds.get(id) else {
                continue;
            };
            if live.volume != record.sound.volume {
                engine.set_volume(live.instance, record.sound.volume);
                live.volume = record.sound.volume;
                calls += 1;
            }
            if live.looping != record.sound.looping {
                engine.set_looping(live.instance, record.sound.looping);
                live.looping = record.sound.looping;
                calls += 1;
            }
        }
        calls
    }

    /// Bring the queue track instance in line with the playback state
    pub fn reconcile_track(
        &mut self,
        state: &StoreState,
        engine: &mut dyn AudioEngine,
        events: &EventBus,
    ) -> TrackSignal {
        let playback = &state.playback;

        let Some(queue) = playback.queue.as_ref() else {
            if let Some(old) = self.track.take() {
                debug!("Queue cleared, stopping track instance {}", old.instance);
                engine.stop(old.instance, 0);
            }
            return TrackSignal::Idle;
        };

        let current_epoch = self.track.as_ref().map(|t| t.epoch);
        if current_epoch != Some(playback.track_epoch) {
            if let Some(old) = self.track.take() {
                engine.stop(old.instance, 0);
            }
            if self.failed_epoch == Some(playback.track_epoch) {
                return TrackSignal::Idle;
            }

            let Some(track) = playback.track.as_ref() else {
                self.fail_epoch(playback.track_epoch, queue.track_id(), "Track no longer exists", events);
                return TrackSignal::Failed;
            };

            let volume = playback.effective_volume();
            let spec = InstanceSpec {
                url: track.track.url.clone(),
                volume,
                looping: false,
                fade_in_ms: 0,
            };
            let instance = match engine.start(spec) {
                Ok(instance) => instance,
                Err(e) => {
                    self.fail_epoch(playback.track_epoch, &track.track.id, &e.to_string(), events);
                    return TrackSignal::Failed;
                }
            };

            let paused = !playback.playing;
            if paused {
                engine.set_paused(instance, true);
            }
            if track.progress > 0 {
                engine.seek(instance, track.progress);
            }
            info!("Track {} started ({})", track.track.id, track.track.title);
            self.track = Some(TrackInstance {
                instance,
                track_id: track.track.id.clone(),
                epoch: playback.track_epoch,
                seek_epoch: playback.seek_epoch,
                volume,
                paused,
            });
            events.emit(HostEvent::TrackStarted {
                track_id: track.track.id.clone(),
                playlist_id: queue.playlist_id().to_string(),
                timestamp: time::now(),
            });
            return TrackSignal::Loading;
        }

        let Some(live) = self.track.as_mut() else {
            return TrackSignal::Idle;
        };

        let volume = playback.effective_volume();
        if live.volume != volume {
            engine.set_volume(live.instance, volume);
            live.volume = volume;
        }
        let paused = !playback.playing;
        if live.paused != paused {
            engine.set_paused(live.instance, paused);
            live.paused = paused;
        }
        if live.seek_epoch != playback.seek_epoch {
            let position = playback.track.as_ref().map(|t| t.progress).unwrap_or(0);
            engine.seek(live.instance, position);
            live.seek_epoch = playback.seek_epoch;
        }
        TrackSignal::Running
    }

    /// Read the track instance status and feed its progress into the store
    pub fn poll_track(
        &mut self,
        store: &mut Store,
        engine: &mut dyn AudioEngine,
        events: &EventBus,
    ) -> Result<TrackSignal> {
        let Some(live) = self.track.as_ref() else {
            return Ok(TrackSignal::Idle);
        };
        let (instance, epoch, track_id) = (live.instance, live.epoch, live.track_id.clone());

        let Some(status) = engine.status(instance) else {
            self.track = None;
            self.fail_epoch(epoch, &track_id, "Instance released by engine", events);
            return Ok(TrackSignal::Failed);
        };

        match status.state {
            InstanceState::Ended => {
                debug!("Track {} reached its end", track_id);
                self.track = None;
                engine.stop(instance, 0);
                Ok(TrackSignal::Ended)
            }
            InstanceState::Failed(message) => {
                self.track = None;
                engine.stop(instance, 0);
                self.fail_epoch(epoch, &track_id, &message, events);
                Ok(TrackSignal::Failed)
            }
            state => {
                let recorded = store.state().playback.track.as_ref().map(|t| (t.progress, t.duration));
                let measured = (status.position_ms, status.duration_ms.unwrap_or(0));
                if recorded.is_some() && recorded != Some(measured) {
                    store.apply(PlaybackIntent::TrackProgress {
                        progress: status.position_ms,
                        duration: status.duration_ms,
                    })?;
                }
                Ok(match state {
                    InstanceState::Loading => TrackSignal::Loading,
                    _ => TrackSignal::Running,
                })
            }
        }
    }

    fn fail_epoch(&mut self, epoch: u64, track_id: &str, message: &str, events: &EventBus) {
        warn!("Track {} failed: {}", track_id, message);
        self.failed_epoch = Some(epoch);
        events.emit(HostEvent::EngineError {
            id: track_id.to_string(),
            message: message.to_string(),
            timestamp: time::now(),
        });
    }
}
