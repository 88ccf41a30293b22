//! Collection/sound playback manager
//!
//! Owns the live engine instance of every playing soundboard sound and is,
//! together with its own [`poll`](SoundPlaybackManager::poll) tick, the only
//! writer of the store's sound playback map.
//!
//! - `play` on an id that is already playing stops the old instance at once
//!   (no fade) before starting the new one with the sound's fade-in
//! - `stop` fades out with the sound's fade-out and forgets the id at once
//! - a random collection pick is uniform over the whole list and may repeat
//!   the previous pick

use crate::error::Result;
use crate::events::EventBus;
use crate::playback::engine::{AudioEngine, InstanceId, InstanceSpec, InstanceState};
use crate::store::{SoundIntent, Store};
use cuedeck_common::events::HostEvent;
use cuedeck_common::models::Sound;
use cuedeck_common::time;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Engine instance for one sound with the settings last pushed to it
#[derive(Debug, Clone, PartialEq)]
pub struct SoundInstance {
    pub instance: InstanceId,
    pub volume: f32,
    pub looping: bool,
}

pub struct SoundPlaybackManager<R = StdRng> {
    instances: HashMap<String, SoundInstance>,
    rng: R,
}

impl SoundPlaybackManager<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for SoundPlaybackManager<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SoundPlaybackManager<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            instances: HashMap::new(),
            rng,
        }
    }

    pub fn instance(&self, id: &str) -> Option<&SoundInstance> {
        self.instances.get(id)
    }

    pub(crate) fn instances_mut(&mut self) -> &mut HashMap<String, SoundInstance> {
        &mut self.instances
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Start `sound`, replacing any instance already playing it
    ///
    /// An engine refusal is reported as an event and leaves no record.
    pub fn play(
        &mut self,
        store: &mut Store,
        engine: &mut dyn AudioEngine,
        events: &EventBus,
        sound: Sound,
    ) -> Result<()> {
        if let Some(previous) = self.instances.remove(&sound.id) {
            debug!("Replacing instance {} of sound {}", previous.instance, sound.id);
            engine.stop(previous.instance, 0);
        }

        let spec = InstanceSpec {
            url: sound.url.clone(),
            volume: sound.volume,
            looping: sound.looping,
            fade_in_ms: sound.fade_in,
        };
        let instance = match engine.start(spec) {
            Ok(instance) => instance,
            Err(e) => {
                warn!("Sound {} could not start: {}", sound.id, e);
                store.apply(SoundIntent::Stop { id: sound.id.clone() })?;
                events.emit(HostEvent::EngineError {
                    id: sound.id,
                    message: e.to_string(),
                    timestamp: time::now(),
                });
                return Ok(());
            }
        };

        info!("Playing sound {} ({})", sound.id, sound.title);
        self.instances.insert(
            sound.id.clone(),
            SoundInstance {
                instance,
                volume: sound.volume,
                looping: sound.looping,
            },
        );
        let id = sound.id.clone();
        store.apply(SoundIntent::Play { sound, duration: 0 })?;
        events.emit(HostEvent::SoundStarted {
            sound_id: id,
            timestamp: time::now(),
        });
        Ok(())
    }

    /// Play a uniformly random member of a collection
    ///
    /// Returns the chosen sound id; an unknown or empty collection is a no-op.
    pub fn play_random_from_collection(
        &mut self,
        store: &mut Store,
        engine: &mut dyn AudioEngine,
        events: &EventBus,
        collection_id: &str,
    ) -> Result<Option<String>> {
        let picked = store
            .state()
            .library
            .collections
            .get(collection_id)
            .and_then(|collection| collection.sounds.choose(&mut self.rng))
            .and_then(|id| store.state().library.sounds.get(id))
            .cloned();
        let Some(sound) = picked else {
            debug!("Collection {} has nothing to play", collection_id);
            return Ok(None);
        };
        let id = sound.id.clone();
        self.play(store, engine, events, sound)?;
        Ok(Some(id))
    }

    /// Fade out and forget `id`; unknown ids are ignored
    pub fn stop(
        &mut self,
        store: &mut Store,
        engine: &mut dyn AudioEngine,
        events: &EventBus,
        id: &str,
    ) -> Result<bool> {
        let Some(playing) = self.instances.remove(id) else {
            return Ok(false);
        };
        let fade_out = store
            .state()
            .sounds
            .get(id)
            .map(|record| record.sound.fade_out)
            .unwrap_or(0);
        engine.stop(playing.instance, fade_out);
        store.apply(SoundIntent::Stop { id: id.to_string() })?;
        events.emit(HostEvent::SoundStopped {
            sound_id: id.to_string(),
            timestamp: time::now(),
        });
        debug!("Stopped sound {} (fade {} ms)", id, fade_out);
        Ok(true)
    }

    /// Stop every playing member of a collection
    pub fn stop_collection(
        &mut self,
        store: &mut Store,
        engine: &mut dyn AudioEngine,
        events: &EventBus,
        collection_id: &str,
    ) -> Result<usize> {
        let members = store
            .state()
            .library
            .collections
            .get(collection_id)
            .map(|collection| collection.sounds.clone())
            .unwrap_or_default();
        let mut stopped = 0;
        for id in members {
            if self.stop(store, engine, events, &id)? {
                stopped += 1;
            }
        }
        Ok(stopped)
    }

    pub fn stop_all(
        &mut self,
        store: &mut Store,
        engine: &mut dyn AudioEngine,
        events: &EventBus,
    ) -> Result<()> {
        let ids: Vec<String> = store.state().sounds.ids().to_vec();
        for id in ids {
            self.stop(store, engine, events, &id)?;
        }
        Ok(())
    }

    /// Carry edited settings into the live record of a playing sound
    pub fn refresh(&mut self, store: &mut Store, sound: Sound) -> Result<()> {
        if self.instances.contains_key(&sound.id) {
            store.apply(SoundIntent::Refresh(sound))?;
        }
        Ok(())
    }

    /// Pull positions from the engine into the store in one batch and
    /// retire instances that ended or failed
    pub fn poll(
        &mut self,
        store: &mut Store,
        engine: &mut dyn AudioEngine,
        events: &EventBus,
    ) -> Result<()> {
        if self.instances.is_empty() {
            return Ok(());
        }

        let mut progress = Vec::with_capacity(self.instances.len());
        let mut durations = Vec::new();
        let mut finished = Vec::new();

        for (id, playing) in &self.instances {
            let Some(status) = engine.status(playing.instance) else {
                finished.push((id.clone(), None));
                continue;
            };
            match status.state {
                InstanceState::Ended => finished.push((id.clone(), None)),
                InstanceState::Failed(message) => finished.push((id.clone(), Some(message))),
                _ => {
                    progress.push((id.clone(), status.position_ms));
                    let known = store.state().sounds.get(id).map(|r| r.duration).unwrap_or(0);
                    if let Some(duration) = status.duration_ms {
                        if duration != known {
                            durations.push((id.clone(), duration));
                        }
                    }
                }
            }
        }

        for (id, duration) in durations {
            store.apply(SoundIntent::SetDuration { id, duration })?;
        }
        if !progress.is_empty() {
            store.apply(SoundIntent::UpdateProgress(progress))?;
        }

        for (id, failure) in finished {
            if let Some(playing) = self.instances.remove(&id) {
                engine.stop(playing.instance, 0);
            }
            store.apply(SoundIntent::Stop { id: id.clone() })?;
            match failure {
                Some(message) => {
                    warn!("Sound {} failed: {}", id, message);
                    events.emit(HostEvent::EngineError {
                        id,
                        message,
                        timestamp: time::now(),
                    });
                }
                None => {
                    debug!("Sound {} reached its end", id);
                    events.emit(HostEvent::SoundStopped {
                        sound_id: id,
                        timestamp: time::now(),
                    });
                }
            }
        }
        Ok(())
    }
}
