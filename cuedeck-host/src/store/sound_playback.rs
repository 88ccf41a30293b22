//! Live soundboard playback records, keyed by sound id

use super::table::Table;
use crate::error::Result;
use cuedeck_common::models::{Sound, SoundPlayback};

pub type SoundPlaybackMap = Table<SoundPlayback>;

#[derive(Debug, Clone, PartialEq)]
pub enum SoundIntent {
    /// Start (or restart) a sound; replaces any record with the same id
    Play { sound: Sound, duration: u64 },
    Stop { id: String },
    /// Batch of `(id, progress)`; ids without a record are ignored
    UpdateProgress(Vec<(String, u64)>),
    SetDuration { id: String, duration: u64 },
    /// Carry edited sound settings into a live record, keeping its position
    Refresh(Sound),
}

pub fn apply(map: &mut SoundPlaybackMap, intent: SoundIntent) -> Result<()> {
    match intent {
        SoundIntent::Play { sound, duration } => {
            map.insert(SoundPlayback::new(sound, duration));
        }
        SoundIntent::Stop { id } => {
            map.remove(&id);
        }
        SoundIntent::UpdateProgress(updates) => {
            for (id, progress) in updates {
                if let Some(record) = map.get_mut(&id) {
                    record.progress = progress;
                }
            }
        }
        SoundIntent::SetDuration { id, duration } => {
            if let Some(record) = map.get_mut(&id) {
                record.duration = duration;
            }
        }
        SoundIntent::Refresh(sound) => {
            if let Some(record) = map.get_mut(&sound.id) {
                record.sound = sound;
            }
        }
    }
    Ok(())
}
