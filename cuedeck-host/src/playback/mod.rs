//! Playback: queue engine, sound manager, sync adapter and the player that
//! ties them to one store and one audio engine

pub mod engine;
pub mod player;
pub mod queue;
pub mod sounds;
pub mod sync;

pub use engine::{AudioEngine, EngineError, InstanceId, InstanceSpec, InstanceState, InstanceStatus};
pub use player::{Player, PlayerCommand};
pub use queue::{QueueEngine, QueueStatus, Step};
pub use sounds::{SoundInstance, SoundPlaybackManager};
pub use sync::{SyncAdapter, TrackSignal};
