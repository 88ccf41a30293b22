//! Library and player fixtures
//!
//! Library layout:
//! - playlist `p1`: `t1`, `t2`, `t3`; playlist `p2`: `t4`
//! - sounds `s1` (fade in 100, fade out 200), `s2` (looping), `s3`
//! - collection `c1`: `s1`, `s2`; collection `empty`: nothing

use super::recording_engine::RecordingEngine;
use cuedeck_common::events::HostEvent;
use cuedeck_common::models::{Collection, Playlist, Sound, Track};
use cuedeck_host::events::EventBus;
use cuedeck_host::playback::Player;
use cuedeck_host::store::{library, Library, LibraryIntent, PlaybackPreferences, StoreState};
use tokio::sync::broadcast;

pub fn track(id: &str) -> Track {
    Track {
        id: id.into(),
        url: format!("file:///music/{}.mp3", id),
        title: format!("Track {}", id),
    }
}

pub fn sound(id: &str) -> Sound {
    Sound {
        id: id.into(),
        url: format!("file:///sounds/{}.wav", id),
        title: format!("Sound {}", id),
        looping: false,
        volume: 0.8,
        fade_in: 0,
        fade_out: 0,
    }
}

fn playlist(id: &str, tracks: &[&str]) -> LibraryIntent {
    LibraryIntent::AddPlaylist {
        playlist: Playlist {
            id: id.into(),
            title: id.to_uppercase(),
            background: String::new(),
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
        },
        tracks: tracks.iter().map(|t| track(t)).collect(),
    }
}

fn collection(id: &str, sounds: &[&str]) -> LibraryIntent {
    LibraryIntent::AddCollection(Collection {
        id: id.into(),
        title: id.to_uppercase(),
        background: String::new(),
        sounds: sounds.iter().map(|s| s.to_string()).collect(),
    })
}

pub fn library() -> Library {
    let mut lib = Library::default();
    let s1 = Sound {
        fade_in: 100,
        fade_out: 200,
        ..sound("s1")
    };
    let s2 = Sound {
        looping: true,
        ..sound("s2")
    };
    let intents = vec![
        playlist("p1", &["t1", "t2", "t3"]),
        playlist("p2", &["t4"]),
        LibraryIntent::AddSounds(vec![s1, s2, sound("s3")]),
        collection("c1", &["s1", "s2"]),
        collection("empty", &[]),
    ];
    for intent in intents {
        library::apply(&mut lib, intent).unwrap();
    }
    lib
}

pub struct Fixture {
    pub player: Player,
    pub engine: RecordingEngine,
    pub events: broadcast::Receiver<HostEvent>,
}

impl Fixture {
    /// Events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<HostEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn event_types(&mut self) -> Vec<&'static str> {
        self.drain_events().iter().map(HostEvent::event_type).collect()
    }

    /// Instance currently playing the queue track
    pub fn track_instance(&self) -> Option<u64> {
        self.player.sync().track_instance()
    }
}

pub fn player(seed: u64) -> Fixture {
    let engine = RecordingEngine::new();
    let bus = EventBus::new(64);
    let events = bus.subscribe();
    let state = StoreState::new(library(), PlaybackPreferences::default());
    let player = Player::with_seed(state, Box::new(engine.clone()), bus, seed);
    Fixture {
        player,
        engine,
        events,
    }
}
