//! Library models shared by the host and the remote protocol
//!
//! Field names serialize in camelCase so persisted data and remote replies use
//! the same shape controllers already consume.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A playlist entry. Immutable once created; owned by exactly one playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub url: String,
    pub title: String,
}

/// Ordered list of track ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub tracks: Vec<String>,
}

/// Reusable playable asset, shared by reference between collections and scenes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(rename = "loop", default)]
    pub looping: bool,
    /// Linear gain, 0.0-1.0
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Fade-in length in milliseconds
    #[serde(default)]
    pub fade_in: u64,
    /// Fade-out length in milliseconds
    #[serde(default)]
    pub fade_out: u64,
}

fn default_volume() -> f32 {
    1.0
}

/// Soundboard: membership list only, never owns its sounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub sounds: Vec<String>,
}

/// Higher-level grouping of sounds
///
/// Graph nodes and variables are carried verbatim; only `sound_ids` takes part
/// in playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub background: String,
    /// Scene length in milliseconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub nodes: serde_json::Value,
    #[serde(default)]
    pub variables: serde_json::Value,
    #[serde(default)]
    pub sound_ids: Vec<String>,
}

/// Playlist repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    Off,
    One,
    All,
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repeat::Off => write!(f, "off"),
            Repeat::One => write!(f, "one"),
            Repeat::All => write!(f, "all"),
        }
    }
}

impl FromStr for Repeat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Repeat::Off),
            "one" => Ok(Repeat::One),
            "all" => Ok(Repeat::All),
            other => Err(crate::Error::InvalidInput(format!("Unknown repeat mode: {}", other))),
        }
    }
}

/// Live record of a playing sound
///
/// Created when the sound starts and removed when it stops. `duration` stays
/// 0 until the engine has loaded the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundPlayback {
    #[serde(flatten)]
    pub sound: Sound,
    /// Position in milliseconds
    pub progress: u64,
    /// Length in milliseconds
    pub duration: u64,
}

impl SoundPlayback {
    pub fn new(sound: Sound, duration: u64) -> Self {
        Self {
            sound,
            progress: 0,
            duration,
        }
    }

    pub fn id(&self) -> &str {
        &self.sound.id
    }
}

/// Current queue track with measured progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPlayback {
    #[serde(flatten)]
    pub track: Track,
    pub progress: u64,
    pub duration: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sound_serializes_camel_case_with_loop_keyword() {
        let sound = Sound {
            id: "s1".into(),
            url: "file:///rain.ogg".into(),
            title: "Rain".into(),
            looping: true,
            volume: 0.5,
            fade_in: 100,
            fade_out: 200,
        };

        let value = serde_json::to_value(&sound).unwrap();
        assert_eq!(value["loop"], json!(true));
        assert_eq!(value["fadeIn"], json!(100));
        assert_eq!(value["fadeOut"], json!(200));
    }

    #[test]
    fn test_sound_defaults_when_fields_missing() {
        let sound: Sound =
            serde_json::from_value(json!({"id": "s", "url": "u", "title": "t"})).unwrap();
        assert!(!sound.looping);
        assert_eq!(sound.volume, 1.0);
        assert_eq!(sound.fade_in, 0);
    }

    #[test]
    fn test_sound_playback_flattens_sound_fields() {
        let record = SoundPlayback::new(
            serde_json::from_value(json!({"id": "s", "url": "u", "title": "t"})).unwrap(),
            3000,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], json!("s"));
        assert_eq!(value["progress"], json!(0));
        assert_eq!(value["duration"], json!(3000));
    }

    #[test]
    fn test_repeat_round_trips_lowercase() {
        assert_eq!(serde_json::to_value(Repeat::All).unwrap(), json!("all"));
        assert_eq!("one".parse::<Repeat>().unwrap(), Repeat::One);
        assert!("sometimes".parse::<Repeat>().is_err());
    }

    #[test]
    fn test_scene_keeps_opaque_graph() {
        let scene: Scene = serde_json::from_value(json!({
            "id": "sc",
            "title": "Tavern",
            "nodes": {"byId": {"n1": {"id": "n1"}}, "allIds": ["n1"]},
            "soundIds": ["s1"]
        }))
        .unwrap();
        assert_eq!(scene.sound_ids, vec!["s1".to_string()]);
        assert_eq!(scene.nodes["allIds"][0], json!("n1"));
    }
}
