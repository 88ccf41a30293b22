//! Library domain: playlists, tracks, collections, sounds and scenes
//!
//! Mutations are expressed as [`LibraryIntent`] values and applied by
//! [`apply`]. A rejected intent returns [`Error::InvalidMutation`] and the
//! caller discards the partially edited copy, so a failed transition never
//! becomes visible.
//!
//! Referential rules:
//! - every id in `Playlist::tracks` resolves to a live track, and a track
//!   belongs to exactly one playlist
//! - collections and scenes hold sound ids by reference; removing a sound
//!   strips it from every membership list, removing a collection or scene
//!   never removes sounds

use super::table::{move_id, Table};
use crate::error::{Error, Result};
use cuedeck_common::models::{Collection, Playlist, Scene, Sound, Track};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    pub playlists: Table<Playlist>,
    pub tracks: Table<Track>,
    pub collections: Table<Collection>,
    pub sounds: Table<Sound>,
    pub scenes: Table<Scene>,
}

/// Partial playlist update; `id` is required
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaylistEdit {
    pub id: Option<String>,
    pub title: Option<String>,
    pub background: Option<String>,
}

/// Partial collection update; `id` is required
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CollectionEdit {
    pub id: Option<String>,
    pub title: Option<String>,
    pub background: Option<String>,
}

/// Partial sound update; `id` is required
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundEdit {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    pub volume: Option<f32>,
    pub fade_in: Option<u64>,
    pub fade_out: Option<u64>,
}

/// Partial scene update; `id` is required
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SceneEdit {
    pub id: Option<String>,
    pub title: Option<String>,
    pub background: Option<String>,
    pub duration: Option<u64>,
    pub nodes: Option<serde_json::Value>,
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryIntent {
    AddPlaylist { playlist: Playlist, tracks: Vec<Track> },
    RemovePlaylist { id: String },
    EditPlaylist(PlaylistEdit),
    MovePlaylist { active: String, over: String },
    /// New tracks go to the front of the playlist, keeping their given order
    AddTracks { playlist_id: String, tracks: Vec<Track> },
    RemoveTrack { playlist_id: String, track_id: String },
    MoveTrack { playlist_id: String, active: String, over: String },

    AddCollection(Collection),
    RemoveCollection { id: String },
    EditCollection(CollectionEdit),
    MoveCollection { active: String, over: String },
    /// New members go to the front of the collection
    AddCollectionSounds { collection_id: String, sound_ids: Vec<String> },
    RemoveCollectionSound { collection_id: String, sound_id: String },
    MoveCollectionSound { collection_id: String, active: String, over: String },

    AddSounds(Vec<Sound>),
    RemoveSound { id: String },
    EditSound(SoundEdit),

    AddScene(Scene),
    RemoveScene { id: String },
    EditScene(SceneEdit),
    MoveScene { active: String, over: String },
    AddSceneSounds { scene_id: String, sound_ids: Vec<String> },
    RemoveSceneSound { scene_id: String, sound_id: String },
}

impl LibraryIntent {
    pub fn name(&self) -> &'static str {
        match self {
            LibraryIntent::AddPlaylist { .. } => "addPlaylist",
            LibraryIntent::RemovePlaylist { .. } => "removePlaylist",
            LibraryIntent::EditPlaylist(_) => "editPlaylist",
            LibraryIntent::MovePlaylist { .. } => "movePlaylist",
            LibraryIntent::AddTracks { .. } => "addTracks",
            LibraryIntent::RemoveTrack { .. } => "removeTrack",
            LibraryIntent::MoveTrack { .. } => "moveTrack",
            LibraryIntent::AddCollection(_) => "addCollection",
            LibraryIntent::RemoveCollection { .. } => "removeCollection",
            LibraryIntent::EditCollection(_) => "editCollection",
            LibraryIntent::MoveCollection { .. } => "moveCollection",
            LibraryIntent::AddCollectionSounds { .. } => "addCollectionSounds",
            LibraryIntent::RemoveCollectionSound { .. } => "removeCollectionSound",
            LibraryIntent::MoveCollectionSound { .. } => "moveCollectionSound",
            LibraryIntent::AddSounds(_) => "addSounds",
            LibraryIntent::RemoveSound { .. } => "removeSound",
            LibraryIntent::EditSound(_) => "editSound",
            LibraryIntent::AddScene(_) => "addScene",
            LibraryIntent::RemoveScene { .. } => "removeScene",
            LibraryIntent::EditScene(_) => "editScene",
            LibraryIntent::MoveScene { .. } => "moveScene",
            LibraryIntent::AddSceneSounds { .. } => "addSceneSounds",
            LibraryIntent::RemoveSceneSound { .. } => "removeSceneSound",
        }
    }
}

fn require_id(id: &Option<String>, action: &str) -> Result<String> {
    id.clone()
        .ok_or_else(|| Error::invalid(format!("Id needed in {} payload", action)))
}

fn missing(kind: &str, id: &str) -> Error {
    Error::invalid(format!("Unknown {} id: {}", kind, id))
}

fn moved(ok: bool, kind: &str, active: &str, over: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "Cannot move {} {} over {}: id not found",
            kind, active, over
        )))
    }
}

/// Apply one intent in place
pub fn apply(library: &mut Library, intent: LibraryIntent) -> Result<()> {
    match intent {
        LibraryIntent::AddPlaylist { playlist, tracks } => {
            if library.playlists.contains(&playlist.id) {
                return Err(Error::invalid(format!("Playlist {} already exists", playlist.id)));
            }
            let given: HashSet<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
            if let Some(dangling) = playlist.tracks.iter().find(|id| !given.contains(id.as_str())) {
                return Err(missing("track", dangling));
            }
            for track in tracks {
                if library.tracks.contains(&track.id) {
                    return Err(Error::invalid(format!("Track {} already exists", track.id)));
                }
                library.tracks.insert(track);
            }
            library.playlists.insert(playlist);
        }
        LibraryIntent::RemovePlaylist { id } => {
            let playlist = library
                .playlists
                .remove(&id)
                .ok_or_else(|| missing("playlist", &id))?;
            for track_id in &playlist.tracks {
                library.tracks.remove(track_id);
            }
        }
        LibraryIntent::EditPlaylist(edit) => {
            let id = require_id(&edit.id, "editPlaylist")?;
            let playlist = library
                .playlists
                .get_mut(&id)
                .ok_or_else(|| missing("playlist", &id))?;
            if let Some(title) = edit.title {
                playlist.title = title;
            }
            if let Some(background) = edit.background {
                playlist.background = background;
            }
        }
        LibraryIntent::MovePlaylist { active, over } => {
            let ok = library.playlists.move_item(&active, &over);
            moved(ok, "playlist", &active, &over)?;
        }
        LibraryIntent::AddTracks { playlist_id, tracks } => {
            if !library.playlists.contains(&playlist_id) {
                return Err(missing("playlist", &playlist_id));
            }
            let mut new_ids = Vec::with_capacity(tracks.len());
            for track in tracks {
                if library.tracks.contains(&track.id) {
                    return Err(Error::invalid(format!("Track {} already exists", track.id)));
                }
                new_ids.push(track.id.clone());
                library.tracks.insert(track);
            }
            if let Some(playlist) = library.playlists.get_mut(&playlist_id) {
                playlist.tracks.splice(0..0, new_ids);
            }
        }
        LibraryIntent::RemoveTrack { playlist_id, track_id } => {
            let playlist = library
                .playlists
                .get_mut(&playlist_id)
                .ok_or_else(|| missing("playlist", &playlist_id))?;
            if !playlist.tracks.contains(&track_id) {
                return Err(missing("track", &track_id));
            }
            playlist.tracks.retain(|id| id != &track_id);
            library.tracks.remove(&track_id);
        }
        LibraryIntent::MoveTrack { playlist_id, active, over } => {
            let playlist = library
                .playlists
                .get_mut(&playlist_id)
                .ok_or_else(|| missing("playlist", &playlist_id))?;
            let ok = move_id(&mut playlist.tracks, &active, &over);
            moved(ok, "track", &active, &over)?;
        }

        LibraryIntent::AddCollection(collection) => {
            if library.collections.contains(&collection.id) {
                return Err(Error::invalid(format!("Collection {} already exists", collection.id)));
            }
            if let Some(dangling) = collection.sounds.iter().find(|id| !library.sounds.contains(id)) {
                return Err(missing("sound", dangling));
            }
            library.collections.insert(collection);
        }
        LibraryIntent::RemoveCollection { id } => {
            library
                .collections
                .remove(&id)
                .ok_or_else(|| missing("collection", &id))?;
        }
        LibraryIntent::EditCollection(edit) => {
            let id = require_id(&edit.id, "editCollection")?;
            let collection = library
                .collections
                .get_mut(&id)
                .ok_or_else(|| missing("collection", &id))?;
            if let Some(title) = edit.title {
                collection.title = title;
            }
            if let Some(background) = edit.background {
                collection.background = background;
            }
        }
        LibraryIntent::MoveCollection { active, over } => {
            let ok = library.collections.move_item(&active, &over);
            moved(ok, "collection", &active, &over)?;
        }
        LibraryIntent::AddCollectionSounds { collection_id, sound_ids } => {
            if let Some(dangling) = sound_ids.iter().find(|id| !library.sounds.contains(id)) {
                return Err(missing("sound", dangling));
            }
            let collection = library
                .collections
                .get_mut(&collection_id)
                .ok_or_else(|| missing("collection", &collection_id))?;
            let fresh: Vec<String> = sound_ids
                .into_iter()
                .filter(|id| !collection.sounds.contains(id))
                .collect();
            collection.sounds.splice(0..0, fresh);
        }
        LibraryIntent::RemoveCollectionSound { collection_id, sound_id } => {
            let collection = library
                .collections
                .get_mut(&collection_id)
                .ok_or_else(|| missing("collection", &collection_id))?;
            collection.sounds.retain(|id| id != &sound_id);
        }
        LibraryIntent::MoveCollectionSound { collection_id, active, over } => {
            let collection = library
                .collections
                .get_mut(&collection_id)
                .ok_or_else(|| missing("collection", &collection_id))?;
            let ok = move_id(&mut collection.sounds, &active, &over);
            moved(ok, "sound", &active, &over)?;
        }

        LibraryIntent::AddSounds(sounds) => {
            for mut sound in sounds {
                sound.volume = sound.volume.clamp(0.0, 1.0);
                library.sounds.insert(sound);
            }
        }
        LibraryIntent::RemoveSound { id } => {
            library.sounds.remove(&id).ok_or_else(|| missing("sound", &id))?;
            for collection in library.collections.values_mut() {
                collection.sounds.retain(|sound_id| sound_id != &id);
            }
            for scene in library.scenes.values_mut() {
                scene.sound_ids.retain(|sound_id| sound_id != &id);
            }
        }
        LibraryIntent::EditSound(edit) => {
            let id = require_id(&edit.id, "editSound")?;
            let sound = library.sounds.get_mut(&id).ok_or_else(|| missing("sound", &id))?;
            if let Some(url) = edit.url {
                sound.url = url;
            }
            if let Some(title) = edit.title {
                sound.title = title;
            }
            if let Some(looping) = edit.looping {
                sound.looping = looping;
            }
            if let Some(volume) = edit.volume {
                sound.volume = volume.clamp(0.0, 1.0);
            }
            if let Some(fade_in) = edit.fade_in {
                sound.fade_in = fade_in;
            }
            if let Some(fade_out) = edit.fade_out {
                sound.fade_out = fade_out;
            }
        }

        LibraryIntent::AddScene(scene) => {
            if library.scenes.contains(&scene.id) {
                return Err(Error::invalid(format!("Scene {} already exists", scene.id)));
            }
            if let Some(dangling) = scene.sound_ids.iter().find(|id| !library.sounds.contains(id)) {
                return Err(missing("sound", dangling));
            }
            library.scenes.insert(scene);
        }
        LibraryIntent::RemoveScene { id } => {
            library.scenes.remove(&id).ok_or_else(|| missing("scene", &id))?;
        }
        LibraryIntent::EditScene(edit) => {
            let id = require_id(&edit.id, "editScene")?;
            let scene = library.scenes.get_mut(&id).ok_or_else(|| missing("scene", &id))?;
            if let Some(title) = edit.title {
                scene.title = title;
            }
            if let Some(background) = edit.background {
                scene.background = background;
            }
            if let Some(duration) = edit.duration {
                scene.duration = duration;
            }
            if let Some(nodes) = edit.nodes {
                scene.nodes = nodes;
            }
            if let Some(variables) = edit.variables {
                scene.variables = variables;
            }
        }
        LibraryIntent::MoveScene { active, over } => {
            let ok = library.scenes.move_item(&active, &over);
            moved(ok, "scene", &active, &over)?;
        }
        LibraryIntent::AddSceneSounds { scene_id, sound_ids } => {
            if let Some(dangling) = sound_ids.iter().find(|id| !library.sounds.contains(id)) {
                return Err(missing("sound", dangling));
            }
            let scene = library
                .scenes
                .get_mut(&scene_id)
                .ok_or_else(|| missing("scene", &scene_id))?;
            for id in sound_ids {
                if !scene.sound_ids.contains(&id) {
                    scene.sound_ids.push(id);
                }
            }
        }
        LibraryIntent::RemoveSceneSound { scene_id, sound_id } => {
            let scene = library
                .scenes
                .get_mut(&scene_id)
                .ok_or_else(|| missing("scene", &scene_id))?;
            scene.sound_ids.retain(|id| id != &sound_id);
        }
    }
    Ok(())
}

impl Library {
    /// Check every cross-reference
    pub fn validate(&self) -> Result<()> {
        let mut owners: HashSet<&str> = HashSet::new();
        for playlist in self.playlists.iter() {
            for track_id in &playlist.tracks {
                if !self.tracks.contains(track_id) {
                    return Err(missing("track", track_id));
                }
                if !owners.insert(track_id) {
                    return Err(Error::invalid(format!(
                        "Track {} belongs to more than one playlist",
                        track_id
                    )));
                }
            }
        }
        for collection in self.collections.iter() {
            if let Some(dangling) = collection.sounds.iter().find(|id| !self.sounds.contains(id)) {
                return Err(missing("sound", dangling));
            }
        }
        for scene in self.scenes.iter() {
            if let Some(dangling) = scene.sound_ids.iter().find(|id| !self.sounds.contains(id)) {
                return Err(missing("sound", dangling));
            }
        }
        Ok(())
    }

    /// Drop every reference [`validate`](Self::validate) would reject and
    /// return how many were dropped. A track claimed by several playlists
    /// stays with the first one in display order.
    pub fn repair(&mut self) -> usize {
        let mut dropped = 0;
        let mut owners: HashSet<String> = HashSet::new();
        let playlist_ids = self.playlists.ids().to_vec();
        for playlist_id in playlist_ids {
            let Some(playlist) = self.playlists.get_mut(&playlist_id) else {
                continue;
            };
            let before = playlist.tracks.len();
            let tracks = &self.tracks;
            playlist
                .tracks
                .retain(|id| tracks.contains(id) && owners.insert(id.clone()));
            dropped += before - playlist.tracks.len();
        }

        let sounds = &self.sounds;
        for collection in self.collections.values_mut() {
            let before = collection.sounds.len();
            collection.sounds.retain(|id| sounds.contains(id));
            dropped += before - collection.sounds.len();
        }
        for scene in self.scenes.values_mut() {
            let before = scene.sound_ids.len();
            scene.sound_ids.retain(|id| sounds.contains(id));
            dropped += before - scene.sound_ids.len();
        }
        dropped
    }

    /// Playlist owning a track
    pub fn playlist_of_track(&self, track_id: &str) -> Option<&Playlist> {
        self.playlists
            .iter()
            .find(|playlist| playlist.tracks.iter().any(|id| id == track_id))
    }
}
