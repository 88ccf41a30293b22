//! Normalized `{byId, allIds}` table
//!
//! `all_ids` carries display order; `by_id` carries the records. Both are
//! kept in lockstep by every mutation here.

use cuedeck_common::models::{Collection, Playlist, Scene, Sound, SoundPlayback, Track};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Anything stored in a [`Table`]
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Track {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Playlist {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Sound {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Collection {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Scene {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for SoundPlayback {
    fn key(&self) -> &str {
        self.id()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table<T> {
    by_id: HashMap<String, T>,
    all_ids: Vec<String>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            all_ids: Vec::new(),
        }
    }
}

impl<T: Keyed> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.all_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.by_id.get_mut(id)
    }

    /// Insert at the end, or replace in place when the id already exists
    pub fn insert(&mut self, item: T) {
        let id = item.key().to_string();
        if self.by_id.insert(id.clone(), item).is_none() {
            self.all_ids.push(id);
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.by_id.remove(id)?;
        self.all_ids.retain(|existing| existing != id);
        Some(removed)
    }

    /// Ids in display order
    pub fn ids(&self) -> &[String] {
        &self.all_ids
    }

    /// Records in display order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.all_ids.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.by_id.values_mut()
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.by_id.retain(|_, item| keep(item));
        let by_id = &self.by_id;
        self.all_ids.retain(|id| by_id.contains_key(id));
    }

    /// Move `active` to the position currently held by `over`
    pub fn move_item(&mut self, active: &str, over: &str) -> bool {
        move_id(&mut self.all_ids, active, over)
    }
}

impl<T: Keyed> FromIterator<T> for Table<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = Table::new();
        for item in iter {
            table.insert(item);
        }
        table
    }
}

/// Reorder an id list the way a drag-and-drop drop event does: remove
/// `active` and reinsert it at the index `over` had before the removal.
///
/// Returns false (list untouched) when either id is missing.
pub fn move_id(list: &mut Vec<String>, active: &str, over: &str) -> bool {
    let Some(from) = list.iter().position(|id| id == active) else {
        return false;
    };
    let Some(to) = list.iter().position(|id| id == over) else {
        return false;
    };
    let moved = list.remove(from);
    list.insert(to, moved);
    true
}
