//! Ephemeral view state
//!
//! Lives beside the domain state but is never persisted and never read by the
//! queue engine or the remote bridge.

use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Panel {
    AddSound,
    AddPlaylist,
    AddCollection,
    AddScene,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panels {
    pub add_sound_open: bool,
    pub add_playlist_open: bool,
    pub add_collection_open: bool,
    pub add_scene_open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub background: Option<String>,
    pub panels: Panels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewIntent {
    SetBackground(Option<String>),
    SetPanelOpen { panel: Panel, open: bool },
}

pub fn apply(view: &mut ViewState, intent: ViewIntent) -> Result<()> {
    match intent {
        ViewIntent::SetBackground(background) => view.background = background,
        ViewIntent::SetPanelOpen { panel, open } => {
            let flag = match panel {
                Panel::AddSound => &mut view.panels.add_sound_open,
                Panel::AddPlaylist => &mut view.panels.add_playlist_open,
                Panel::AddCollection => &mut view.panels.add_collection_open,
                Panel::AddScene => &mut view.panels.add_scene_open,
            };
            *flag = open;
        }
    }
    Ok(())
}
