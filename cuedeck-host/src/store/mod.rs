//! State store
//!
//! Single writer over immutable snapshots. Every transition clones the
//! current [`StoreState`] (four `Arc` bumps), edits the touched domain through
//! `Arc::make_mut`, and only publishes the result when the transition
//! succeeds. Readers hold `Arc<StoreState>` values and never observe a
//! half-applied change.
//!
//! Snapshots are published through a `tokio::sync::watch` channel; the
//! persister and the benchmarks subscribe to it.

pub mod library;
pub mod playback;
pub mod selectors;
pub mod sound_playback;
pub mod table;
pub mod view;

use crate::error::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

pub use library::{Library, LibraryIntent};
pub use playback::{PlaybackIntent, PlaybackPreferences, PlaybackState, Queue};
pub use sound_playback::{SoundIntent, SoundPlaybackMap};
pub use table::Table;
pub use view::{ViewIntent, ViewState};

/// Whole application state at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub library: Arc<Library>,
    pub playback: Arc<PlaybackState>,
    pub sounds: Arc<SoundPlaybackMap>,
    pub view: Arc<ViewState>,
}

impl StoreState {
    pub fn new(library: Library, preferences: PlaybackPreferences) -> Self {
        Self {
            library: Arc::new(library),
            playback: Arc::new(PlaybackState::from_preferences(preferences)),
            sounds: Arc::new(SoundPlaybackMap::new()),
            view: Arc::new(ViewState::default()),
        }
    }

    /// Content equality with a pointer fast path per domain
    fn same_as(&self, other: &StoreState) -> bool {
        fn same<T: PartialEq>(a: &Arc<T>, b: &Arc<T>) -> bool {
            Arc::ptr_eq(a, b) || **a == **b
        }
        same(&self.library, &other.library)
            && same(&self.playback, &other.playback)
            && same(&self.sounds, &other.sounds)
            && same(&self.view, &other.view)
    }
}

/// A requested state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Library(LibraryIntent),
    Playback(PlaybackIntent),
    Sounds(SoundIntent),
    View(ViewIntent),
}

impl From<LibraryIntent> for Intent {
    fn from(intent: LibraryIntent) -> Self {
        Intent::Library(intent)
    }
}

impl From<PlaybackIntent> for Intent {
    fn from(intent: PlaybackIntent) -> Self {
        Intent::Playback(intent)
    }
}

impl From<SoundIntent> for Intent {
    fn from(intent: SoundIntent) -> Self {
        Intent::Sounds(intent)
    }
}

impl From<ViewIntent> for Intent {
    fn from(intent: ViewIntent) -> Self {
        Intent::View(intent)
    }
}

pub struct Store {
    state: Arc<StoreState>,
    publisher: watch::Sender<Arc<StoreState>>,
}

impl Store {
    pub fn new(initial: StoreState) -> Self {
        let state = Arc::new(initial);
        let (publisher, _) = watch::channel(Arc::clone(&state));
        Self { state, publisher }
    }

    /// Current state, borrowed
    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// Current state, shareable
    pub fn snapshot(&self) -> Arc<StoreState> {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreState>> {
        self.publisher.subscribe()
    }

    /// Apply a transition atomically
    pub fn apply(&mut self, intent: impl Into<Intent>) -> Result<()> {
        let intent = intent.into();
        let mut next = StoreState::clone(&self.state);

        let outcome = match intent {
            Intent::Library(intent) => {
                let name = intent.name();
                debug!("Library transition: {}", name);
                library::apply(Arc::make_mut(&mut next.library), intent)
            }
            Intent::Playback(intent) => {
                let tracks = &next.library.tracks;
                playback::apply(Arc::make_mut(&mut next.playback), tracks, intent)
            }
            Intent::Sounds(intent) => sound_playback::apply(Arc::make_mut(&mut next.sounds), intent),
            Intent::View(intent) => view::apply(Arc::make_mut(&mut next.view), intent),
        };

        if let Err(e) = outcome {
            warn!("Rejected state transition: {}", e);
            return Err(e);
        }

        if next.same_as(&self.state) {
            return Ok(());
        }

        self.state = Arc::new(next);
        self.publisher.send_replace(Arc::clone(&self.state));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::library::SoundEdit;
    use cuedeck_common::models::Sound;

    fn sound(id: &str) -> Sound {
        Sound {
            id: id.into(),
            url: format!("file:///{}.ogg", id),
            title: id.into(),
            looping: false,
            volume: 1.0,
            fade_in: 0,
            fade_out: 0,
        }
    }

    #[test]
    fn test_failed_transition_leaves_state_untouched() {
        let mut store = Store::new(StoreState::default());
        store.apply(LibraryIntent::AddSounds(vec![sound("a")])).unwrap();
        let before = store.snapshot();

        let err = store
            .apply(LibraryIntent::EditSound(SoundEdit::default()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMutation(_)));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_snapshot_is_immutable_after_later_writes() {
        let mut store = Store::new(StoreState::default());
        let before = store.snapshot();
        store.apply(LibraryIntent::AddSounds(vec![sound("a")])).unwrap();

        assert!(before.library.sounds.is_empty());
        assert_eq!(store.state().library.sounds.len(), 1);
    }

    #[test]
    fn test_untouched_domains_share_allocation() {
        let mut store = Store::new(StoreState::default());
        let before = store.snapshot();
        store.apply(PlaybackIntent::Volume(0.5)).unwrap();

        let after = store.snapshot();
        assert!(Arc::ptr_eq(&before.library, &after.library));
        assert!(!Arc::ptr_eq(&before.playback, &after.playback));
    }

    #[tokio::test]
    async fn test_subscribers_see_published_snapshots() {
        let mut store = Store::new(StoreState::default());
        let mut rx = store.subscribe();
        store.apply(PlaybackIntent::Mute(true)).unwrap();

        rx.changed().await.unwrap();
        assert!(rx.borrow().playback.muted);
    }

    #[tokio::test]
    async fn test_noop_transition_does_not_notify() {
        let mut store = Store::new(StoreState::default());
        let mut rx = store.subscribe();
        rx.borrow_and_update();
        store.apply(PlaybackIntent::SetPlaying(true)).unwrap();

        assert!(!rx.has_changed().unwrap());
    }
}
