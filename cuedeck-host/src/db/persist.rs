//! Whitelisted state persistence
//!
//! Only two domains ever reach the database:
//! - `playback`: `volume`, `muted`, `shuffle`, `repeat`
//! - `library`: `playlists` (with their tracks), `collections`, `sounds`, `scenes`
//!
//! Queue, playback records and view state stay in memory. The [`Persister`]
//! watches store snapshots and writes a domain only after it changed, at most
//! once per debounce window. Each domain is written in one transaction, and a
//! domain whose write failed stays dirty until a later attempt succeeds.

use crate::error::Result;
use crate::store::{Library, PlaybackPreferences, StoreState, Table};
use cuedeck_common::models::{Playlist, Track};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const PLAYBACK_DOMAIN: &str = "playback";
const LIBRARY_DOMAIN: &str = "library";

/// Default quiet period before a changed snapshot is written
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default wait before a failed write is attempted again
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Playlists are stored together with the tracks they own
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct PlaylistsEntry {
    playlists: Table<Playlist>,
    tracks: Table<Track>,
}

async fn get_value<T: DeserializeOwned>(db: &Pool<Sqlite>, domain: &str, key: &str) -> Result<Option<T>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM persisted_state WHERE domain = ? AND key = ?")
            .bind(domain)
            .bind(key)
            .fetch_optional(db)
            .await?;

    match value {
        Some(json) => match serde_json::from_str(&json) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!("Ignoring unreadable {}.{}: {}", domain, key, e);
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

async fn set_value<T: Serialize>(conn: &mut SqliteConnection, domain: &str, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    sqlx::query(
        r#"
        INSERT INTO persisted_state (domain, key, value)
        VALUES (?, ?, ?)
        ON CONFLICT(domain, key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(domain)
    .bind(key)
    .bind(json)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn save_preferences(db: &Pool<Sqlite>, prefs: &PlaybackPreferences) -> Result<()> {
    let mut tx = db.begin().await?;
    set_value(&mut *tx, PLAYBACK_DOMAIN, "volume", &prefs.volume).await?;
    set_value(&mut *tx, PLAYBACK_DOMAIN, "muted", &prefs.muted).await?;
    set_value(&mut *tx, PLAYBACK_DOMAIN, "shuffle", &prefs.shuffle).await?;
    set_value(&mut *tx, PLAYBACK_DOMAIN, "repeat", &prefs.repeat).await?;
    tx.commit().await?;
    debug!("Saved playback preferences");
    Ok(())
}

pub async fn load_preferences(db: &Pool<Sqlite>) -> Result<PlaybackPreferences> {
    let defaults = PlaybackPreferences::default();
    Ok(PlaybackPreferences {
        volume: get_value::<f32>(db, PLAYBACK_DOMAIN, "volume")
            .await?
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(defaults.volume),
        muted: get_value(db, PLAYBACK_DOMAIN, "muted").await?.unwrap_or(defaults.muted),
        shuffle: get_value(db, PLAYBACK_DOMAIN, "shuffle").await?.unwrap_or(defaults.shuffle),
        repeat: get_value(db, PLAYBACK_DOMAIN, "repeat").await?.unwrap_or(defaults.repeat),
    })
}

/// Write the whole library; either every key lands or none does
pub async fn save_library(db: &Pool<Sqlite>, library: &Library) -> Result<()> {
    let playlists = PlaylistsEntry {
        playlists: library.playlists.clone(),
        tracks: library.tracks.clone(),
    };
    let mut tx = db.begin().await?;
    set_value(&mut *tx, LIBRARY_DOMAIN, "playlists", &playlists).await?;
    set_value(&mut *tx, LIBRARY_DOMAIN, "collections", &library.collections).await?;
    set_value(&mut *tx, LIBRARY_DOMAIN, "sounds", &library.sounds).await?;
    set_value(&mut *tx, LIBRARY_DOMAIN, "scenes", &library.scenes).await?;
    tx.commit().await?;
    debug!(
        "Saved library ({} playlists, {} collections, {} sounds, {} scenes)",
        library.playlists.len(),
        library.collections.len(),
        library.sounds.len(),
        library.scenes.len()
    );
    Ok(())
}

/// Read the library, dropping references that do not resolve
pub async fn load_library(db: &Pool<Sqlite>) -> Result<Library> {
    let playlists: PlaylistsEntry = get_value(db, LIBRARY_DOMAIN, "playlists").await?.unwrap_or_default();
    let mut library = Library {
        playlists: playlists.playlists,
        tracks: playlists.tracks,
        collections: get_value(db, LIBRARY_DOMAIN, "collections").await?.unwrap_or_default(),
        sounds: get_value(db, LIBRARY_DOMAIN, "sounds").await?.unwrap_or_default(),
        scenes: get_value(db, LIBRARY_DOMAIN, "scenes").await?.unwrap_or_default(),
    };
    if let Err(e) = library.validate() {
        let dropped = library.repair();
        warn!(
            "Persisted library is inconsistent ({}); dropped {} dangling references",
            e, dropped
        );
    }
    Ok(library)
}

/// Replace the stored library with a JSON export; nothing is written unless
/// the file parses and every reference in it resolves
pub async fn import_library(db: &Pool<Sqlite>, path: &Path) -> Result<Library> {
    let json = std::fs::read_to_string(path)?;
    let library: Library = serde_json::from_str(&json)?;
    library.validate()?;
    save_library(db, &library).await?;
    info!(
        "Imported library from {} ({} playlists, {} sounds)",
        path.display(),
        library.playlists.len(),
        library.sounds.len()
    );
    Ok(library)
}

/// Initial store state from the database
pub async fn load_state(db: &Pool<Sqlite>) -> Result<StoreState> {
    let library = load_library(db).await?;
    let prefs = load_preferences(db).await?;
    info!(
        "Loaded {} playlists, {} collections, {} sounds (volume {:.2})",
        library.playlists.len(),
        library.collections.len(),
        library.sounds.len(),
        prefs.volume
    );
    Ok(StoreState::new(library, prefs))
}

/// Last state known to be on disk, per domain
struct Saved {
    library: Arc<Library>,
    preferences: PlaybackPreferences,
}

impl Saved {
    fn new(state: &StoreState) -> Self {
        Self {
            library: state.library.clone(),
            preferences: state.playback.preferences(),
        }
    }
}

/// Debounced writer driven by store snapshots
pub struct Persister {
    db: Pool<Sqlite>,
    debounce: Duration,
    retry_delay: Duration,
}

impl Persister {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self {
            db,
            debounce: DEFAULT_DEBOUNCE,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Start writing; the snapshot current at this call counts as saved
    pub fn spawn(self, mut snapshots: watch::Receiver<Arc<StoreState>>) -> JoinHandle<()> {
        let baseline = Saved::new(&snapshots.borrow_and_update());
        tokio::spawn(self.run(baseline, snapshots))
    }

    /// Write changed domains until the store goes away, then flush once more
    async fn run(self, mut saved: Saved, mut snapshots: watch::Receiver<Arc<StoreState>>) {
        let mut dirty = false;
        loop {
            if dirty {
                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(self.retry_delay) => {
                        debug!("Retrying failed write");
                    }
                }
            } else if snapshots.changed().await.is_err() {
                break;
            }
            tokio::time::sleep(self.debounce).await;
            let latest = snapshots.borrow_and_update().clone();
            dirty = self.flush(&mut saved, &latest).await.is_err();
        }
        let latest = snapshots.borrow().clone();
        if self.flush(&mut saved, &latest).await.is_err() {
            warn!("Persister stopped with unsaved changes");
        } else {
            debug!("Persister stopped");
        }
    }

    /// Write every domain that differs from `saved`; `saved` only moves for
    /// domains that were written
    async fn flush(&self, saved: &mut Saved, latest: &StoreState) -> Result<()> {
        let mut outcome = Ok(());

        if Arc::ptr_eq(&saved.library, &latest.library) || saved.library == latest.library {
            saved.library = latest.library.clone();
        } else {
            match save_library(&self.db, &latest.library).await {
                Ok(()) => saved.library = latest.library.clone(),
                Err(e) => {
                    warn!("Failed to save library: {}", e);
                    outcome = Err(e);
                }
            }
        }

        let prefs = latest.playback.preferences();
        if saved.preferences != prefs {
            match save_preferences(&self.db, &prefs).await {
                Ok(()) => saved.preferences = prefs,
                Err(e) => {
                    warn!("Failed to save playback preferences: {}", e);
                    outcome = Err(e);
                }
            }
        }

        outcome
    }
}
