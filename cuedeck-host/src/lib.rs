//! # cuedeck playback host
//!
//! Owns the library and playback state, drives the audio engine and answers
//! remote-control requests arriving over the host link.
//!
//! - [`store`]: single-writer state store with immutable snapshots
//! - [`playback`]: queue engine, sound manager, sync adapter, player
//! - [`audio`]: symphonia/rubato/cpal mixer engine
//! - [`bridge`] and [`host`]: remote request dispatch and the host actor
//! - [`db`]: SQLite persistence of preferences and library

pub mod audio;
pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod host;
pub mod playback;
pub mod store;

pub use error::{Error, Result};
