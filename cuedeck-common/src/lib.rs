//! # CueDeck Common Library
//!
//! Shared code for the CueDeck playback host and remote gateway:
//! - Library models (tracks, playlists, sounds, collections, scenes)
//! - Remote control message protocol (requests, replies, correlation tokens)
//! - Host event types
//! - Host link channels joining the gateway and the host
//! - Configuration file helpers
//! - Fade curve definitions

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod link;
pub mod models;
pub mod protocol;
pub mod time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
