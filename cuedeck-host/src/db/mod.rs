//! Database access layer
//!
//! One key/value table, `persisted_state(domain, key, value)`, holding JSON
//! values for the `playback` preferences and the `library`.

pub mod init;
pub mod persist;

pub use init::{connect, init_schema};
pub use persist::{import_library, load_state, save_library, save_preferences, Persister};
