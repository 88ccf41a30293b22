//! # cuedeck remote-control gateway
//!
//! HTTP surface for external controllers. Each call becomes a
//! [`RemoteRequest`](cuedeck_common::protocol::RemoteRequest) on the host
//! link and waits, bounded by a timeout, for the reply carrying its
//! correlation token.

pub mod api;
pub mod error;
pub mod gateway;

pub use error::{GatewayError, Result};
pub use gateway::{Gateway, DEFAULT_REQUEST_TIMEOUT};
