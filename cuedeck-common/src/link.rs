//! Channels joining the remote gateway and the playback host
//!
//! The link is the only thing the two sides share. Requests flow one way and
//! replies/events the other; dropping either half detaches the host.

use crate::protocol::{HostMessage, RemoteRequest};
use tokio::sync::mpsc;

/// Default channel depth for each direction
pub const DEFAULT_LINK_CAPACITY: usize = 64;

/// Gateway half of the link
#[derive(Debug)]
pub struct HostLink {
    pub requests: mpsc::Sender<RemoteRequest>,
    pub messages: mpsc::Receiver<HostMessage>,
}

/// Host half of the link
#[derive(Debug)]
pub struct HostEndpoint {
    pub requests: mpsc::Receiver<RemoteRequest>,
    pub messages: mpsc::Sender<HostMessage>,
}

/// Create a connected link pair
pub fn host_link(capacity: usize) -> (HostLink, HostEndpoint) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (message_tx, message_rx) = mpsc::channel(capacity);
    (
        HostLink {
            requests: request_tx,
            messages: message_rx,
        },
        HostEndpoint {
            requests: request_rx,
            messages: message_tx,
        },
    )
}
