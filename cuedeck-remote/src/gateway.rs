//! Remote control gateway
//!
//! Sends one [`RemoteRequest`] per call and waits for the reply with the same
//! [`CorrelationToken`]:
//! - no host attached: [`GatewayError::HostUnavailable`] at once
//! - no reply within the timeout: [`GatewayError::RequestTimeout`]
//! - reply: its payload, untouched
//!
//! A pending entry lives exactly as long as its caller waits. Timeouts and
//! dropped callers remove it, so a late reply finds nothing and is discarded.

use crate::error::{GatewayError, Result};
use cuedeck_common::events::HostEvent;
use cuedeck_common::link::HostLink;
use cuedeck_common::protocol::{
    CorrelationToken, HostMessage, RemoteIntent, RemoteReply, RemoteRequest, RequestKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Buffered host events before slow SSE clients start lagging
const EVENT_CAPACITY: usize = 256;

type ReplyResult = Result<serde_json::Value>;

struct Pending {
    kind: RequestKind,
    created_at: Instant,
    waiter: oneshot::Sender<ReplyResult>,
}

pub struct Gateway {
    link: RwLock<Option<mpsc::Sender<RemoteRequest>>>,
    pending: Mutex<HashMap<CorrelationToken, Pending>>,
    next_token: AtomicU64,
    timeout: Duration,
    events: broadcast::Sender<HostEvent>,
}

/// Removes the pending entry when the waiting call ends for any reason
struct PendingGuard<'a> {
    gateway: &'a Gateway,
    token: CorrelationToken,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.gateway.pending().remove(&self.token).is_some() {
            debug!("Discarded pending request {}", self.token);
        }
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Gateway {
    pub fn new(timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            link: RwLock::new(None),
            pending: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            timeout,
            events,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_attached(&self) -> bool {
        self.current_link().is_some()
    }

    /// Requests still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Host events republished for SSE clients
    pub fn subscribe_events(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Start using `link`; replies and events are pumped until it closes
    pub fn attach(self: &Arc<Self>, link: HostLink) -> JoinHandle<()> {
        let HostLink { requests, messages } = link;
        *self.link.write().unwrap_or_else(PoisonError::into_inner) = Some(requests.clone());
        info!("Playback host attached");

        let gateway = Arc::clone(self);
        tokio::spawn(async move { gateway.pump(requests, messages).await })
    }

    /// Send `intent` to the host and wait for its reply payload
    pub async fn request(&self, intent: RemoteIntent) -> Result<serde_json::Value> {
        let Some(link) = self.current_link() else {
            debug!("Rejecting {}: no host attached", intent.kind());
            return Err(GatewayError::HostUnavailable);
        };

        let token = CorrelationToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let kind = intent.kind();
        let (waiter, reply) = oneshot::channel();
        self.pending().insert(
            token,
            Pending {
                kind,
                created_at: Instant::now(),
                waiter,
            },
        );
        let _guard = PendingGuard { gateway: self, token };
        debug!("Request {} {}", token, kind);

        let exchange = async {
            link.send(RemoteRequest { token, intent })
                .await
                .map_err(|_| GatewayError::HostUnavailable)?;
            reply.await.map_err(|_| GatewayError::HostUnavailable)?
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Request {} {} timed out after {:?}", token, kind, self.timeout);
                Err(GatewayError::RequestTimeout)
            }
        }
    }

    async fn pump(&self, requests: mpsc::Sender<RemoteRequest>, mut messages: mpsc::Receiver<HostMessage>) {
        while let Some(message) = messages.recv().await {
            match message {
                HostMessage::Reply(reply) => self.deliver(reply),
                HostMessage::Event(event) => {
                    let _ = self.events.send(event);
                }
            }
        }
        self.detach(&requests);
    }

    fn deliver(&self, reply: RemoteReply) {
        let Some(pending) = self.pending().remove(&reply.token) else {
            debug!("Dropping late reply {} {}", reply.token, reply.kind);
            return;
        };
        if pending.kind != reply.kind {
            warn!(
                "Reply {} has kind {} but request was {}",
                reply.token, reply.kind, pending.kind
            );
        }
        debug!(
            "Reply {} {} after {:?}",
            reply.token,
            reply.kind,
            pending.created_at.elapsed()
        );
        let _ = pending.waiter.send(Ok(reply.payload));
    }

    /// Forget a closed link and fail everything still waiting on it
    fn detach(&self, requests: &mpsc::Sender<RemoteRequest>) {
        {
            let mut link = self.link.write().unwrap_or_else(PoisonError::into_inner);
            match link.as_ref() {
                Some(current) if current.same_channel(requests) => *link = None,
                _ => return,
            }
        }
        info!("Playback host detached");

        let failed: Vec<Pending> = self.pending().drain().map(|(_, p)| p).collect();
        for pending in failed {
            let _ = pending.waiter.send(Err(GatewayError::HostUnavailable));
        }
    }

    fn current_link(&self) -> Option<mpsc::Sender<RemoteRequest>> {
        self.link.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<CorrelationToken, Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
