//! Playback host actor
//!
//! One task owns the [`Player`]. Local commands, remote requests and progress
//! ticks are applied one at a time, each to completion, so no two of them
//! ever interleave. Host events are forwarded onto the link best-effort;
//! replies are always delivered while the link is open.

use crate::bridge;
use crate::error::{Error, Result};
use crate::playback::{Player, PlayerCommand};
use crate::store::StoreState;
use cuedeck_common::events::HostEvent;
use cuedeck_common::link::HostEndpoint;
use cuedeck_common::protocol::HostMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Depth of the local command channel
pub const DEFAULT_COMMAND_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct HostOptions {
    pub progress_tick: Duration,
    pub command_capacity: usize,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(crate::config::DEFAULT_PROGRESS_TICK_MS),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

enum HostCommand {
    Player(PlayerCommand, oneshot::Sender<Result<()>>),
    Shutdown,
}

/// Cloneable access to a running host
#[derive(Clone)]
pub struct HostHandle {
    commands: mpsc::Sender<HostCommand>,
    snapshots: watch::Receiver<Arc<StoreState>>,
    events: broadcast::Sender<HostEvent>,
}

impl HostHandle {
    /// Run a command on the host and wait for its outcome
    pub async fn send(&self, command: PlayerCommand) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(HostCommand::Player(command, reply_tx))
            .await
            .map_err(|_| Error::HostStopped)?;
        reply_rx.await.map_err(|_| Error::HostStopped)?
    }

    /// Latest published state
    pub fn snapshot(&self) -> Arc<StoreState> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreState>> {
        self.snapshots.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Ask the host to stop; returns once the request is queued
    pub async fn shutdown(&self) {
        let _ = self.commands.send(HostCommand::Shutdown).await;
    }
}

/// Spawn the host task around `player`, serving `endpoint`
pub fn spawn_host(player: Player, endpoint: HostEndpoint, options: HostOptions) -> (HostHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(options.command_capacity);
    let handle = HostHandle {
        commands: command_tx,
        snapshots: player.subscribe(),
        events: player.events().sender(),
    };
    let task = tokio::spawn(run(player, endpoint, command_rx, options.progress_tick));
    (handle, task)
}

async fn run(
    mut player: Player,
    endpoint: HostEndpoint,
    mut commands: mpsc::Receiver<HostCommand>,
    progress_tick: Duration,
) {
    let HostEndpoint {
        requests: mut link_requests,
        messages: link_messages,
    } = endpoint;
    let mut link_open = true;
    let mut events = player.events().subscribe();

    let mut ticker = tokio::time::interval(progress_tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Playback host started (tick {:?})", progress_tick);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(HostCommand::Player(command, reply)) => {
                    let outcome = player.handle(command);
                    if let Err(e) = &outcome {
                        warn!("Command failed: {}", e);
                    }
                    let _ = reply.send(outcome);
                }
                Some(HostCommand::Shutdown) | None => break,
            },

            request = link_requests.recv(), if link_open => match request {
                Some(request) => {
                    let reply = bridge::dispatch(&mut player, request);
                    if link_messages.send(HostMessage::Reply(reply)).await.is_err() {
                        info!("Remote gateway went away");
                        link_open = false;
                    }
                }
                None => {
                    info!("Remote link closed");
                    link_open = false;
                }
            },

            _ = ticker.tick() => {
                if let Err(e) = player.tick() {
                    warn!("Progress tick failed: {}", e);
                }
            }

            event = events.recv() => match event {
                Ok(event) => {
                    if link_open {
                        if let Err(e) = link_messages.try_send(HostMessage::Event(event)) {
                            debug!("Dropping event for remote link: {}", e);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Host event forwarding lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {}
            },
        }
    }

    if let Err(e) = player.handle(PlayerCommand::StopAllSounds) {
        warn!("Failed to stop sounds on shutdown: {}", e);
    }
    info!("Playback host stopped");
}
