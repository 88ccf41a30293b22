//! Shared test helpers: a scripted stand-in for the playback host

#![allow(dead_code)]

use cuedeck_common::link::{host_link, HostEndpoint};
use cuedeck_common::protocol::{HostMessage, RemoteReply, RemoteRequest};
use cuedeck_remote::Gateway;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Gateway attached to a fresh link; the host half is returned for scripting
pub fn attached_gateway(timeout: Duration) -> (Arc<Gateway>, HostEndpoint) {
    let gateway = Arc::new(Gateway::new(timeout));
    let (link, endpoint) = host_link(16);
    gateway.attach(link);
    (gateway, endpoint)
}

/// Reply to `request` with `payload`
pub fn reply_to(request: &RemoteRequest, payload: Value) -> HostMessage {
    HostMessage::Reply(RemoteReply {
        token: request.token,
        kind: request.kind(),
        payload,
    })
}

/// Host that answers every request with `{"kind": <kind>, "token": <token>}`
pub fn spawn_echo_host(mut endpoint: HostEndpoint) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = endpoint.requests.recv().await {
            let payload = json!({"kind": request.kind().as_str(), "token": request.token.0});
            if endpoint.messages.send(reply_to(&request, payload)).await.is_err() {
                break;
            }
        }
    })
}

/// Host that receives requests and never answers
pub fn spawn_silent_host(mut endpoint: HostEndpoint) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _messages = endpoint.messages;
        while endpoint.requests.recv().await.is_some() {}
    })
}
