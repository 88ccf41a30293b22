//! Router setup
//!
//! Remote control routes live under `/v1`; `/health` sits outside it.

use crate::gateway::Gateway;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the remote control router around a gateway
pub fn router(gateway: Arc<Gateway>) -> Router {
    let v1 = Router::new()
        // Playlists
        .route("/playlist", get(super::handlers::get_playlists))
        .route("/playlist/play", post(super::handlers::play_playlist))
        .route("/playlist/playback", get(super::handlers::get_playlist_playback))
        .route("/playlist/playback/play", put(super::handlers::resume_playlist))
        .route("/playlist/playback/pause", put(super::handlers::pause_playlist))
        .route("/playlist/playback/next", post(super::handlers::next_track))
        .route("/playlist/playback/previous", post(super::handlers::previous_track))
        .route("/playlist/playback/mute", put(super::handlers::set_mute))
        .route("/playlist/playback/volume", put(super::handlers::set_volume))
        .route("/playlist/playback/shuffle", put(super::handlers::set_shuffle))
        .route("/playlist/playback/repeat", put(super::handlers::set_repeat))

        // Collections
        .route("/collection", get(super::handlers::get_collections))
        .route("/collection/play", post(super::handlers::play_sound))
        .route("/collection/stop", post(super::handlers::stop_sound))
        .route("/collection/playback", get(super::handlers::get_collection_playback))

        // Host event stream
        .route("/events", get(super::sse::event_stream));

    Router::new()
        .route("/health", get(super::handlers::health))
        .nest("/v1", v1)
        .with_state(gateway)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve `router` on `addr` until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Remote control API listening on {}", listener.local_addr()?);
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await
}
