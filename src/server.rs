use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::client::{GeminiLiveClient, LiveConfig};
use crate::session::{RelaySession, SessionConfig};

/// Client frames are raw PCM chunks; this leaves room for several seconds of audio.
pub const MAX_WS_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Shared, read-only state handed to every connection.
#[derive(Clone)]
pub struct AppState {
    pub live: Arc<LiveConfig>,
    pub session: Arc<SessionConfig>,
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    // Configure a permissive CORS policy to allow connections from any origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/chat", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Handles WebSocket upgrade requests.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    info!("WebSocket upgrade request from {}", peer);
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_FRAME_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one relay session for the lifetime of the socket.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let remote = GeminiLiveClient::new(state.live.clone());
    let session = RelaySession::new(remote, state.session.clone(), state.shutdown.child_token());
    let (sink, stream) = socket.split();
    let summary = session.run(sink, stream).await;
    info!(
        "session {} finished: {} ({} from client, {} to client)",
        summary.id, summary.end_reason, summary.from_client, summary.to_client
    );
}
