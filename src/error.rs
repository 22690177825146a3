use tokio_tungstenite::tungstenite;

/// Errors surfaced by the Live API client.
///
/// Undecodable inbound messages and error envelopes from the service are not
/// represented here: the inbound stream logs and skips them.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("failed to build connection request: {0}")]
    Request(#[source] tungstenite::Error),

    #[error("failed to connect to Live API: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection writer has shut down")]
    ChannelClosed,
}
