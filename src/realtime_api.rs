use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::client::StatsSnapshot;
use crate::error::LiveError;

/// Inbound assistant audio, one decoded PCM buffer per item.
pub type AudioStream = BoxStream<'static, Vec<u8>>;

/// Lifecycle of the connection to the remote voice service.
///
/// Moves forward only, except that any state may jump to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingHandshake,
    Ready,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::AwaitingHandshake => "awaiting_handshake",
            ConnectionState::Ready => "ready",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A real-time, bidirectional voice service as seen by a relay session.
/// The session only talks to the remote side through this trait.
#[async_trait]
pub trait RealtimeApi: Send + Sync {
    /// Opens the connection and completes the setup handshake.
    async fn connect(&mut self) -> Result<(), LiveError>;

    /// Sends one chunk of 16-bit PCM at the service's input rate.
    async fn send_audio(&self, pcm: &[u8]) -> Result<(), LiveError>;

    /// Sends a complete user text turn.
    async fn send_text(&self, text: &str) -> Result<(), LiveError>;

    /// Hands out the inbound audio sequence. Only the first call after
    /// `connect` yields anything.
    fn receive(&mut self) -> AudioStream;

    /// Best-effort teardown. Safe to call in any state, any number of times.
    async fn close(&mut self);

    fn state(&self) -> ConnectionState;

    fn stats(&self) -> StatsSnapshot;
}
