use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use gemini_live_types::{ClientMessage, ServerEvent, ServerMessage};
use gemini_live_utils::audio::{decode_base64, encode_base64};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::LiveError;
use crate::realtime_api::{AudioStream, ConnectionState, RealtimeApi};

mod config;
mod consts;
mod stats;
mod utils;

pub use config::{LiveConfig, LiveConfigBuilder};
pub use stats::{Stats, StatsSnapshot};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

pub type ClientTx = mpsc::Sender<Outbound>;

/// One encoded message for the writer task. `audio_bytes` is the PCM size
/// it carries, counted as sent once the frame is written.
#[derive(Debug)]
pub struct Outbound {
    text: String,
    audio_bytes: usize,
}

impl Outbound {
    fn control(text: String) -> Self {
        Self { text, audio_bytes: 0 }
    }

    fn audio(text: String, audio_bytes: usize) -> Self {
        Self { text, audio_bytes }
    }
}

/// Client for the Gemini Live API.
///
/// Outbound messages go through a channel to a single writer task, which
/// also sends keep-alive pings. The read half is handed out once through
/// [`GeminiLiveClient::receive`].
pub struct GeminiLiveClient {
    config: Arc<LiveConfig>,
    mime_type: String,
    state: ConnectionState,
    c_tx: Option<ClientTx>,
    reader: Option<WsReader>,
    writer: Option<JoinHandle<()>>,
    speaking: Arc<AtomicBool>,
    stats: Arc<Stats>,
}

impl GeminiLiveClient {
    pub fn new(config: Arc<LiveConfig>) -> Self {
        Self {
            mime_type: config.mime_type(),
            config,
            state: ConnectionState::Disconnected,
            c_tx: None,
            reader: None,
            writer: None,
            speaking: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Stats::new()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the assistant is mid-turn, i.e. audio arrived since the last `turnComplete`.
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }

    /// Sent audio is counted once the writer has put it on the socket.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn connect(&mut self) -> Result<(), LiveError> {
        // Ensure that we haven't already connected.
        if self.state != ConnectionState::Disconnected {
            return Err(LiveError::AlreadyConnected);
        }
        self.state = ConnectionState::Connecting;

        let ws_stream = match self.open().await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                self.state = ConnectionState::Closed;
                return Err(e);
            }
        };

        let (write, read) = ws_stream.split();
        let (c_tx, c_rx) = mpsc::channel(self.config.channel_capacity());
        self.writer = Some(tokio::spawn(write_loop(
            write,
            c_rx,
            self.stats.clone(),
            self.config.ping_interval(),
        )));
        self.reader = Some(read);
        self.c_tx = Some(c_tx);
        self.state = ConnectionState::Ready;

        tracing::info!(
            "connected to Live API (model: {}, voice: {})",
            self.config.model(),
            self.config.voice()
        );
        Ok(())
    }

    async fn open(&mut self) -> Result<WsStream, LiveError> {
        let request = utils::build_request(&self.config).map_err(LiveError::Request)?;
        let (mut ws_stream, _) = tokio_tungstenite::connect_async_with_config(
            request,
            Some(self.config.websocket_config()),
            false,
        )
        .await
        .map_err(LiveError::Connect)?;

        self.state = ConnectionState::AwaitingHandshake;
        if let Err(e) = self.handshake(&mut ws_stream).await {
            let _ = tokio::time::timeout(self.config.ping_timeout(), ws_stream.close(None)).await;
            return Err(e);
        }
        Ok(ws_stream)
    }

    async fn handshake(&self, ws_stream: &mut WsStream) -> Result<(), LiveError> {
        let setup = serde_json::to_string(&ClientMessage::Setup(self.config.setup()))?;
        ws_stream.send(Message::Text(setup)).await?;

        let text = tokio::time::timeout(self.config.stale_after(), first_payload(ws_stream))
            .await
            .map_err(|_| LiveError::Handshake("timed out waiting for setupComplete".to_string()))??;

        match serde_json::from_str::<ServerMessage>(&text) {
            Ok(message) if message.is_setup_complete() => {
                tracing::debug!("setup complete");
                Ok(())
            }
            _ => Err(LiveError::Handshake(format!(
                "expected setupComplete, got: {}",
                text.chars().take(200).collect::<String>()
            ))),
        }
    }

    /// Sends one PCM chunk. Does nothing for an empty chunk or when the
    /// connection is not ready.
    pub async fn send_audio(&self, pcm: &[u8]) -> Result<(), LiveError> {
        if pcm.is_empty() {
            return Ok(());
        }
        let Some(tx) = self.ready_tx() else {
            return Ok(());
        };
        let message = ClientMessage::audio(&self.mime_type, encode_base64(pcm));
        let text = serde_json::to_string(&message)?;
        tx.send(Outbound::audio(text, pcm.len()))
            .await
            .map_err(|_| LiveError::ChannelClosed)?;
        tracing::trace!("sent audio chunk ({} bytes)", pcm.len());
        Ok(())
    }

    /// Sends `text` as a complete user turn.
    pub async fn send_text(&self, text: &str) -> Result<(), LiveError> {
        let Some(tx) = self.ready_tx() else {
            tracing::debug!("not connected, dropping text turn");
            return Ok(());
        };
        tracing::info!("sending text trigger ({} chars)", text.chars().count());
        let message = serde_json::to_string(&ClientMessage::user_text(text))?;
        tx.send(Outbound::control(message))
            .await
            .map_err(|_| LiveError::ChannelClosed)
    }

    fn ready_tx(&self) -> Option<&ClientTx> {
        match self.state {
            ConnectionState::Ready => self.c_tx.as_ref(),
            _ => None,
        }
    }

    /// Takes the inbound audio sequence. It ends when the connection closes
    /// or goes silent for longer than the keep-alive window.
    pub fn receive(&mut self) -> AudioStream {
        let Some(read) = self.reader.take() else {
            tracing::warn!("no open Live API connection to receive from");
            return stream::empty().boxed();
        };
        let inbound = Inbound {
            read,
            pending: VecDeque::new(),
            speaking: self.speaking.clone(),
            stats: self.stats.clone(),
            stale_after: self.config.stale_after(),
        };
        stream::unfold(inbound, |mut inbound| async move {
            inbound.next_frame().await.map(|frame| (frame, inbound))
        })
        .boxed()
    }

    pub async fn close(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Closed
        ) {
            self.state = ConnectionState::Closed;
            return;
        }

        // Dropping the sender lets the writer drain and close the socket.
        if let Some(tx) = self.c_tx.take() {
            match serde_json::to_string(&ClientMessage::audio_stream_end()) {
                Ok(text) => {
                    if let Err(e) = tx.try_send(Outbound::control(text)) {
                        tracing::debug!("could not queue audio_stream_end: {}", e);
                    }
                }
                Err(e) => tracing::debug!("failed to encode audio_stream_end: {}", e),
            }
        }
        self.reader = None;

        if let Some(writer) = self.writer.take() {
            let abort = writer.abort_handle();
            if tokio::time::timeout(self.config.ping_timeout(), writer)
                .await
                .is_err()
            {
                tracing::warn!("Live API writer did not finish, aborting");
                abort.abort();
            }
        }

        self.state = ConnectionState::Closed;
        self.speaking.store(false, Ordering::Relaxed);
        tracing::info!("Live API ws closed ({})", self.stats.snapshot());
    }
}

#[async_trait]
impl RealtimeApi for GeminiLiveClient {
    async fn connect(&mut self) -> Result<(), LiveError> {
        GeminiLiveClient::connect(self).await
    }

    async fn send_audio(&self, pcm: &[u8]) -> Result<(), LiveError> {
        GeminiLiveClient::send_audio(self, pcm).await
    }

    async fn send_text(&self, text: &str) -> Result<(), LiveError> {
        GeminiLiveClient::send_text(self, text).await
    }

    fn receive(&mut self) -> AudioStream {
        GeminiLiveClient::receive(self)
    }

    async fn close(&mut self) {
        GeminiLiveClient::close(self).await
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

// Create a client with a specific config and connect it.
pub async fn connect_with_config(config: Arc<LiveConfig>) -> Result<GeminiLiveClient, LiveError> {
    let mut client = GeminiLiveClient::new(config);
    client.connect().await?;
    Ok(client)
}

// Connect with default settings, taking the API key from the environment.
pub async fn connect() -> Result<GeminiLiveClient, LiveError> {
    connect_with_config(Arc::new(LiveConfig::new())).await
}

/// Waits for the first data frame, skipping control frames.
async fn first_payload(ws_stream: &mut WsStream) -> Result<String, LiveError> {
    while let Some(message) = ws_stream.next().await {
        match message? {
            Message::Text(text) => return Ok(text),
            Message::Binary(bytes) => {
                return String::from_utf8(bytes)
                    .map_err(|_| LiveError::Handshake("non UTF-8 binary frame".to_string()));
            }
            Message::Close(frame) => {
                return Err(LiveError::Handshake(format!(
                    "connection closed before setupComplete: {:?}",
                    frame
                )));
            }
            _ => {}
        }
    }
    Err(LiveError::Handshake(
        "connection ended before setupComplete".to_string(),
    ))
}

async fn write_loop(
    mut write: WsWriter,
    mut c_rx: mpsc::Receiver<Outbound>,
    stats: Arc<Stats>,
    ping_interval: Duration,
) {
    let mut keepalive =
        tokio::time::interval_at(tokio::time::Instant::now() + ping_interval, ping_interval);
    loop {
        tokio::select! {
            outbound = c_rx.recv() => {
                let Some(outbound) = outbound else { break };
                if let Err(e) = write.send(Message::Text(outbound.text)).await {
                    tracing::error!("failed to send message: {}", e);
                    break;
                }
                if outbound.audio_bytes > 0 {
                    stats.record_sent(outbound.audio_bytes);
                }
            }
            _ = keepalive.tick() => {
                if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                    tracing::warn!("failed to send keep-alive ping: {}", e);
                    break;
                }
            }
        }
    }
    if let Err(e) = write.close().await {
        tracing::debug!("error closing Live API ws: {}", e);
    }
}

struct Inbound {
    read: WsReader,
    pending: VecDeque<Vec<u8>>,
    speaking: Arc<AtomicBool>,
    stats: Arc<Stats>,
    stale_after: Duration,
}

impl Inbound {
    async fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(frame);
            }

            let message = match tokio::time::timeout(self.stale_after, self.read.next()).await {
                Err(_) => {
                    tracing::warn!(
                        "no traffic from Live API for {:?}, treating it as unreachable",
                        self.stale_after
                    );
                    return None;
                }
                Ok(None) => return None,
                Ok(Some(Err(e))) => {
                    tracing::warn!("failed to read message: {}", e);
                    return None;
                }
                Ok(Some(Ok(message))) => message,
            };

            match message {
                Message::Text(text) => self.decode(&text),
                Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                    Ok(text) => self.decode(text),
                    Err(_) => tracing::warn!("skipping non UTF-8 frame ({} bytes)", bytes.len()),
                },
                Message::Close(reason) => {
                    tracing::info!("Live API closed the connection: {:?}", reason);
                    return None;
                }
                _ => {}
            }
        }
    }

    fn decode(&mut self, text: &str) {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("failed to deserialize message: {}", e);
                return;
            }
        };

        match message.into_event() {
            ServerEvent::Error(error) => {
                tracing::error!("Live API error: {}", error);
            }
            ServerEvent::Content(content) => {
                if content.is_interrupted() {
                    tracing::debug!("assistant turn interrupted");
                }
                for data in content.inline_audio() {
                    match decode_base64(data) {
                        Ok(pcm) if !pcm.is_empty() => {
                            self.speaking.store(true, Ordering::Relaxed);
                            self.stats.record_received(pcm.len());
                            self.pending.push_back(pcm);
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!("skipping inline audio with bad base64: {}", e),
                    }
                }
                if content.is_turn_complete() {
                    self.speaking.store(false, Ordering::Relaxed);
                    tracing::debug!("assistant turn complete");
                }
            }
            ServerEvent::SetupComplete => tracing::debug!("ignoring repeated setupComplete"),
            ServerEvent::Other => tracing::trace!("ignoring message: {}", text),
        }
    }
}
