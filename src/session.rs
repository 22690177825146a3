//! One relay session: a client websocket bridged to one Live API connection.
//!
//! Starting: connect and greet. Active: two pumps race, the first to finish
//! ends the session. Draining: the remote is closed and the client writer
//! flushed. Closed: totals are logged and returned as a [`SessionSummary`].

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use gemini_live_utils::audio::{DEFAULT_CLIENT_SAMPLE_RATE, GEMINI_SAMPLE_RATE, PCM16_BYTES_PER_SAMPLE};
use gemini_live_utils::{Resampler, SampleFormat};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::client::StatsSnapshot;
use crate::error::LiveError;
use crate::realtime_api::{AudioStream, RealtimeApi};

mod control;
mod stats;

pub use control::{ClientAudioConfig, ControlMessage, ControlReply};
pub use stats::{DirectionStats, Throughput, LOG_WINDOW};

pub const DEFAULT_GREETING: &str = "Hello! Please warmly welcome the user and immediately ask them specifically: 'Which language would you prefer to speak in?' and 'What challenge or problem are you facing today?' so you can motivate them.";

/// Upper bound on flushing queued frames to the client during teardown.
const CLIENT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Client capture rate assumed until the client sends a `config` message.
    pub client_sample_rate: u32,
    /// Input rate of the remote service.
    pub remote_sample_rate: u32,
    /// Sent as the first user turn. Empty skips the greeting.
    pub greeting: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_sample_rate: DEFAULT_CLIENT_SAMPLE_RATE,
            remote_sample_rate: GEMINI_SAMPLE_RATE,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Active,
    Draining,
    Closed,
}

/// Which condition ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    ClientLeft,
    RemoteEnded,
    Shutdown,
    ConnectFailed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            EndReason::ClientLeft => "client left",
            EndReason::RemoteEnded => "remote ended",
            EndReason::Shutdown => "shutdown",
            EndReason::ConnectFailed => "connect failed",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub state: SessionState,
    pub end_reason: EndReason,
    pub from_client: Throughput,
    pub to_client: Throughput,
    pub remote: StatsSnapshot,
}

/// Short id used to correlate a session's log lines.
pub fn new_session_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

pub struct RelaySession<R> {
    id: String,
    config: Arc<SessionConfig>,
    remote: R,
    state: SessionState,
    shutdown: CancellationToken,
}

impl<R: RealtimeApi> RelaySession<R> {
    pub fn new(remote: R, config: Arc<SessionConfig>, shutdown: CancellationToken) -> Self {
        Self {
            id: new_session_id(),
            config,
            remote,
            state: SessionState::Starting,
            shutdown,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drives the session to completion over the client's socket halves.
    pub async fn run<W, S, E>(self, sink: W, stream: S) -> SessionSummary
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: fmt::Display + Send,
        S: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: fmt::Display,
    {
        let span = tracing::info_span!("session", id = %self.id);
        self.relay(sink, stream).instrument(span).await
    }

    async fn relay<W, S, E>(mut self, mut sink: W, stream: S) -> SessionSummary
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: fmt::Display + Send,
        S: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: fmt::Display,
    {
        tracing::info!("client connected");

        if let Err(e) = self.start().await {
            tracing::error!("failed to start Live API session: {}", e);
            reject(&mut sink, "Live API connection failed").await;
            self.remote.close().await;
            return self.finish(EndReason::ConnectFailed, Throughput::default(), Throughput::default());
        }

        self.transition(SessionState::Active);
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let writer = tokio::spawn(write_to_client(sink, out_rx));
        let audio = self.remote.receive();

        let mut resampler = Resampler::new(self.config.client_sample_rate, self.config.remote_sample_rate);
        let mut from_client = DirectionStats::new();
        let mut to_client = DirectionStats::new();

        let end_reason = tokio::select! {
            reason = client_to_remote(&self.remote, stream, &out_tx, &mut resampler, &mut from_client) => reason,
            reason = remote_to_client(audio, &out_tx, &mut to_client) => reason,
            _ = self.shutdown.cancelled() => EndReason::Shutdown,
        };
        tracing::info!("ending session: {}", end_reason);

        self.transition(SessionState::Draining);
        drop(out_tx);
        self.remote.close().await;

        let abort = writer.abort_handle();
        if tokio::time::timeout(CLIENT_CLOSE_TIMEOUT, writer).await.is_err() {
            tracing::warn!("client writer did not finish, aborting");
            abort.abort();
        }

        self.finish(end_reason, from_client.totals(), to_client.totals())
    }

    async fn start(&mut self) -> Result<(), LiveError> {
        self.remote.connect().await?;
        if !self.config.greeting.is_empty() {
            self.remote.send_text(&self.config.greeting).await?;
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn finish(mut self, end_reason: EndReason, from_client: Throughput, to_client: Throughput) -> SessionSummary {
        self.transition(SessionState::Closed);
        let remote = self.remote.stats();
        tracing::info!(
            "session closed ({}): from client {}, to client {}, Live API {}",
            end_reason,
            from_client,
            to_client,
            remote
        );
        SessionSummary {
            id: self.id,
            state: self.state,
            end_reason,
            from_client,
            to_client,
            remote,
        }
    }
}

async fn reject<W>(sink: &mut W, reason: &'static str)
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: reason.into(),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        tracing::debug!("failed to send close frame: {}", e);
    }
    if let Err(e) = sink.close().await {
        tracing::debug!("failed to close client ws: {}", e);
    }
}

/// Sole writer of the client socket.
async fn write_to_client<W>(mut sink: W, mut out_rx: mpsc::Receiver<Message>)
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display + Send,
{
    while let Some(message) = out_rx.recv().await {
        if let Err(e) = sink.send(message).await {
            tracing::debug!("client ws send failed: {}", e);
            break;
        }
    }
    if let Err(e) = sink.close().await {
        tracing::debug!("failed to close client ws: {}", e);
    }
}

async fn client_to_remote<R, S, E>(
    remote: &R,
    mut stream: S,
    out_tx: &mpsc::Sender<Message>,
    resampler: &mut Resampler,
    stats: &mut DirectionStats,
) -> EndReason
where
    R: RealtimeApi,
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("client ws error: {}", e);
                return EndReason::ClientLeft;
            }
        };

        match message {
            Message::Binary(data) => {
                stats.record(data.len());
                let pcm = resample_chunk(resampler, &data).await;
                if !pcm.is_empty() {
                    if let Err(e) = remote.send_audio(&pcm).await {
                        tracing::error!("failed to forward audio: {}", e);
                        return EndReason::RemoteEnded;
                    }
                }
                if let Some(window) = stats.take_window(Instant::now()) {
                    tracing::info!(
                        "RX mic: {} (input_rate={} -> {})",
                        window,
                        resampler.input_rate(),
                        resampler.output_rate()
                    );
                }
            }
            Message::Text(text) => handle_control(text.as_str(), resampler, out_tx).await,
            Message::Close(frame) => {
                tracing::info!("client closed the connection: {:?}", frame);
                return EndReason::ClientLeft;
            }
            _ => {}
        }
    }
    tracing::info!("client disconnected");
    EndReason::ClientLeft
}

/// Resamples a client chunk to the remote rate. Chunks longer than a second
/// of audio run on the blocking pool.
async fn resample_chunk<'a>(resampler: &Resampler, data: &'a [u8]) -> Cow<'a, [u8]> {
    let one_second = resampler.input_rate() as usize * PCM16_BYTES_PER_SAMPLE;
    if data.len() <= one_second {
        return resampler.process(data, SampleFormat::Pcm16);
    }

    let resampler = resampler.clone();
    let data = data.to_vec();
    match tokio::task::spawn_blocking(move || resampler.process(&data, SampleFormat::Pcm16).into_owned()).await {
        Ok(pcm) => Cow::Owned(pcm),
        Err(e) => {
            tracing::warn!("resample task failed: {}", e);
            Cow::Owned(Vec::new())
        }
    }
}

async fn handle_control(text: &str, resampler: &mut Resampler, out_tx: &mpsc::Sender<Message>) {
    let message = match serde_json::from_str::<ControlMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("ignoring malformed control message: {}", e);
            return;
        }
    };

    match message {
        ControlMessage::Ping { timestamp } => {
            let reply = match serde_json::to_string(&ControlReply::Pong { timestamp }) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!("failed to encode pong: {}", e);
                    return;
                }
            };
            if out_tx.send(Message::Text(reply.into())).await.is_err() {
                tracing::debug!("client writer gone, dropping pong");
            }
        }
        ControlMessage::Config(config) => {
            tracing::info!(
                "client audio config: sampleRate={:?} sourceSampleRate={:?} chunkMs={:?}",
                config.sample_rate,
                config.source_sample_rate,
                config.chunk_ms
            );
            match config.input_rate() {
                Some(rate) => resampler.set_input_rate(rate),
                None => tracing::warn!(
                    "ignoring unsupported sampleRate {:?}, keeping {}",
                    config.sample_rate,
                    resampler.input_rate()
                ),
            }
        }
        ControlMessage::Unknown => tracing::debug!("ignoring control message: {}", text),
    }
}

async fn remote_to_client(
    mut audio: AudioStream,
    out_tx: &mpsc::Sender<Message>,
    stats: &mut DirectionStats,
) -> EndReason {
    while let Some(frame) = audio.next().await {
        if frame.is_empty() {
            continue;
        }
        let len = frame.len();
        if out_tx.send(Message::Binary(frame.into())).await.is_err() {
            tracing::info!("client writer gone");
            return EndReason::ClientLeft;
        }
        if stats.record(len) {
            tracing::info!("first audio received from Live API ({} bytes)", len);
        }
        if let Some(window) = stats.take_window(Instant::now()) {
            tracing::info!("TX audio to browser: {}", window);
        }
    }
    tracing::info!("Live API audio stream ended");
    EndReason::RemoteEnded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime_api::ConnectionState;
    use async_trait::async_trait;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::task::JoinHandle;

    type ClientIn = UnboundedSender<Result<Message, axum::Error>>;

    #[derive(Clone, Default)]
    struct Calls {
        sent_audio: Arc<Mutex<Vec<Vec<u8>>>>,
        sent_text: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    struct MockRemote {
        calls: Calls,
        fail_connect: bool,
        audio: Mutex<Option<UnboundedReceiver<Vec<u8>>>>,
        state: ConnectionState,
    }

    impl MockRemote {
        fn new(fail_connect: bool) -> (Self, Calls, UnboundedSender<Vec<u8>>) {
            let (audio_tx, audio_rx) = unbounded();
            let calls = Calls::default();
            let remote = Self {
                calls: calls.clone(),
                fail_connect,
                audio: Mutex::new(Some(audio_rx)),
                state: ConnectionState::Disconnected,
            };
            (remote, calls, audio_tx)
        }
    }

    #[async_trait]
    impl RealtimeApi for MockRemote {
        async fn connect(&mut self) -> Result<(), LiveError> {
            if self.fail_connect {
                self.state = ConnectionState::Closed;
                return Err(LiveError::Handshake("no setupComplete".to_string()));
            }
            self.state = ConnectionState::Ready;
            Ok(())
        }

        async fn send_audio(&self, pcm: &[u8]) -> Result<(), LiveError> {
            self.calls.sent_audio.lock().unwrap().push(pcm.to_vec());
            Ok(())
        }

        async fn send_text(&self, text: &str) -> Result<(), LiveError> {
            self.calls.sent_text.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn receive(&mut self) -> AudioStream {
            match self.audio.lock().unwrap().take() {
                Some(rx) => rx.boxed(),
                None => futures::stream::empty().boxed(),
            }
        }

        async fn close(&mut self) {
            self.calls.closed.store(true, Ordering::SeqCst);
            self.state = ConnectionState::Closed;
        }

        fn state(&self) -> ConnectionState {
            self.state
        }

        fn stats(&self) -> StatsSnapshot {
            StatsSnapshot::default()
        }
    }

    struct Harness {
        client_in: ClientIn,
        client_out: UnboundedReceiver<Message>,
        shutdown: CancellationToken,
        handle: JoinHandle<SessionSummary>,
    }

    fn start_session(remote: MockRemote) -> Harness {
        let (client_in, stream) = unbounded();
        let (sink, client_out) = unbounded();
        let shutdown = CancellationToken::new();
        let session = RelaySession::new(remote, Arc::new(SessionConfig::default()), shutdown.clone());
        let handle = tokio::spawn(session.run(sink, stream));
        Harness {
            client_in,
            client_out,
            shutdown,
            handle,
        }
    }

    fn send(client_in: &ClientIn, message: Message) {
        client_in.unbounded_send(Ok(message)).unwrap();
    }

    async fn finish(harness: Harness) -> (SessionSummary, Vec<Message>) {
        let Harness {
            client_in,
            client_out,
            handle,
            ..
        } = harness;
        drop(client_in);
        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        (summary, client_out.collect().await)
    }

    #[tokio::test]
    async fn test_ping_is_answered_locally() {
        // --- Arrange ---
        let (remote, calls, _audio) = MockRemote::new(false);
        let mut harness = start_session(remote);

        // --- Act ---
        send(&harness.client_in, Message::Text(r#"{"type":"ping","timestamp":123.5}"#.into()));
        let reply = harness.client_out.next().await.unwrap();

        // --- Assert ---
        let Message::Text(text) = reply else {
            panic!("expected text reply, got {:?}", reply);
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "pong", "timestamp": 123.5 }));

        let (summary, rest) = finish(harness).await;
        assert!(rest.is_empty());
        assert_eq!(summary.from_client, Throughput::default());
        assert!(calls.sent_audio.lock().unwrap().is_empty());
        assert_eq!(*calls.sent_text.lock().unwrap(), vec![DEFAULT_GREETING.to_string()]);
    }

    #[tokio::test]
    async fn test_config_changes_input_rate() {
        // --- Arrange ---
        let (remote, calls, _audio) = MockRemote::new(false);
        let harness = start_session(remote);

        // --- Act ---
        send(&harness.client_in, Message::Binary(vec![0u8; 3200].into()));
        send(&harness.client_in, Message::Text(r#"{"type":"config","sampleRate":16000}"#.into()));
        send(&harness.client_in, Message::Binary(vec![0u8; 3200].into()));
        send(&harness.client_in, Message::Text(r#"{"type":"config","sampleRate":0}"#.into()));
        send(&harness.client_in, Message::Binary(vec![0u8; 3200].into()));
        let (summary, _) = finish(harness).await;

        // --- Assert ---
        let lengths: Vec<usize> = calls.sent_audio.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![1600, 4800, 4800]);
        assert_eq!(summary.from_client, Throughput { chunks: 3, bytes: 9600 });
        assert_eq!(summary.end_reason, EndReason::ClientLeft);
    }

    #[tokio::test]
    async fn test_unsupported_rates_keep_the_current_rate() {
        // --- Arrange ---
        let (remote, calls, _audio) = MockRemote::new(false);
        let harness = start_session(remote);

        // --- Act ---
        for config in [
            r#"{"type":"config","sampleRate":4294967291}"#,
            r#"{"type":"config","sampleRate":1000003}"#,
            r#"{"type":"config","sampleRate":"abc"}"#,
        ] {
            send(&harness.client_in, Message::Text(config.into()));
            send(&harness.client_in, Message::Binary(vec![0u8; 3200].into()));
        }
        send(&harness.client_in, Message::Text(r#"{"type":"config","sampleRate":16000.0}"#.into()));
        send(&harness.client_in, Message::Binary(vec![0u8; 3200].into()));
        let (summary, _) = finish(harness).await;

        // --- Assert ---
        let lengths: Vec<usize> = calls.sent_audio.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![1600, 1600, 1600, 4800]);
        assert_eq!(summary.end_reason, EndReason::ClientLeft);
    }

    #[tokio::test]
    async fn test_malformed_text_is_ignored() {
        let (remote, calls, _audio) = MockRemote::new(false);
        let harness = start_session(remote);

        send(&harness.client_in, Message::Text("{not json".into()));
        send(&harness.client_in, Message::Text(r#"{"type":"mute"}"#.into()));
        send(&harness.client_in, Message::Binary(vec![0u8; 3200].into()));
        let (summary, rest) = finish(harness).await;

        assert!(rest.is_empty());
        assert_eq!(calls.sent_audio.lock().unwrap().len(), 1);
        assert_eq!(summary.state, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_failure_closes_client_with_internal_error() {
        // --- Arrange ---
        let (remote, calls, _audio) = MockRemote::new(true);
        let harness = start_session(remote);

        // --- Act ---
        send(&harness.client_in, Message::Binary(vec![0u8; 3200].into()));
        let (summary, messages) = finish(harness).await;

        // --- Assert ---
        assert_eq!(summary.end_reason, EndReason::ConnectFailed);
        assert_eq!(summary.state, SessionState::Closed);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            Message::Close(Some(frame)) => assert_eq!(frame.code, close_code::ERROR),
            other => panic!("expected close frame, got {:?}", other),
        }
        assert!(calls.sent_audio.lock().unwrap().is_empty());
        assert!(calls.sent_text.lock().unwrap().is_empty());
        assert!(calls.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_client_leaving_closes_remote() {
        // The remote still has pending audio when the client goes away.
        let (remote, calls, audio_tx) = MockRemote::new(false);
        let harness = start_session(remote);

        let (summary, _) = finish(harness).await;

        assert_eq!(summary.end_reason, EndReason::ClientLeft);
        assert!(calls.closed.load(Ordering::SeqCst));
        drop(audio_tx);
    }

    #[tokio::test]
    async fn test_remote_audio_is_forwarded_until_remote_ends() {
        // --- Arrange ---
        let (remote, calls, audio_tx) = MockRemote::new(false);
        let harness = start_session(remote);

        // --- Act ---
        audio_tx.unbounded_send(vec![1, 2, 3, 4]).unwrap();
        audio_tx.unbounded_send(Vec::new()).unwrap();
        audio_tx.unbounded_send(vec![5, 6]).unwrap();
        drop(audio_tx);
        let Harness {
            client_in,
            client_out,
            handle,
            ..
        } = harness;
        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        let messages: Vec<Message> = client_out.collect().await;

        // --- Assert ---
        assert_eq!(summary.end_reason, EndReason::RemoteEnded);
        assert_eq!(summary.to_client, Throughput { chunks: 2, bytes: 6 });
        let frames: Vec<Vec<u8>> = messages
            .into_iter()
            .filter_map(|message| match message {
                Message::Binary(data) => Some(data.to_vec()),
                _ => None,
            })
            .collect();
        assert_eq!(frames, vec![vec![1, 2, 3, 4], vec![5, 6]]);
        assert!(calls.closed.load(Ordering::SeqCst));
        drop(client_in);
    }

    #[tokio::test]
    async fn test_shutdown_ends_active_session() {
        let (remote, calls, _audio) = MockRemote::new(false);
        let harness = start_session(remote);

        harness.shutdown.cancel();
        let summary = tokio::time::timeout(Duration::from_secs(5), harness.handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.end_reason, EndReason::Shutdown);
        assert!(calls.closed.load(Ordering::SeqCst));
        drop(harness.client_in);
    }

    #[test]
    fn test_session_ids_are_short_hex() {
        let id = new_session_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_session_id());
    }
}
