use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, Message};
use futures::channel::mpsc::unbounded;
use futures_util::{SinkExt, StreamExt};
use gemini_live_relay::session::EndReason;
use gemini_live_relay::types::ClientMessage;
use gemini_live_relay::utils::audio::decode_base64;
use gemini_live_relay::{GeminiLiveClient, LiveConfig, RelaySession, SessionConfig};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

type ServerWs = WebSocketStream<TcpStream>;

async fn fake_live_server<F, Fut>(script: F) -> String
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        script(ws).await;
    });
    format!("ws://{}", addr)
}

async fn next_json(ws: &mut ServerWs) -> Option<serde_json::Value> {
    while let Some(Ok(message)) = ws.next().await {
        match message {
            WsMessage::Text(text) => return serde_json::from_str(&text).ok(),
            WsMessage::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn next_message(ws: &mut ServerWs) -> Option<ClientMessage> {
    serde_json::from_value(next_json(ws).await?).ok()
}

fn live_config(url: &str) -> Arc<LiveConfig> {
    Arc::new(
        LiveConfig::builder()
            .with_base_url(url)
            .with_api_key("test-key")
            .with_keepalive(Duration::from_secs(5), Duration::from_secs(5))
            .build(),
    )
}

#[tokio::test]
async fn test_silence_is_resampled_and_reply_audio_is_relayed() {
    // --- Arrange ---
    let (seen_tx, seen_rx) = oneshot::channel();
    let url = fake_live_server(|mut ws| async move {
        let setup = next_json(&mut ws).await.unwrap();
        assert!(setup.get("setup").is_some());
        ws.send(WsMessage::Text(r#"{"setupComplete":{}}"#.to_string()))
            .await
            .unwrap();

        let greeting = next_message(&mut ws).await.unwrap();
        let audio = next_message(&mut ws).await.unwrap();
        seen_tx.send((greeting, audio)).unwrap();

        let reply = serde_json::json!({
            "serverContent": {
                "modelTurn": { "parts": [{ "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "AQIDBA==" } }] }
            }
        });
        ws.send(WsMessage::Text(reply.to_string())).await.unwrap();
        ws.send(WsMessage::Text(r#"{"serverContent":{"turnComplete":true}}"#.to_string()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
    })
    .await;

    let (client_in, stream) = unbounded::<Result<Message, axum::Error>>();
    let (sink, mut client_out) = unbounded::<Message>();
    let session = RelaySession::new(
        GeminiLiveClient::new(live_config(&url)),
        Arc::new(SessionConfig::default()),
        CancellationToken::new(),
    );
    let handle = tokio::spawn(session.run(sink, stream));

    // --- Act ---
    client_in
        .unbounded_send(Ok(Message::Binary(vec![0u8; 3200].into())))
        .unwrap();
    let (greeting, audio) = tokio::time::timeout(Duration::from_secs(5), seen_rx)
        .await
        .unwrap()
        .unwrap();
    let relayed = tokio::time::timeout(Duration::from_secs(5), client_out.next())
        .await
        .unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .unwrap()
        .unwrap();

    // --- Assert ---
    let ClientMessage::ClientContent(greeting) = greeting else {
        panic!("expected a text turn, got {:?}", greeting);
    };
    assert!(greeting.turn_complete());
    let turn = &greeting.turns()[0];
    assert_eq!(turn.role(), Some("user"));
    assert_eq!(
        turn.parts()[0].get_text(),
        Some(SessionConfig::default().greeting.as_str())
    );

    let ClientMessage::RealtimeInput(input) = audio else {
        panic!("expected realtime input, got {:?}", audio);
    };
    let blob = input.get_audio().unwrap();
    assert_eq!(blob.mime_type(), "audio/pcm;rate=24000");
    let pcm = decode_base64(blob.data()).unwrap();
    assert_eq!(pcm.len(), 1600);
    assert!(pcm.iter().all(|b| *b == 0));

    match relayed {
        Some(Message::Binary(data)) => assert_eq!(&data[..], &[1, 2, 3, 4]),
        other => panic!("expected relayed audio, got {:?}", other),
    }
    assert_eq!(summary.end_reason, EndReason::RemoteEnded);
    assert_eq!(summary.remote.sent_chunks, 1);
    assert_eq!(summary.remote.sent_bytes, 1600);
    assert_eq!(summary.remote.recv_bytes, 4);
    drop(client_in);
}

#[tokio::test]
async fn test_failed_handshake_closes_client_with_internal_error() {
    // --- Arrange ---
    let url = fake_live_server(|mut ws| async move {
        let _ = next_json(&mut ws).await;
        ws.send(WsMessage::Text(
            r#"{"error":{"code":403,"message":"permission denied"}}"#.to_string(),
        ))
        .await
        .unwrap();
        let _ = next_json(&mut ws).await;
    })
    .await;

    let (client_in, stream) = unbounded::<Result<Message, axum::Error>>();
    let (sink, client_out) = unbounded::<Message>();
    let session = RelaySession::new(
        GeminiLiveClient::new(live_config(&url)),
        Arc::new(SessionConfig::default()),
        CancellationToken::new(),
    );

    // --- Act ---
    client_in
        .unbounded_send(Ok(Message::Binary(vec![0u8; 3200].into())))
        .unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(10), session.run(sink, stream))
        .await
        .unwrap();
    let messages: Vec<Message> = client_out.collect().await;

    // --- Assert ---
    assert_eq!(summary.end_reason, EndReason::ConnectFailed);
    assert_eq!(summary.remote.sent_chunks, 0);
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        Message::Close(Some(frame)) => assert_eq!(frame.code, close_code::ERROR),
        other => panic!("expected close frame, got {:?}", other),
    }
}
