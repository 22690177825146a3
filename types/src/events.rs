pub mod client;
pub mod server;

pub use client::{ClientContent, RealtimeInput};
pub use server::{ModelTurn, ServerBlob, ServerContent, ServerPart};

use crate::setup::Setup;

/// Messages sent to the service. Each serializes as a single-key object,
/// e.g. `{"realtime_input": {...}}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
}

impl ClientMessage {
    pub fn audio(mime_type: &str, data: String) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput::audio(mime_type, data))
    }

    pub fn audio_stream_end() -> Self {
        ClientMessage::RealtimeInput(RealtimeInput::audio_stream_end())
    }

    /// A single complete user turn carrying `text`.
    pub fn user_text(text: &str) -> Self {
        ClientMessage::ClientContent(ClientContent::user_text(text))
    }
}

/// Messages received from the service.
///
/// Every field is optional: the service sends one populated key per message
/// and may add keys this crate does not know about.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    setup_complete: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    server_content: Option<ServerContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<serde_json::Value>,
}

/// What a [`ServerMessage`] means to a consumer, in order of precedence.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Error(serde_json::Value),
    Content(ServerContent),
    SetupComplete,
    Other,
}

impl ServerMessage {
    pub fn setup_complete() -> Self {
        Self {
            setup_complete: Some(serde_json::json!({})),
            ..Default::default()
        }
    }

    pub fn content(content: ServerContent) -> Self {
        Self {
            server_content: Some(content),
            ..Default::default()
        }
    }

    pub fn error(error: serde_json::Value) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    pub fn into_event(self) -> ServerEvent {
        if let Some(error) = self.error {
            ServerEvent::Error(error)
        } else if let Some(content) = self.server_content {
            ServerEvent::Content(content)
        } else if self.setup_complete.is_some() {
            ServerEvent::SetupComplete
        } else {
            ServerEvent::Other
        }
    }
}
