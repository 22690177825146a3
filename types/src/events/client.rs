use crate::content::{Blob, Content, Part};

/// `realtime_input`: streamed media, or the end-of-stream marker.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RealtimeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio_stream_end: Option<bool>,
}

impl RealtimeInput {
    pub fn audio(mime_type: &str, data: String) -> Self {
        Self {
            audio: Some(Blob::new(mime_type, data)),
            audio_stream_end: None,
        }
    }

    pub fn audio_stream_end() -> Self {
        Self {
            audio: None,
            audio_stream_end: Some(true),
        }
    }

    pub fn get_audio(&self) -> Option<&Blob> {
        self.audio.as_ref()
    }

    pub fn is_audio_stream_end(&self) -> bool {
        self.audio_stream_end.unwrap_or(false)
    }
}

/// `client_content`: whole conversation turns sent as text.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientContent {
    turns: Vec<Content>,
    turn_complete: bool,
}

impl ClientContent {
    pub fn new(turns: Vec<Content>, turn_complete: bool) -> Self {
        Self {
            turns,
            turn_complete,
        }
    }

    pub fn user_text(text: &str) -> Self {
        Self::new(vec![Content::new(vec![Part::text(text)]).with_role("user")], true)
    }

    pub fn turns(&self) -> &[Content] {
        &self.turns
    }

    pub fn turn_complete(&self) -> bool {
        self.turn_complete
    }
}
