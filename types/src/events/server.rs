/// `serverContent`: a slice of the model's response.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_turn: Option<ModelTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    turn_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interrupted: Option<bool>,
}

impl ServerContent {
    pub fn with_model_turn(mut self, model_turn: ModelTurn) -> Self {
        self.model_turn = Some(model_turn);
        self
    }

    pub fn with_turn_complete(mut self, turn_complete: bool) -> Self {
        self.turn_complete = Some(turn_complete);
        self
    }

    pub fn model_turn(&self) -> Option<&ModelTurn> {
        self.model_turn.as_ref()
    }

    pub fn is_turn_complete(&self) -> bool {
        self.turn_complete.unwrap_or(false)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.unwrap_or(false)
    }

    /// Base64 payloads of every inline-data part, in order. Parts without data are skipped.
    pub fn inline_audio(&self) -> impl Iterator<Item = &str> {
        self.model_turn
            .iter()
            .flat_map(|turn| turn.parts.iter())
            .filter_map(|part| part.inline_data.as_ref())
            .filter_map(|blob| blob.data.as_deref())
            .filter(|data| !data.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    parts: Vec<ServerPart>,
}

impl ModelTurn {
    pub fn new(parts: Vec<ServerPart>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[ServerPart] {
        &self.parts
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<ServerBlob>,
}

impl ServerPart {
    pub fn inline_audio(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(ServerBlob {
                mime_type: Some(mime_type.to_string()),
                data: Some(data),
            }),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn inline_data(&self) -> Option<&ServerBlob> {
        self.inline_data.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerBlob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

impl ServerBlob {
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_audio_skips_text_and_empty_parts() {
        let content: ServerContent = serde_json::from_str(
            r#"{
                "modelTurn": {
                    "parts": [
                        {"text": "thinking"},
                        {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAE="}},
                        {"inlineData": {"mimeType": "audio/pcm;rate=24000"}},
                        {"inlineData": {"data": ""}},
                        {"inlineData": {"data": "AgM="}}
                    ]
                }
            }"#,
        )
        .unwrap();

        let audio: Vec<&str> = content.inline_audio().collect();
        assert_eq!(audio, vec!["AAE=", "AgM="]);
        assert!(!content.is_turn_complete());
        assert_eq!(content.model_turn().unwrap().parts().len(), 5);
    }

    #[test]
    fn test_turn_complete_without_model_turn() {
        let content: ServerContent =
            serde_json::from_str(r#"{"turnComplete": true, "interrupted": false}"#).unwrap();
        assert!(content.is_turn_complete());
        assert!(!content.is_interrupted());
        assert_eq!(content.inline_audio().count(), 0);
    }
}
