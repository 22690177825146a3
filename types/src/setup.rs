use crate::content::{Content, Part};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Audio,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpeechConfig {
    voice_config: VoiceConfig,
}

impl SpeechConfig {
    pub fn prebuilt(voice_name: &str) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.to_string(),
                },
            },
        }
    }

    pub fn voice_name(&self) -> &str {
        &self.voice_config.prebuilt_voice_config.voice_name
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerationConfig {
    response_modalities: Vec<ResponseModality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

/// Payload of the `setup` message, the first thing sent on a new connection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Setup {
    /// Fully qualified model name, e.g. `models/gemini-2.5-flash-native-audio-preview-12-2025`.
    model: String,

    generation_config: GenerationConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

impl Setup {
    /// Starts an audio-only setup for `model`. A bare id gets the `models/` prefix.
    pub fn new(model: &str) -> Self {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec![ResponseModality::Audio],
                speech_config: None,
            },
            system_instruction: None,
        }
    }

    pub fn with_voice(mut self, voice_name: &str) -> Self {
        self.generation_config.speech_config = Some(SpeechConfig::prebuilt(voice_name));
        self
    }

    pub fn with_system_instruction(mut self, text: &str) -> Self {
        self.system_instruction = Some(Content::new(vec![Part::text(text)]));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice_name(&self) -> Option<&str> {
        self.generation_config
            .speech_config
            .as_ref()
            .map(|speech| speech.voice_name())
    }

    pub fn response_modalities(&self) -> &[ResponseModality] {
        &self.generation_config.response_modalities
    }
}
