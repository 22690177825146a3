use gemini_live_utils::is_supported_rate;
use serde::{Deserialize, Deserializer, Serialize};

/// Structured text frames a client may send alongside its audio.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Latency check, answered with a pong carrying the same timestamp.
    Ping {
        #[serde(default)]
        timestamp: serde_json::Value,
    },
    Config(ClientAudioConfig),
    #[serde(other)]
    Unknown,
}

/// Describes the client's capture format. Only `sample_rate` affects the relay.
///
/// Numbers may arrive as integers, floats or numeric strings. Anything else
/// reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAudioConfig {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub sample_rate: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub source_sample_rate: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub chunk_ms: Option<u32>,
}

impl ClientAudioConfig {
    /// The new input rate, if the message carries a supported one.
    pub fn input_rate(&self) -> Option<u32> {
        self.sample_rate.filter(|rate| is_supported_rate(*rate))
    }
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        Some(serde_json::Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Some(serde_json::Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(number.and_then(|n| u32::try_from(n).ok()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlReply {
    Pong { timestamp: serde_json::Value },
}
