use std::net::SocketAddr;

use gemini_live_utils::audio::{DEFAULT_CLIENT_SAMPLE_RATE, GEMINI_SAMPLE_RATE};
use secrecy::SecretString;
use tracing::Level;

use crate::client::LiveConfig;
use crate::session::{SessionConfig, DEFAULT_GREETING};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a deeply Motivational AI Companion.
Your goal is to understand the user's struggle and provide powerful, uplifting motivation.

Interaction Flow:
1. At the very beginning, you MUST ask: "Which language would you prefer?" and "What problem are you facing?".
2. Once the user responds, switch to their preferred language immediately.
3. Listen to their problem with empathy.
4. Provide a strong, encouraging response tailored to their specific situation.

Guidelines:
- No hate speech, harassment, or negativity.
- Be energetic, empathetic, and resilient.
- DO NOT be brief. Take your time to deliver elaborate, powerful, and deeply moving speeches.
- Use metaphors, storytelling, and strong emotional appeals to inspire the user.
- If the user switches languages, switch with them.
- Your goal is to make the user feel invincible."#;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub gemini_api_key: SecretString,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub system_prompt: String,
    pub greeting: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:8000".
    /// *   `GEMINI_API_KEY`: Your secret key for the Gemini API. Required.
    /// *   `GEMINI_MODEL`: (Optional) The Live API model id.
    /// *   `GEMINI_VOICE`: (Optional) The prebuilt voice name.
    /// *   `GEMINI_BASE_URL`: (Optional) Overrides the Live API websocket endpoint.
    /// *   `SYSTEM_PROMPT`: (Optional) The assistant's system instruction.
    /// *   `GREETING_PROMPT`: (Optional) The text turn that opens every session.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_address_str =
            non_empty("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let gemini_api_key = non_empty("GEMINI_API_KEY")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let log_level_str = non_empty("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            gemini_api_key,
            base_url: non_empty("GEMINI_BASE_URL"),
            model: non_empty("GEMINI_MODEL"),
            voice: non_empty("GEMINI_VOICE"),
            system_prompt: non_empty("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            greeting: non_empty("GREETING_PROMPT").unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            log_level,
        })
    }

    /// The Live API connection settings shared by every session.
    pub fn live_config(&self) -> LiveConfig {
        let mut builder = LiveConfig::builder()
            .with_secret_api_key(self.gemini_api_key.clone())
            .with_system_prompt(&self.system_prompt)
            .with_sample_rate(GEMINI_SAMPLE_RATE);
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }
        if let Some(model) = &self.model {
            builder = builder.with_model(model);
        }
        if let Some(voice) = &self.voice {
            builder = builder.with_voice(voice);
        }
        builder.build()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            client_sample_rate: DEFAULT_CLIENT_SAMPLE_RATE,
            remote_sample_rate: GEMINI_SAMPLE_RATE,
            greeting: self.greeting.clone(),
        }
    }
}
