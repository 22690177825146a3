use std::time::Duration;

use gemini_live_types::Setup;
use gemini_live_utils::audio::{pcm_mime_type, GEMINI_SAMPLE_RATE};
use secrecy::SecretString;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::client::consts;

/// Connection and setup parameters for one Live API connection.
#[derive(Debug)]
pub struct LiveConfig {
    base_url: String,
    api_key: SecretString,
    model: String,
    voice: String,
    system_prompt: String,
    sample_rate: u32,
    ping_interval: Duration,
    ping_timeout: Duration,
    max_message_size: usize,
    channel_capacity: usize,
}

pub struct LiveConfigBuilder {
    config: LiveConfig,
}

impl LiveConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LiveConfig::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_secret_api_key(mut self, api_key: SecretString) -> Self {
        self.config.api_key = api_key;
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn with_voice(mut self, voice: &str) -> Self {
        self.config.voice = voice.to_string();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: &str) -> Self {
        self.config.system_prompt = system_prompt.to_string();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    pub fn with_keepalive(mut self, ping_interval: Duration, ping_timeout: Duration) -> Self {
        self.config.ping_interval = ping_interval;
        self.config.ping_timeout = ping_timeout;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.config.max_message_size = max_message_size;
        self
    }

    pub fn build(self) -> LiveConfig {
        self.config
    }
}

impl Default for LiveConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveConfig {
    // Sets the default values.
    pub fn new() -> Self {
        Self {
            base_url: consts::BASE_URL.to_string(),
            api_key: std::env::var(consts::GEMINI_API_KEY)
                .unwrap_or_default()
                .into(),
            model: consts::DEFAULT_MODEL.to_string(),
            voice: consts::DEFAULT_VOICE.to_string(),
            system_prompt: String::new(),
            sample_rate: GEMINI_SAMPLE_RATE,
            ping_interval: consts::PING_INTERVAL,
            ping_timeout: consts::PING_TIMEOUT,
            max_message_size: consts::MAX_MESSAGE_SIZE,
            channel_capacity: consts::CHANNEL_CAPACITY,
        }
    }

    pub fn builder() -> LiveConfigBuilder {
        LiveConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    pub fn ping_timeout(&self) -> Duration {
        self.ping_timeout
    }

    /// Longest silence from the service before the connection counts as unreachable.
    pub fn stale_after(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn mime_type(&self) -> String {
        pcm_mime_type(self.sample_rate)
    }

    pub(crate) fn setup(&self) -> Setup {
        let setup = Setup::new(&self.model).with_voice(&self.voice);
        if self.system_prompt.is_empty() {
            setup
        } else {
            setup.with_system_instruction(&self.system_prompt)
        }
    }

    pub(crate) fn websocket_config(&self) -> WebSocketConfig {
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.max_message_size);
        ws_config.max_frame_size = Some(self.max_message_size);
        ws_config
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self::new()
    }
}
