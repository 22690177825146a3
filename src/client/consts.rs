use std::time::Duration;

pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

pub const BASE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";
pub const DEFAULT_VOICE: &str = "Aoede";

pub const API_KEY_HEADER: &str = "x-goog-api-key";

pub const PING_INTERVAL: Duration = Duration::from_secs(20);
pub const PING_TIMEOUT: Duration = Duration::from_secs(20);

/// Inline audio arrives base64 encoded, so leave plenty of room per message.
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

pub const CHANNEL_CAPACITY: usize = 1024;
