pub mod client;
pub mod config;
pub mod error;
pub mod realtime_api;
pub mod server;
pub mod session;

pub use gemini_live_types as types;
pub use gemini_live_utils as utils;

pub use client::{connect, connect_with_config, GeminiLiveClient, LiveConfig};
pub use error::LiveError;
pub use realtime_api::{AudioStream, ConnectionState, RealtimeApi};
pub use session::{RelaySession, SessionConfig, SessionSummary};
