/// Rate the Live API expects for input audio and produces for output audio.
pub const GEMINI_SAMPLE_RATE: u32 = 24000;
pub const GEMINI_CHANNELS: u16 = 1;

/// Browsers usually capture at 48kHz; the client may announce otherwise.
pub const DEFAULT_CLIENT_SAMPLE_RATE: u32 = 48000;
pub const CLIENT_CHANNELS: u16 = 1;

pub const PCM16_BYTES_PER_SAMPLE: usize = 2;
pub const F32_BYTES_PER_SAMPLE: usize = 4;

pub const PCM_MIME_PREFIX: &str = "audio/pcm";

/// Capture rates outside this range are not resampled.
pub const MIN_SAMPLE_RATE: u32 = 8000;
pub const MAX_SAMPLE_RATE: u32 = 192_000;
