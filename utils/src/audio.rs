use base64::Engine;

mod consts;

pub use consts::*;

/// Layout of a raw PCM byte buffer. Both layouts are little-endian mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// 16-bit signed integer samples.
    #[default]
    Pcm16,
    /// 32-bit float samples normalized to [-1.0, 1.0].
    Float32,
}

impl SampleFormat {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::Pcm16 => PCM16_BYTES_PER_SAMPLE,
            SampleFormat::Float32 => F32_BYTES_PER_SAMPLE,
        }
    }
}

/// MIME descriptor attached to every outbound audio chunk, e.g. `audio/pcm;rate=24000`.
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("{};rate={}", PCM_MIME_PREFIX, sample_rate)
}

/// Interprets little-endian bytes as i16 samples. A trailing odd byte is ignored.
pub fn decode_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(PCM16_BYTES_PER_SAMPLE)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// Interprets little-endian bytes as f32 samples.
pub fn decode_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(F32_BYTES_PER_SAMPLE)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Scales normalized float samples into the i16 range, truncating toward zero.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Widens i16 samples into a float working buffer without normalizing.
pub fn convert_i16_to_f32(pcm16: &[i16]) -> Vec<f32> {
    pcm16.iter().map(|&sample| sample as f32).collect()
}

/// Clips float samples to the i16 range and truncates them.
pub fn clip_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| sample.clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode_base64(fragment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(fragment)
}

/// A trait for converting audio sample types to a binary representation (Vec<u8>).
pub trait ToBinary {
    fn to_binary(&self) -> Vec<u8>;
}

impl ToBinary for [i16] {
    fn to_binary(&self) -> Vec<u8> {
        self.iter().flat_map(|&sample| sample.to_le_bytes()).collect()
    }
}

impl ToBinary for [f32] {
    fn to_binary(&self) -> Vec<u8> {
        self.iter().flat_map(|&sample| sample.to_le_bytes()).collect()
    }
}
