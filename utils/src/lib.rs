pub mod audio;
pub mod resample;

pub use audio::SampleFormat;
pub use resample::{is_supported_rate, resample, try_resample, ResampleError, Resampler};
