//! Rational-rate PCM resampling for the live audio path.
//!
//! Every chunk is filtered on its own by a fresh band-limited sinc
//! resampler, so no state leaks between chunks and the only added delay
//! is compensated within the chunk.

use std::borrow::Cow;

use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

use crate::audio::{self, SampleFormat, ToBinary, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};

const SINC_LEN: usize = 64;
const OVERSAMPLING_FACTOR: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResampleError {
    #[error("buffer of {len} bytes is not a whole number of {width}-byte samples")]
    Misaligned { len: usize, width: usize },
    #[error("unsupported sample rates (input={input}, output={output})")]
    UnsupportedRate { input: u32, output: u32 },
    #[error("resampler failed: {0}")]
    Filter(String),
}

/// Whether `rate` is a capture rate the relay accepts.
pub fn is_supported_rate(rate: u32) -> bool {
    (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate)
}

/// Converts a PCM buffer from `input_rate` to `output_rate`, producing 16-bit PCM.
///
/// A 16-bit buffer whose rates already match is handed back borrowed.
/// Failures produce an empty buffer, which callers treat as nothing to forward.
pub fn resample(bytes: &[u8], format: SampleFormat, input_rate: u32, output_rate: u32) -> Cow<'_, [u8]> {
    try_resample(bytes, format, input_rate, output_rate).unwrap_or_else(|e| {
        tracing::debug!("dropping {} byte chunk: {}", bytes.len(), e);
        Cow::Owned(Vec::new())
    })
}

/// Same as [`resample`] but reports why a chunk could not be converted.
pub fn try_resample(
    bytes: &[u8],
    format: SampleFormat,
    input_rate: u32,
    output_rate: u32,
) -> Result<Cow<'_, [u8]>, ResampleError> {
    if bytes.is_empty() || (format == SampleFormat::Pcm16 && input_rate == output_rate) {
        return Ok(Cow::Borrowed(bytes));
    }
    let ratio = reduced_ratio(input_rate, output_rate)?;
    convert(bytes, format, ratio).map(Cow::Owned)
}

/// A resampler with a fixed output rate and an adjustable input rate.
#[derive(Debug, Clone)]
pub struct Resampler {
    input_rate: u32,
    output_rate: u32,
    ratio: Result<Option<(usize, usize)>, ResampleError>,
}

impl Resampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            input_rate,
            output_rate,
            ratio: reduced_ratio(input_rate, output_rate),
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn set_input_rate(&mut self, input_rate: u32) {
        if input_rate != self.input_rate {
            *self = Self::new(input_rate, self.output_rate);
        }
    }

    pub fn process<'a>(&self, bytes: &'a [u8], format: SampleFormat) -> Cow<'a, [u8]> {
        if bytes.is_empty() || (format == SampleFormat::Pcm16 && self.input_rate == self.output_rate) {
            return Cow::Borrowed(bytes);
        }
        let converted = self
            .ratio
            .clone()
            .and_then(|ratio| convert(bytes, format, ratio));
        match converted {
            Ok(out) => Cow::Owned(out),
            Err(e) => {
                tracing::debug!("dropping {} byte chunk: {}", bytes.len(), e);
                Cow::Owned(Vec::new())
            }
        }
    }
}

/// `(up, down)` reduced by their gcd. `None` means the rates are equal and
/// only a format conversion is needed.
fn reduced_ratio(input_rate: u32, output_rate: u32) -> Result<Option<(usize, usize)>, ResampleError> {
    if !is_supported_rate(input_rate) || !is_supported_rate(output_rate) {
        return Err(ResampleError::UnsupportedRate {
            input: input_rate,
            output: output_rate,
        });
    }
    if input_rate == output_rate {
        return Ok(None);
    }
    let g = gcd(input_rate, output_rate);
    Ok(Some(((output_rate / g) as usize, (input_rate / g) as usize)))
}

fn convert(bytes: &[u8], format: SampleFormat, ratio: Option<(usize, usize)>) -> Result<Vec<u8>, ResampleError> {
    let width = format.bytes_per_sample();
    if bytes.len() % width != 0 {
        return Err(ResampleError::Misaligned {
            len: bytes.len(),
            width,
        });
    }

    let pcm16 = match format {
        SampleFormat::Pcm16 => audio::decode_i16(bytes),
        SampleFormat::Float32 => audio::convert_f32_to_i16(&audio::decode_f32(bytes)),
    };

    let Some((up, down)) = ratio else {
        return Ok(pcm16.to_binary());
    };

    let working = audio::convert_i16_to_f32(&pcm16);
    let filtered = filter_chunk(&working, up, down)?;
    Ok(audio::clip_to_i16(&filtered).to_binary())
}

fn sinc_parameters() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: OVERSAMPLING_FACTOR,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Resamples one chunk by `up / down`, returning `ceil(len * up / down)` samples
/// aligned with the input.
fn filter_chunk(samples: &[f32], up: usize, down: usize) -> Result<Vec<f32>, ResampleError> {
    let mut resampler = SincFixedIn::<f32>::new(
        up as f64 / down as f64,
        1.0,
        sinc_parameters(),
        samples.len(),
        1,
    )
    .map_err(filter_error)?;

    let delay = resampler.output_delay();
    let wanted = (samples.len() * up).div_ceil(down);

    let mut out = first_channel(resampler.process(&[samples], None).map_err(filter_error)?);

    // Flush the filter tail with silence until the delayed samples are out.
    let mut flushes = 0;
    while out.len() < delay + wanted && flushes <= SINC_LEN {
        let tail = first_channel(
            resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(filter_error)?,
        );
        if tail.is_empty() {
            break;
        }
        out.extend_from_slice(&tail);
        flushes += 1;
    }

    Ok(out.into_iter().skip(delay).take(wanted).collect())
}

fn filter_error(e: impl std::fmt::Display) -> ResampleError {
    ResampleError::Filter(e.to_string())
}

fn first_channel(channels: Vec<Vec<f32>>) -> Vec<f32> {
    channels.into_iter().next().unwrap_or_default()
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
