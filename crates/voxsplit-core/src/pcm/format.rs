//! PCM stream parameters

use serde::{Deserialize, Serialize};

use super::error::{PcmError, PcmResult};

/// Sample encoding of a raw PCM stream
///
/// Byte order is always little-endian; it is not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Signed 16-bit integer samples
    Int16,
    /// 32-bit IEEE float samples
    #[default]
    Float32,
}

impl SampleEncoding {
    /// Size of one sample in bytes
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::Int16 => 2,
            SampleEncoding::Float32 => 4,
        }
    }

    /// Data format index understood by the native separation library
    pub const fn engine_index(self) -> i32 {
        match self {
            SampleEncoding::Int16 => 0,
            SampleEncoding::Float32 => 1,
        }
    }

    /// Inverse of [`engine_index`](Self::engine_index)
    pub fn from_engine_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(SampleEncoding::Int16),
            1 => Some(SampleEncoding::Float32),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleEncoding::Int16 => "int16",
            SampleEncoding::Float32 => "float32",
        }
    }
}

impl std::fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of an interleaved PCM stream
///
/// A frame holds one sample per channel. Any valid buffer of this stream is a
/// whole number of frames long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmStream {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Sample encoding
    pub encoding: SampleEncoding,
}

impl PcmStream {
    /// Create stream parameters, rejecting a zero sample rate or channel count
    pub fn new(sample_rate: u32, channels: u16, encoding: SampleEncoding) -> PcmResult<Self> {
        if sample_rate == 0 {
            return Err(PcmError::InvalidArgument(
                "sample rate must be positive".to_string(),
            ));
        }
        if channels == 0 {
            return Err(PcmError::InvalidArgument(
                "channel count must be positive".to_string(),
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
            encoding,
        })
    }

    /// Bytes in one interleaved frame
    pub fn bytes_per_frame(&self) -> usize {
        self.encoding.bytes_per_sample() * self.channels as usize
    }

    /// Whether `len` bytes form a whole number of frames
    pub fn is_frame_aligned(&self, len: usize) -> bool {
        let frame = self.bytes_per_frame();
        frame != 0 && len % frame == 0
    }

    /// Duration in seconds of `byte_len` bytes of this stream
    pub fn duration_secs(&self, byte_len: u64) -> f64 {
        time_duration(byte_len, self)
    }
}

impl std::fmt::Display for PcmStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz, {} ch, {}",
            self.sample_rate, self.channels, self.encoding
        )
    }
}

/// Playback time covered by `input_bytes` bytes of `stream`
///
/// `(input_bytes / bytes_per_frame) / sample_rate`, or 0 when there is no
/// input or the stream parameters are degenerate.
pub fn time_duration(input_bytes: u64, stream: &PcmStream) -> f64 {
    let bytes_per_frame = stream.bytes_per_frame() as u64;
    if input_bytes == 0 || bytes_per_frame == 0 || stream.sample_rate == 0 {
        return 0.0;
    }
    let frames = input_bytes / bytes_per_frame;
    frames as f64 / stream.sample_rate as f64
}
