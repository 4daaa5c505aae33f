//! Separation job description and report

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pcm::PcmStream;

/// Extra output bytes per (sample × channel), one second of 16-bit audio
///
/// The engine emits look-ahead/tail samples past the ingested length; this
/// headroom keeps them from being truncated.
pub const TAIL_BYTES_PER_SAMPLE: usize = 2;

/// One input file to split into vocal and accompaniment outputs
#[derive(Debug, Clone, PartialEq)]
pub struct SeparationJob {
    /// Mixed input PCM
    pub input: PathBuf,
    /// Destination of the vocal stream
    pub vocal_output: PathBuf,
    /// Destination of the background music stream
    pub bgm_output: PathBuf,
    pub vocal_model: PathBuf,
    pub bgm_model: PathBuf,
    /// Parameters shared by input and outputs
    pub stream: PcmStream,
}

impl SeparationJob {
    pub fn new(
        input: impl Into<PathBuf>,
        vocal_output: impl Into<PathBuf>,
        bgm_output: impl Into<PathBuf>,
        vocal_model: impl Into<PathBuf>,
        bgm_model: impl Into<PathBuf>,
        stream: PcmStream,
    ) -> Self {
        Self {
            input: input.into(),
            vocal_output: vocal_output.into(),
            bgm_output: bgm_output.into(),
            vocal_model: vocal_model.into(),
            bgm_model: bgm_model.into(),
            stream,
        }
    }

    pub fn outputs(&self) -> [&Path; 2] {
        [&self.vocal_output, &self.bgm_output]
    }
}

/// Size of each output buffer for an engine that will produce `ingested` bytes
pub fn output_capacity(ingested: usize, stream: &PcmStream) -> usize {
    ingested + stream.sample_rate as usize * stream.channels as usize * TAIL_BYTES_PER_SAMPLE
}

/// How a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Both outputs written
    Completed,
    /// Input had no data; the engine was not invoked and no outputs written
    EmptyInput,
}

/// Result of a finished job
#[derive(Debug, Clone, PartialEq)]
pub struct SeparationReport {
    pub outcome: JobOutcome,
    /// Bytes read from the input file
    pub input_bytes: u64,
    /// Bytes written to each output file
    pub output_bytes: usize,
    /// Playback time of the input, in seconds
    pub duration_secs: f64,
    /// Wall-clock time the job took
    pub processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::SampleEncoding;

    #[test]
    fn test_capacity_adds_one_second_of_16bit_audio() {
        let stream = PcmStream::new(44100, 2, SampleEncoding::Int16).unwrap();
        assert_eq!(output_capacity(1000, &stream), 1000 + 176_400);
    }

    #[test]
    fn test_capacity_padding_ignores_encoding() {
        let int16 = PcmStream::new(48000, 1, SampleEncoding::Int16).unwrap();
        let float = PcmStream::new(48000, 1, SampleEncoding::Float32).unwrap();
        assert_eq!(output_capacity(0, &int16), output_capacity(0, &float));
    }
}
