//! CPAL output backend
//!
//! CPAL pulls audio through a callback, while the playback loop pushes
//! chunks. A lock-free SPSC ring buffer sits between the two:
//!
//! ```text
//! ┌──────────────────┐  write_f32()   ┌─────────────────────┐  pop()  ┌──────────────────┐
//! │ Playback worker  │───────────────►│  f32 ring buffer    │────────►│ CPAL audio thread│
//! │ (blocks on full) │                │ (2 device buffers)  │         │ (silence on empty)│
//! └──────────────────┘                └─────────────────────┘         └──────────────────┘
//! ```
//!
//! The ring holds two device buffers, so the first chunk always fits before
//! the stream is started. After that the worker waits on the cancellation
//! token whenever the ring is full; the device consuming samples is the only
//! source of backpressure.
//!
//! Devices without an f32 config at the stream's rate and channel count are
//! driven as i16; the callback converts on the way out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, FromSample, Sample, SampleFormat, SizedSample, Stream,
    StreamConfig, SupportedBufferSize, SupportedStreamConfigRange,
};

use crate::pcm::{convert, PcmStream, SampleEncoding};

use super::cancel::CancellationToken;
use super::device::{min_buffer_size_for, OutputBackend, OutputDevice, DEFAULT_BUFFER_FRAMES};
use super::error::{PlaybackError, PlaybackResult};

/// How long a blocked writer waits before re-checking the ring
const WRITE_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Allocates CPAL output streams
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    /// Output device name; the host default when `None`
    device_name: Option<String>,
    /// Requested device buffer in frames
    buffer_frames: Option<u32>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_frames = Some(frames);
        self
    }

    fn find_device(&self) -> PlaybackResult<cpal::Device> {
        let host = cpal::default_host();
        match &self.device_name {
            Some(name) => host
                .output_devices()
                .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?
                .find(|d: &cpal::Device| d.name().ok().as_ref() == Some(name))
                .ok_or_else(|| {
                    PlaybackError::DeviceUnavailable(format!("output device not found: {}", name))
                }),
            None => host.default_output_device().ok_or_else(|| {
                PlaybackError::DeviceUnavailable("no default output device".to_string())
            }),
        }
    }

    /// Pick the device buffer size, honouring the device's supported range
    fn negotiate_buffer(&self, supported: &SupportedBufferSize) -> (u32, CpalBufferSize) {
        let requested = self.buffer_frames.unwrap_or(DEFAULT_BUFFER_FRAMES);
        match supported {
            SupportedBufferSize::Range { min, max } if *min <= *max => {
                let frames = requested.clamp(*min, *max);
                (frames, CpalBufferSize::Fixed(frames))
            }
            _ => (requested, CpalBufferSize::Default),
        }
    }
}

impl OutputBackend for CpalBackend {
    fn open(&self, stream: &PcmStream) -> PlaybackResult<Box<dyn OutputDevice>> {
        let device = self.find_device()?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let configs: Vec<SupportedStreamConfigRange> = device
            .supported_output_configs()
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?
            .collect();

        let supported = pick_output_config(&configs, stream).ok_or_else(|| {
            let offered: Vec<String> = configs
                .iter()
                .map(|c| {
                    format!(
                        "{:?} {}ch {}-{}Hz",
                        c.sample_format(),
                        c.channels(),
                        c.min_sample_rate().0,
                        c.max_sample_rate().0
                    )
                })
                .collect();
            PlaybackError::DeviceUnavailable(format!(
                "{} does not support {} (offers: {})",
                device_name,
                stream,
                offered.join(", ")
            ))
        })?;

        let (buffer_frames, cpal_buffer) = self.negotiate_buffer(supported.buffer_size());
        let config = StreamConfig {
            channels: stream.channels,
            sample_rate: cpal::SampleRate(stream.sample_rate),
            buffer_size: cpal_buffer,
        };

        let min_buffer_size = min_buffer_size_for(stream, buffer_frames);
        let ring_capacity = (min_buffer_size / stream.bytes_per_frame()) * stream.channels as usize * 2;
        let (producer, consumer) = rtrb::RingBuffer::<f32>::new(ring_capacity);

        let stream_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let cpal_stream = match supported.sample_format() {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, consumer, stream_error.clone()),
            _ => build_stream::<f32>(&device, &config, consumer, stream_error.clone()),
        }?;

        // Some hosts start streams on creation; playback begins on first write
        if let Err(e) = cpal_stream.pause() {
            log::debug!("Could not pause new output stream: {}", e);
        }

        log::info!(
            "Output device {}: {} as {:?}, {} frames (~{:.1}ms), min buffer {} bytes",
            device_name,
            stream,
            supported.sample_format(),
            buffer_frames,
            buffer_frames as f32 / stream.sample_rate as f32 * 1000.0,
            min_buffer_size
        );

        Ok(Box::new(CpalOutputDevice {
            stream: cpal_stream,
            producer,
            encoding: stream.encoding,
            min_buffer_size,
            stream_error,
        }))
    }

    fn name(&self) -> &'static str {
        "cpal"
    }
}

/// Find an output config for `stream`, preferring f32 over i16
///
/// Channel count and sample rate must match exactly; the PCM data is never
/// remixed or resampled.
fn pick_output_config(
    configs: &[SupportedStreamConfigRange],
    stream: &PcmStream,
) -> Option<SupportedStreamConfigRange> {
    let matches = |format: SampleFormat| {
        configs.iter().find(|c| {
            c.sample_format() == format
                && c.channels() == stream.channels
                && stream.sample_rate >= c.min_sample_rate().0
                && stream.sample_rate <= c.max_sample_rate().0
        })
    };
    matches(SampleFormat::F32)
        .or_else(|| matches(SampleFormat::I16))
        .cloned()
}

/// Build a stream draining `consumer` in the device's sample format
fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: rtrb::Consumer<f32>,
    stream_error: Arc<Mutex<Option<String>>>,
) -> PlaybackResult<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                for sample in data.iter_mut() {
                    // Underrun plays silence
                    *sample = T::from_sample(consumer.pop().unwrap_or(0.0));
                }
            },
            move |err| {
                log::error!("Output stream error: {}", err);
                if let Ok(mut slot) = stream_error.lock() {
                    *slot = Some(err.to_string());
                }
            },
            None,
        )
        .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))
}

/// Fail if the CPAL error callback has reported a stream error
fn check_stream(stream_error: &Mutex<Option<String>>) -> PlaybackResult<()> {
    let slot = stream_error.lock().unwrap_or_else(|e| e.into_inner());
    match slot.as_ref() {
        Some(msg) => Err(PlaybackError::StreamError(msg.clone())),
        None => Ok(()),
    }
}

/// Push `samples` into the ring, waiting on `cancel` while it is full
///
/// Returns how many samples were queued; fewer than `samples.len()` only
/// when cancelled.
fn push_blocking(
    producer: &mut rtrb::Producer<f32>,
    samples: &[f32],
    cancel: &CancellationToken,
    stream_error: &Mutex<Option<String>>,
) -> PlaybackResult<usize> {
    check_stream(stream_error)?;
    let mut written = 0;
    for &sample in samples {
        while producer.push(sample).is_err() {
            if cancel.wait_timeout(WRITE_POLL_INTERVAL) {
                return Ok(written);
            }
            check_stream(stream_error)?;
        }
        written += 1;
    }
    Ok(written)
}

/// An open CPAL output stream fed through a ring buffer
pub struct CpalOutputDevice {
    stream: Stream,
    producer: rtrb::Producer<f32>,
    encoding: SampleEncoding,
    min_buffer_size: usize,
    stream_error: Arc<Mutex<Option<String>>>,
}

impl OutputDevice for CpalOutputDevice {
    fn min_buffer_size(&self) -> usize {
        self.min_buffer_size
    }

    fn write_bytes(&mut self, data: &[u8], cancel: &CancellationToken) -> PlaybackResult<usize> {
        if self.encoding != SampleEncoding::Int16 {
            return Err(PlaybackError::InvalidArgument(format!(
                "raw byte writes need an int16 stream, device is {}",
                self.encoding
            )));
        }
        let samples = convert::bytes_to_i16(data, 0, data.len())?;
        let written = self.write_f32(&convert::i16_to_f32(&samples), cancel)?;
        Ok(written * 2)
    }

    fn write_f32(&mut self, samples: &[f32], cancel: &CancellationToken) -> PlaybackResult<usize> {
        push_blocking(&mut self.producer, samples, cancel, &self.stream_error)
    }

    fn play(&mut self) -> PlaybackResult<()> {
        self.stream
            .play()
            .map_err(|e| PlaybackError::StreamError(e.to_string()))
    }

    fn stop(&mut self) {
        if let Err(e) = self.stream.pause() {
            log::debug!("Could not pause output stream: {}", e);
        }
    }
}
