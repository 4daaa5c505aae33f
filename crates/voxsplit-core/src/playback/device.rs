//! Output device abstraction
//!
//! The playback engine talks to audio hardware through two traits:
//!
//! - [`OutputBackend`]: allocates a device for a stream (shared, `Send + Sync`)
//! - [`OutputDevice`]: one allocated device, owned by the playback worker
//!
//! Devices are opened on the worker thread and never leave it, so
//! implementations may wrap handles that are not `Send` (a CPAL `Stream`
//! on some platforms).

use crate::pcm::PcmStream;

use super::cancel::CancellationToken;
use super::error::PlaybackResult;

/// Default device buffer size in frames
/// 1024 frames @ 44.1kHz = ~23ms
pub const DEFAULT_BUFFER_FRAMES: u32 = 1024;

/// Smallest buffer a device may report, in frames
pub const MIN_BUFFER_FRAMES: u32 = 64;

/// Largest buffer a device may report, in frames
pub const MAX_BUFFER_FRAMES: u32 = 16384;

/// Allocates output devices
pub trait OutputBackend: Send + Sync {
    /// Allocate a device able to play `stream`
    ///
    /// Fails with `PlaybackError::DeviceUnavailable` when no device accepts
    /// the parameters. The returned device starts paused.
    fn open(&self, stream: &PcmStream) -> PlaybackResult<Box<dyn OutputDevice>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// An allocated output device
///
/// Dropping the device releases it.
pub trait OutputDevice {
    /// Minimum buffer size in bytes, always a whole number of frames
    fn min_buffer_size(&self) -> usize;

    /// Write raw 16-bit little-endian PCM
    ///
    /// Returns the number of bytes accepted. Fewer than `data.len()` only
    /// when `cancel` fired while waiting for the device.
    fn write_bytes(&mut self, data: &[u8], cancel: &CancellationToken) -> PlaybackResult<usize>;

    /// Write float samples, blocking until the device has accepted them all
    ///
    /// Returns the number of samples accepted. Fewer than `samples.len()`
    /// only when `cancel` fired while waiting for the device.
    fn write_f32(&mut self, samples: &[f32], cancel: &CancellationToken) -> PlaybackResult<usize>;

    /// Start consuming written data
    fn play(&mut self) -> PlaybackResult<()>;

    /// Stop consuming; called once before the device is dropped
    fn stop(&mut self) {}
}

/// Device buffer size in bytes for `frames` frames of `stream`
pub fn min_buffer_size_for(stream: &PcmStream, frames: u32) -> usize {
    frames.clamp(MIN_BUFFER_FRAMES, MAX_BUFFER_FRAMES) as usize * stream.bytes_per_frame()
}
