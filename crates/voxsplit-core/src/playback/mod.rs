//! Streaming PCM playback
//!
//! Plays a raw PCM file on repeat through an audio output device.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  start()/stop()   ┌──────────────────────────┐
//! │  Caller thread   │──────────────────►│ StreamingPlaybackEngine  │
//! └──────────────────┘                   └────────────┬─────────────┘
//!                                                     │ spawns, cancels, joins
//!                                                     ▼
//!                                        ┌──────────────────────────┐
//!                                        │  Playback worker thread  │
//!                                        │  PcmFileReader ──► chunk │
//!                                        │  chunk ──► OutputDevice  │
//!                                        └──────────────────────────┘
//! ```
//!
//! The worker owns the reader and the device. The caller shares only a
//! [`CancellationToken`] with it.
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use voxsplit_core::playback::{CpalBackend, StreamingPlaybackEngine};
//!
//! let mut engine = StreamingPlaybackEngine::new(Arc::new(CpalBackend::new()));
//! engine.start("input.pcm", stream)?;
//! // ...
//! let summary = engine.stop()?;
//! ```

mod cancel;
mod cpal_output;
mod device;
mod engine;
mod error;

pub use cancel::CancellationToken;
pub use cpal_output::{CpalBackend, CpalOutputDevice};
pub use device::{
    min_buffer_size_for, OutputBackend, OutputDevice, DEFAULT_BUFFER_FRAMES, MAX_BUFFER_FRAMES,
    MIN_BUFFER_FRAMES,
};
pub use engine::{PlaybackState, PlaybackSummary, StreamingPlaybackEngine};
pub use error::{PlaybackError, PlaybackResult};
