//! Separation engine contract
//!
//! The neural separation engine is an opaque collaborator. The orchestrator
//! only needs four operations from it:
//!
//! ```text
//! construct(models, stream) ──► handle
//! add_frames(handle, input)  ──► per-output byte count | negative status
//! separate(handle, a, b)     ──► valid bytes in a and b | negative status
//! release(handle)
//! ```
//!
//! Production builds use [`NativeEngine`](super::NativeEngine); tests inject
//! deterministic fakes.

use std::path::Path;

use crate::pcm::PcmStream;

/// Parameters bound to an engine handle at construction
#[derive(Debug, Clone, Copy)]
pub struct EngineParams<'a> {
    pub vocal_model: &'a Path,
    pub bgm_model: &'a Path,
    pub stream: PcmStream,
}

/// Trait for vocal/accompaniment separation engines
///
/// Status codes follow the native convention: negative is failure.
/// `release` takes the handle by value, so a handle cannot be used or
/// released again afterwards. Use [`EngineHandle`](super::EngineHandle)
/// to have it released on every path.
pub trait SeparationEngine: Send + Sync + 'static {
    /// Loaded model state inside the engine
    type Handle: Send;

    /// Load models for `params`; `None` if the engine could not be built
    fn construct(&self, params: &EngineParams<'_>) -> Option<Self::Handle>;

    /// Ingest the whole input
    ///
    /// Returns the number of bytes each output will hold, or a negative
    /// status.
    fn add_frames(&self, handle: &mut Self::Handle, input: &[u8]) -> i32;

    /// Produce the two separated streams
    ///
    /// Returns the number of valid bytes written to each buffer, or a
    /// negative status.
    fn separate(&self, handle: &mut Self::Handle, vocal: &mut [u8], bgm: &mut [u8]) -> i32;

    /// Free the handle's resources
    fn release(&self, handle: Self::Handle);

    /// Engine name for logging
    fn name(&self) -> &'static str;
}
