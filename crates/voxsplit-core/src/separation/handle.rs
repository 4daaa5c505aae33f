//! Scoped engine handle

use super::engine::{EngineParams, SeparationEngine};
use super::error::{Result, SeparationError};

/// Owns a constructed engine handle and releases it on drop
///
/// Every exit from a job (success, early return, error, panic unwinding)
/// drops the guard, so `release` runs exactly once.
pub struct EngineHandle<'e, E: SeparationEngine> {
    engine: &'e E,
    handle: Option<E::Handle>,
}

impl<'e, E: SeparationEngine> EngineHandle<'e, E> {
    /// Construct an engine handle for `params`
    pub fn acquire(engine: &'e E, params: &EngineParams<'_>) -> Result<Self> {
        let handle = engine.construct(params).ok_or_else(|| {
            SeparationError::EngineUnavailable(format!(
                "{} could not load models {:?} / {:?}",
                engine.name(),
                params.vocal_model,
                params.bgm_model
            ))
        })?;
        log::debug!("{} engine handle constructed for {}", engine.name(), params.stream);
        Ok(Self {
            engine,
            handle: Some(handle),
        })
    }

    fn handle_mut(&mut self) -> Result<&mut E::Handle> {
        self.handle
            .as_mut()
            .ok_or_else(|| SeparationError::EngineUnavailable("handle already released".to_string()))
    }

    /// Ingest `input`, returning the per-output byte count
    pub fn add_frames(&mut self, input: &[u8]) -> Result<usize> {
        let engine = self.engine;
        let status = engine.add_frames(self.handle_mut()?, input);
        usize::try_from(status).map_err(|_| SeparationError::EngineIngestFailed(status))
    }

    /// Separate into `vocal` and `bgm`, returning the valid byte count
    ///
    /// A count larger than either buffer is rejected.
    pub fn separate(&mut self, vocal: &mut [u8], bgm: &mut [u8]) -> Result<usize> {
        let engine = self.engine;
        let status = engine.separate(self.handle_mut()?, vocal, bgm);
        let valid =
            usize::try_from(status).map_err(|_| SeparationError::EngineSeparationFailed(status))?;
        let capacity = vocal.len().min(bgm.len());
        if valid > capacity {
            return Err(SeparationError::EngineOutputOverrun {
                reported: valid,
                capacity,
            });
        }
        Ok(valid)
    }

    /// Release now instead of at scope end
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine.release(handle);
            log::debug!("{} engine handle released", self.engine.name());
        }
    }
}

impl<E: SeparationEngine> Drop for EngineHandle<'_, E> {
    fn drop(&mut self) {
        self.release_inner();
    }
}
