//! Vocal / accompaniment separation
//!
//! Splits a mixed PCM file into a vocal stream and a background music stream
//! using an external neural engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 SeparationOrchestrator                  │
//! │  • One job at a time (others rejected)                  │
//! │  • Loads input, sizes output buffers                    │
//! │  • Replaces output files atomically                     │
//! └─────────────────────────────────────────────────────────┘
//!                              │ EngineHandle (released on drop)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │              SeparationEngine (trait)                   │
//! │  • construct / add_frames / separate / release          │
//! └─────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                    ┌─────────────────┐
//!                    │  NativeEngine   │
//!                    │  (libloading)   │
//!                    └─────────────────┘
//! ```

mod engine;
mod error;
mod handle;
mod job;
mod native;
mod orchestrator;
mod output;

pub use engine::{EngineParams, SeparationEngine};
pub use error::{Result, SeparationError};
pub use handle::EngineHandle;
pub use job::{output_capacity, JobOutcome, SeparationJob, SeparationReport, TAIL_BYTES_PER_SAMPLE};
pub use native::{
    LibraryLocator, NativeEngine, NativeHandle, INVALID_OBJECT, INVALID_RESULT, LIBRARY_NAME,
};
pub use orchestrator::{SeparationOrchestrator, SeparationTask};
pub use output::replace_files;
