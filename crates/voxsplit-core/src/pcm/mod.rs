//! Raw PCM handling
//!
//! Everything that touches headerless PCM data lives here:
//!
//! - [`format`]: stream parameters (`PcmStream`, `SampleEncoding`)
//! - [`convert`]: byte buffer <-> typed sample conversion, always little-endian
//! - [`reader`]: a restartable sequential reader used by the playback loop
//!
//! Files carry no header. Sample rate, channel count and encoding are supplied
//! out of band by the caller (config or command line).

pub mod convert;
mod error;
pub mod format;
pub mod reader;

pub use error::{PcmError, PcmResult};
pub use format::{time_duration, PcmStream, SampleEncoding};
pub use reader::PcmFileReader;
