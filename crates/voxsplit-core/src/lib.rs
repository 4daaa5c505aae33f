//! Voxsplit Core - PCM playback and vocal/accompaniment separation

pub mod config;
pub mod pcm;
pub mod playback;
pub mod separation;

pub use pcm::{PcmStream, SampleEncoding};
