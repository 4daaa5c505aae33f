//! Application configuration and context

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pcm::{PcmResult, PcmStream, SampleEncoding};
use crate::playback::CpalBackend;
use crate::separation::{LibraryLocator, SeparationJob};

use super::paths::default_root_dir;

/// Which file the player should loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackSource {
    /// The mixed input track
    #[default]
    Input,
    /// Separated vocals
    Vocal,
    /// Separated background music
    Bgm,
}

impl PlaybackSource {
    pub const ALL: [PlaybackSource; 3] = [
        PlaybackSource::Input,
        PlaybackSource::Vocal,
        PlaybackSource::Bgm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlaybackSource::Input => "input",
            PlaybackSource::Vocal => "vocal",
            PlaybackSource::Bgm => "bgm",
        }
    }
}

/// Persisted application settings
///
/// File entries are relative to `root_dir` unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding PCM files and models
    pub root_dir: PathBuf,
    pub input_file: PathBuf,
    pub vocal_file: PathBuf,
    pub bgm_file: PathBuf,
    pub vocal_model: PathBuf,
    pub bgm_model: PathBuf,
    /// Sample rate of every PCM file, in Hz
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
    /// Requested device buffer in frames (device default range applies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_frames: Option<u32>,
    /// Output device name; system default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
    /// Directory containing the native separation library
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            input_file: PathBuf::from("input.pcm"),
            vocal_file: PathBuf::from("vocal.pcm"),
            bgm_file: PathBuf::from("bgm.pcm"),
            vocal_model: PathBuf::from("vocal.mnn"),
            bgm_model: PathBuf::from("accompaniment.mnn"),
            sample_rate: 44100,
            channels: 2,
            encoding: SampleEncoding::Float32,
            buffer_frames: None,
            output_device: None,
            library_path: None,
        }
    }
}

/// Resolved configuration passed to components that need paths or devices
#[derive(Debug, Clone)]
pub struct AppContext {
    config: AppConfig,
    stream: PcmStream,
}

impl AppContext {
    /// Validate `config` and build the context
    pub fn new(config: AppConfig) -> PcmResult<Self> {
        let stream = PcmStream::new(config.sample_rate, config.channels, config.encoding)?;
        Ok(Self { config, stream })
    }

    /// Create the root directory if needed
    pub fn prepare(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config.root_dir)?;
        log::debug!("Root directory ready: {:?}", self.config.root_dir);
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stream(&self) -> PcmStream {
        self.stream
    }

    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        self.config.root_dir.join(file)
    }

    pub fn input_path(&self) -> PathBuf {
        self.resolve(&self.config.input_file)
    }

    pub fn vocal_output_path(&self) -> PathBuf {
        self.resolve(&self.config.vocal_file)
    }

    pub fn bgm_output_path(&self) -> PathBuf {
        self.resolve(&self.config.bgm_file)
    }

    pub fn vocal_model_path(&self) -> PathBuf {
        self.resolve(&self.config.vocal_model)
    }

    pub fn bgm_model_path(&self) -> PathBuf {
        self.resolve(&self.config.bgm_model)
    }

    /// File played for `source`
    pub fn source_path(&self, source: PlaybackSource) -> PathBuf {
        match source {
            PlaybackSource::Input => self.input_path(),
            PlaybackSource::Vocal => self.vocal_output_path(),
            PlaybackSource::Bgm => self.bgm_output_path(),
        }
    }

    /// Job separating the configured input into the configured outputs
    pub fn separation_job(&self) -> SeparationJob {
        SeparationJob::new(
            self.input_path(),
            self.vocal_output_path(),
            self.bgm_output_path(),
            self.vocal_model_path(),
            self.bgm_model_path(),
            self.stream,
        )
    }

    /// Output backend for the configured device
    pub fn playback_backend(&self) -> CpalBackend {
        let mut backend = CpalBackend::new();
        if let Some(name) = &self.config.output_device {
            backend = backend.with_device(name.clone());
        }
        if let Some(frames) = self.config.buffer_frames {
            backend = backend.with_buffer_frames(frames);
        }
        backend
    }

    /// Where to look for the native separation library
    pub fn library_locator(&self) -> LibraryLocator {
        match &self.config.library_path {
            Some(dir) => LibraryLocator::with_search_path(dir),
            None => LibraryLocator::system(),
        }
    }
}
