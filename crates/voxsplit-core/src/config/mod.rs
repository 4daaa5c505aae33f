//! Application configuration
//!
//! - Generic YAML config loading/saving
//! - Default root directory and file layout
//! - [`AppContext`]: resolved paths and stream parameters handed to the
//!   playback and separation components
//!
//! # Usage
//!
//! ```ignore
//! use voxsplit_core::config::{load_config, default_config_path, AppConfig, AppContext};
//!
//! let config: AppConfig = load_config(&default_config_path())?;
//! let context = AppContext::new(config)?;
//! context.prepare()?;
//! let job = context.separation_job();
//! ```

mod app;
mod io;
mod paths;

pub use app::{AppConfig, AppContext, PlaybackSource};
pub use io::{load_config, save_config};
pub use paths::{default_config_path, default_root_dir, CONFIG_FILE_NAME};
