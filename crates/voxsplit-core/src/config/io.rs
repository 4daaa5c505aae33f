//! YAML config file loading and saving
//!
//! PCM files carry no header, so the stream settings in the config are the
//! only record of how to interpret them. A config that exists but cannot be
//! parsed is an error rather than a silent fallback to defaults.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Load configuration from a YAML file
///
/// A missing file yields the default config. Unreadable or malformed files
/// are errors; fields absent from the file take their defaults when `T`
/// uses `#[serde(default)]`.
pub fn load_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(T::default());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read config {:?}", path)),
    };

    let config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Invalid config {:?}", path))?;
    log::debug!("Loaded config from {:?}", path);
    Ok(config)
}

/// Save configuration to a YAML file
///
/// Parent directories are created. The file is written to a temporary
/// sibling and renamed over `path`, so a reader never sees half a config.
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create config directory {:?}", dir))?;

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;

    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to stage config in {:?}", dir))?;
    staged.write_all(yaml.as_bytes())?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .with_context(|| format!("Failed to write config {:?}", path))?;

    log::info!("Saved config to {:?}", path);
    Ok(())
}
