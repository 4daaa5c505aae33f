//! Default locations for voxsplit files

use std::path::PathBuf;

/// Config file name inside the root directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default root directory for PCM files and models
///
/// Returns: `~/voxsplit`
pub fn default_root_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxsplit")
}

/// Default config file path
///
/// Returns: `~/voxsplit/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_root_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_dir_name() {
        assert!(default_root_dir().ends_with("voxsplit"));
    }

    #[test]
    fn test_config_path_inside_root() {
        let path = default_config_path();
        assert!(path.ends_with(CONFIG_FILE_NAME));
        assert!(path.starts_with(default_root_dir()));
    }
}
