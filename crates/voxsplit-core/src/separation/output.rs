//! Atomic replacement of output files
//!
//! Each output is written in full to a temporary file next to its
//! destination. Only once every temporary file is complete are they renamed
//! over the destinations, so a failed job never leaves a half-written output
//! at the destination path.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::error::{Result, SeparationError};

fn staging_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn stage(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let write_error = |source| SeparationError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut file = NamedTempFile::new_in(staging_dir(path)).map_err(write_error)?;
    file.write_all(data).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    Ok(file)
}

/// Replace each `(path, data)` destination with `data`
pub fn replace_files(outputs: &[(&Path, &[u8])]) -> Result<()> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (path, data) in outputs {
        // Dropping already staged files on error deletes them
        staged.push((*path, stage(path, data)?));
    }

    for (path, file) in staged {
        file.persist(path).map_err(|e| SeparationError::OutputWrite {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        log::debug!("Wrote output {:?}", path);
    }
    Ok(())
}
