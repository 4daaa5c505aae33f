//! Restartable sequential reader over a raw PCM file

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::error::{PcmError, PcmResult};

/// Sequential reader over a headerless PCM file
///
/// The playback loop reads buffer-sized chunks and calls [`rewind`] on EOF to
/// play the file on repeat. The file handle is closed when the reader is
/// dropped, on every exit path.
///
/// [`rewind`]: PcmFileReader::rewind
pub struct PcmFileReader {
    file: File,
    path: PathBuf,
    len: u64,
    position: u64,
}

impl PcmFileReader {
    /// Open `path` for reading
    pub fn open(path: impl AsRef<Path>) -> PcmResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PcmError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| PcmError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(PcmError::NotFound {
                path: path.to_path_buf(),
                source: std::io::Error::new(ErrorKind::InvalidInput, "path is a directory"),
            });
        }

        log::debug!("Opened PCM file {:?} ({} bytes)", path, metadata.len());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            len: metadata.len(),
            position: 0,
        })
    }

    /// Fill as much of `buf` as the file has left
    ///
    /// Short reads from the OS are retried until `buf` is full or EOF is hit.
    /// Returns 0 at end of file.
    pub fn read_into(&mut self, buf: &mut [u8]) -> PcmResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(PcmError::Io(e)),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    /// Reposition to the start of the file
    pub fn rewind(&mut self) -> PcmResult<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.position = 0;
        Ok(())
    }

    /// Read the remainder of the file into memory
    pub fn read_to_end(&mut self) -> PcmResult<Vec<u8>> {
        let mut data = Vec::with_capacity(self.len.saturating_sub(self.position) as usize);
        self.file.read_to_end(&mut data)?;
        self.position += data.len() as u64;
        Ok(data)
    }

    /// File length in bytes at open time
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current read offset
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
