//! Atomic file replacement.
//!
//! Every file this workspace writes goes through [`write_atomic`] or
//! [`AtomicFile`]: content lands in a temporary file in the destination
//! directory, is flushed and fsynced, then renamed over the target. A
//! reader never observes a half-written document.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Write `bytes` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = AtomicFile::create(path)?;
    file.write_all(bytes)?;
    file.commit()
}

/// A buffered writer that replaces its target only on [`commit`](Self::commit).
///
/// Dropping without committing deletes the temporary file and leaves the
/// target untouched.
pub struct AtomicFile {
    target: PathBuf,
    inner: BufWriter<NamedTempFile>,
}

impl AtomicFile {
    /// Open a temporary file beside `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let tmp = NamedTempFile::new_in(&dir)?;
        Ok(Self {
            target: path.to_path_buf(),
            inner: BufWriter::new(tmp),
        })
    }

    /// Destination path.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush, fsync and rename into place.
    pub fn commit(self) -> io::Result<()> {
        let tmp = self.inner.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        let persisted: File = tmp.persist(&self.target).map_err(|e| e.error)?;
        drop(persisted);
        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
