//! Destination for retrieved content.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Appends retrieved content to the output file, or discards it.
///
/// Writes are serialized; `close` flushes and releases the file and makes
/// later writes fail.
#[derive(Debug)]
pub struct ContentSink {
    path: Option<PathBuf>,
    writer: Mutex<Option<BufWriter<File>>>,
    discard: bool,
}

impl ContentSink {
    /// Open `path` for writing (truncating it), or discard when `None`.
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        let writer = match path {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };
        Ok(Self {
            discard: writer.is_none(),
            path: path.map(Path::to_path_buf),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write(&self, content: &[u8]) -> io::Result<()> {
        if self.discard {
            return Ok(());
        }
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(writer) => writer.write_all(content),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed")),
        }
    }

    /// Flush and release the output file. Idempotent.
    pub fn close(&self) -> io::Result<()> {
        match self.lock().take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<BufWriter<File>>> {
        // A panicking writer leaves the buffer as-is; keep using it.
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}
