//! Shared append-only log store
//!
//! All connection workers append received chunks to one file and read it
//! back in full to echo it to their client. Appends are serialized by an
//! explicit async mutex so that concurrent workers may interleave records
//! but can never corrupt each other's chunks. No ordering is guaranteed
//! between workers beyond that.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

/// File mode for the log store: owner read/write, group/other read
#[cfg(unix)]
const LOG_STORE_MODE: u32 = 0o644;

/// Handle to the shared append-only log store.
///
/// Cheap to clone; all clones share the same append lock.
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
    append_lock: Arc<Mutex<()>>,
}

impl LogStore {
    /// Create a handle for the log store at `path`.
    ///
    /// The file itself is created lazily on the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the store for appending, creating it if absent.
    pub async fn open_appender(&self) -> io::Result<LogAppender> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        options.mode(LOG_STORE_MODE);
        let file = options.open(&self.path).await?;
        Ok(LogAppender {
            file,
            lock: Arc::clone(&self.append_lock),
        })
    }

    /// Open the store for a sequential full read.
    pub async fn open_reader(&self) -> io::Result<File> {
        File::open(&self.path).await
    }

    /// Read the entire store into memory. Intended for tests and small
    /// stores; the server streams via [`LogStore::open_reader`].
    pub async fn read_to_vec(&self) -> io::Result<Vec<u8>> {
        let mut reader = self.open_reader().await?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).await?;
        Ok(contents)
    }

    /// Delete the underlying file.
    pub async fn remove(&self) -> io::Result<()> {
        tokio::fs::remove_file(&self.path).await?;
        debug!("Removed log store {}", self.path.display());
        Ok(())
    }
}

/// An open append handle to the log store.
///
/// Each `append` call writes one chunk atomically with respect to all
/// other appenders sharing the same [`LogStore`].
#[derive(Debug)]
pub struct LogAppender {
    file: File,
    lock: Arc<Mutex<()>>,
}

impl LogAppender {
    /// Append one chunk verbatim and flush it to the file.
    pub async fn append(&mut self, chunk: &[u8]) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        self.file.write_all(chunk).await?;
        self.file.flush().await
    }
}
