//! Shared state file used as the mailbox between the bridge and the worker.
//!
//! Writes from inside the bridge are serialised by an async mutex. Reads take
//! no lock: the worker may be writing concurrently, so callers must cope with
//! stale or partial text.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("shared state file '{}' does not exist yet", path.display())]
    Unavailable { path: PathBuf },
    #[error("shared state file '{}' I/O failed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ChannelError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Storage behind the channel.
#[async_trait]
pub trait StateFileBackend: Send + Sync {
    fn location(&self) -> &Path;
    async fn write_text(&self, text: &str) -> io::Result<()>;
    async fn read_text(&self) -> io::Result<String>;
}

/// Plain file on disk, replaced with temp file + rename so the worker never
/// opens a half-written request.
#[derive(Debug, Clone)]
pub struct FileStateBackend {
    path: PathBuf,
}

impl FileStateBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateFileBackend for FileStateBackend {
    fn location(&self) -> &Path {
        self.path.as_path()
    }

    async fn write_text(&self, text: &str) -> io::Result<()> {
        let parent_dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent_dir).await?;
        let temp_name = format!(
            ".{}.tmp-{}",
            self.path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("gamestate"),
            std::process::id()
        );
        let temp_path = parent_dir.join(temp_name);
        tokio::fs::write(&temp_path, text).await?;
        tokio::fs::rename(&temp_path, &self.path).await
    }

    async fn read_text(&self) -> io::Result<String> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub struct SharedStateChannel {
    backend: Arc<dyn StateFileBackend>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for SharedStateChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStateChannel")
            .field("path", &self.backend.location())
            .finish()
    }
}

impl SharedStateChannel {
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::with_backend(Arc::new(FileStateBackend::new(path)))
    }

    pub fn with_backend(backend: Arc<dyn StateFileBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        self.backend.location()
    }

    /// Writes the full snapshot while holding the bridge-side write lock.
    /// The guard is released on every exit path, including failure.
    pub async fn write_exclusive(&self, text: &str) -> Result<(), ChannelError> {
        let _guard = self.write_lock.lock().await;
        self.backend
            .write_text(text)
            .await
            .map_err(|source| ChannelError::Io {
                path: self.path().to_path_buf(),
                source,
            })
    }

    /// Unlocked read. A missing file maps to [`ChannelError::Unavailable`].
    pub async fn read_best_effort(&self) -> Result<String, ChannelError> {
        match self.backend.read_text().await {
            Ok(text) => Ok(text),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Err(ChannelError::Unavailable {
                    path: self.path().to_path_buf(),
                })
            }
            Err(source) => Err(ChannelError::Io {
                path: self.path().to_path_buf(),
                source,
            }),
        }
    }
}
