pub mod database;

pub use database::{Database, PageRecord};

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use trawl_core::CrawlError;

/// Byte-blob sink. Keys are slash-separated paths of the form
/// `<host>/<path>[.ext]`. Implementations must be safe under concurrent
/// use from all processor tasks.
#[async_trait]
pub trait ByteStore: Send + Sync + 'static {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CrawlError>;
}

/// Filesystem-backed byte store rooted at one directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CrawlError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| CrawlError::Storage(format!("create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, CrawlError> {
        let relative = Path::new(key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(CrawlError::Storage(format!("key escapes store root: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ByteStore for FileStore {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CrawlError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CrawlError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, value)
            .await
            .map_err(|e| CrawlError::Storage(format!("write {}: {e}", path.display())))?;
        debug!(key = %key, bytes = value.len(), "stored");
        Ok(())
    }
}
