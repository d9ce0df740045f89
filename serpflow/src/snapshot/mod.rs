//! HTML snapshot retention.
//!
//! When enabled, the raw HTML of every extracted page is written to a store
//! and the record points at it through `htmlSnapshotUrl`.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

use crate::core::SearchQuery;
use crate::errors::{SerpError, SerpResult};

/// Stores page HTML and returns a URL for it.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persists `html` for `query` and returns where it can be read back.
    async fn store(&self, query: &SearchQuery, html: &str) -> SerpResult<String>;
}

/// Stable key for a request URL.
#[must_use]
pub fn snapshot_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Writes snapshots as `<dir>/<sha256(url)>.html`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a store rooted at `dir`. The directory is created on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The snapshot directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a query's snapshot is written to.
    #[must_use]
    pub fn path_for(&self, query: &SearchQuery) -> PathBuf {
        self.dir.join(format!("{}.html", snapshot_key(query.url())))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn store(&self, query: &SearchQuery, html: &str) -> SerpResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(query);
        tokio::fs::write(&path, html).await?;

        let absolute = tokio::fs::canonicalize(&path).await?;
        let url = Url::from_file_path(&absolute).map_err(|()| {
            SerpError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot express {} as a file URL", absolute.display()),
            ))
        })?;
        tracing::debug!(path = %absolute.display(), "Stored HTML snapshot");
        Ok(url.to_string())
    }
}
