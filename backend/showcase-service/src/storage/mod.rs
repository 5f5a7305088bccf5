/// Blob storage for raw uploads and rendered assets
///
/// Keys look like `{namespace}/{name}`. The store has no transactional link
/// to the database: a blob saved right before a failed insert stays behind
/// as an orphan.
pub mod local;

pub use local::LocalBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Accepted upload bytes
    Uploads,
    /// Rendered, publishable assets
    Processed,
    /// Pipeline scratch space
    Temp,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploads => "uploads",
            Self::Processed => "processed",
            Self::Temp => "temp",
        }
    }

    pub fn all() -> [Namespace; 3] {
        [Self::Uploads, Self::Processed, Self::Temp]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid blob key or name: {0:?}")]
    InvalidKey(String),
    #[error("blob io failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` as `name` inside `namespace` and return the key.
    async fn save(&self, bytes: Bytes, name: &str, namespace: Namespace)
        -> Result<String, StorageError>;

    /// Copy a local file into the store and return the key.
    async fn save_file(
        &self,
        source: &Path,
        name: &str,
        namespace: Namespace,
    ) -> Result<String, StorageError>;

    /// Remove a blob. `false` when it was absent or could not be removed.
    async fn delete(&self, key: &str) -> bool;

    /// Public locator for a key.
    fn resolve(&self, key: &str) -> String;

    /// Filesystem path for a key, for tools that read files directly.
    fn path_of(&self, key: &str) -> Result<PathBuf, StorageError>;
}

/// Reject names that could escape their namespace.
pub(crate) fn validate_component(name: &str) -> Result<(), StorageError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(StorageError::InvalidKey(name.to_string()));
    }
    Ok(())
}

/// Split a key into its namespace and name, validating both.
pub(crate) fn split_key(key: &str) -> Result<(Namespace, &str), StorageError> {
    let (ns, name) = key
        .split_once('/')
        .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
    let namespace = Namespace::all()
        .into_iter()
        .find(|candidate| candidate.as_str() == ns)
        .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
    validate_component(name)?;
    Ok((namespace, name))
}
