use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{split_key, validate_component, BlobStore, Namespace, StorageError};

/// Prefix under which the HTTP layer serves stored files
pub const PUBLIC_PREFIX: &str = "/storage";

/// Blob store backed by a directory tree:
/// `{root}/uploads`, `{root}/processed`, `{root}/temp`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create the namespace directories under `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        for namespace in Namespace::all() {
            let dir = root.join(namespace.as_str());
            fs::create_dir_all(&dir).await.map_err(|source| StorageError::Io {
                key: namespace.as_str().to_string(),
                source,
            })?;
        }
        debug!(root = %root.display(), "Local blob store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_for(namespace: Namespace, name: &str) -> String {
        format!("{}/{}", namespace.as_str(), name)
    }

    /// Sibling path used while a write is in flight, so readers never see a
    /// half-written blob under its final name.
    fn staging_path(&self, namespace: Namespace) -> PathBuf {
        self.root
            .join(namespace.as_str())
            .join(format!(".partial-{}", Uuid::new_v4()))
    }

    async fn publish_staged(&self, staged: &Path, key: &str) -> Result<String, StorageError> {
        let dest = self.path_of(key)?;
        if let Err(source) = fs::rename(staged, &dest).await {
            let _ = fs::remove_file(staged).await;
            return Err(StorageError::Io {
                key: key.to_string(),
                source,
            });
        }
        Ok(key.to_string())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(
        &self,
        bytes: Bytes,
        name: &str,
        namespace: Namespace,
    ) -> Result<String, StorageError> {
        validate_component(name)?;
        let key = Self::key_for(namespace, name);
        let staged = self.staging_path(namespace);

        if let Err(source) = fs::write(&staged, &bytes).await {
            let _ = fs::remove_file(&staged).await;
            return Err(StorageError::Io { key, source });
        }
        debug!(key = %key, bytes = bytes.len(), "Saved blob");
        self.publish_staged(&staged, &key).await
    }

    async fn save_file(
        &self,
        source: &Path,
        name: &str,
        namespace: Namespace,
    ) -> Result<String, StorageError> {
        validate_component(name)?;
        let key = Self::key_for(namespace, name);
        let staged = self.staging_path(namespace);

        if let Err(err) = fs::copy(source, &staged).await {
            let _ = fs::remove_file(&staged).await;
            return Err(StorageError::Io { key, source: err });
        }
        debug!(key = %key, from = %source.display(), "Copied file into blob store");
        self.publish_staged(&staged, &key).await
    }

    async fn delete(&self, key: &str) -> bool {
        let path = match self.path_of(key) {
            Ok(path) => path,
            Err(err) => {
                warn!(key = %key, error = %err, "Refusing to delete blob");
                return false;
            }
        };

        match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to delete blob");
                false
            }
        }
    }

    fn resolve(&self, key: &str) -> String {
        format!("{}/{}", PUBLIC_PREFIX, key)
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, StorageError> {
        let (namespace, name) = split_key(key)?;
        Ok(self.root.join(namespace.as_str()).join(name))
    }
}
