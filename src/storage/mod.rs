//! Storage abstraction over GCS and the local filesystem.
//!
//! Provides a unified interface for reading the source object and writing
//! the published artifact. The job performs exactly one `get` and one
//! `put` per invocation; an upload unconditionally overwrites whatever is
//! at the destination path.

mod container;
mod gcs;
mod local;

pub use container::BackendConfig;

use bytes::Bytes;
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload,
};
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{ObjectStoreSnafu, StorageError};

/// Storage provider that abstracts over the supported backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for a container spec.
    ///
    /// `credentials` points at the service-account file used by cloud
    /// backends; the local backend ignores it.
    pub fn for_container(
        container: &str,
        credentials: &std::path::Path,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_container(container)?;

        match config {
            BackendConfig::Gcs(config) => Self::construct_gcs(config, credentials),
            BackendConfig::Local(config) => Self::construct_local(config),
        }
    }

    /// Get the contents of an object.
    pub async fn get(&self, path: impl Into<Path>) -> Result<Bytes, StorageError> {
        let path = path.into();
        let bytes = self
            .object_store
            .get(&path)
            .await
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)?;
        Ok(bytes)
    }

    /// Put bytes to a path, overwriting any existing object.
    pub async fn put(&self, path: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
        let payload = PutPayload::from(Bytes::from(bytes));
        self.object_store
            .put(path, payload)
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Put a Parquet file to a path with the correct content type.
    ///
    /// Sets `Content-Type: application/vnd.apache.parquet` on cloud storage
    /// backends. Local filesystem doesn't support attributes, so they are
    /// skipped.
    pub async fn put_parquet(&self, path: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
        let payload = PutPayload::from(Bytes::from(bytes));

        if matches!(self.config, BackendConfig::Local(_)) {
            self.object_store
                .put(path, payload)
                .await
                .context(ObjectStoreSnafu)?;
            return Ok(());
        }

        let opts = PutOptions {
            attributes: Attributes::from_iter([(
                Attribute::ContentType,
                AttributeValue::from("application/vnd.apache.parquet"),
            )]),
            ..Default::default()
        };
        self.object_store
            .put_opts(path, payload, opts)
            .await
            .context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Canonical URL of the container, for logging.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn creds() -> PathBuf {
        PathBuf::from(crate::params::DEFAULT_CREDENTIALS)
    }

    #[tokio::test]
    async fn test_local_put_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage =
            StorageProvider::for_container(temp_dir.path().to_str().unwrap(), &creds()).unwrap();

        let path = Path::from("team/output/file.bin");
        storage.put(&path, b"payload".to_vec()).await.unwrap();

        let bytes = storage.get("team/output/file.bin").await.unwrap();
        assert_eq!(bytes.as_ref(), b"payload");
    }

    #[tokio::test]
    async fn test_get_missing_object_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage =
            StorageProvider::for_container(temp_dir.path().to_str().unwrap(), &creds()).unwrap();

        let err = storage.get("missing/object.csv").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_object() {
        let temp_dir = TempDir::new().unwrap();
        let storage =
            StorageProvider::for_container(temp_dir.path().to_str().unwrap(), &creds()).unwrap();

        let path = Path::from("out/file.bin");
        storage.put(&path, b"first".to_vec()).await.unwrap();
        storage.put(&path, b"second".to_vec()).await.unwrap();

        let bytes = storage.get("out/file.bin").await.unwrap();
        assert_eq!(bytes.as_ref(), b"second");
    }
}
