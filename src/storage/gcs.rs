//! Google Cloud Storage backend implementation.

use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::{ObjectStore, RetryConfig};
use snafu::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{GcsConfigSnafu, StorageError};

use super::{BackendConfig, StorageProvider};
use super::container::GcsConfig;

impl StorageProvider {
    pub(super) fn construct_gcs(
        config: GcsConfig,
        credentials: &Path,
    ) -> Result<Self, StorageError> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(&config.bucket);

        builder = builder.with_retry(RetryConfig::default());

        // The credential file is materialized by the injection sidecar
        // before this process starts. Fall back to ambient (env-based)
        // auth when it is absent.
        if credentials.exists() {
            debug!(
                "Constructing GCS builder with service account file {}",
                credentials.display()
            );
            builder = builder.with_service_account_path(credentials.to_string_lossy());
        }

        let canonical_url = format!("https://{}.storage.googleapis.com", config.bucket);
        let object_store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(GcsConfigSnafu)?);

        Ok(Self {
            config: BackendConfig::Gcs(config),
            object_store,
            canonical_url,
        })
    }
}
