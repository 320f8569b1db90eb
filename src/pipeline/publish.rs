//! Publish step: upload the transformed artifact to the destination.

use object_store::path::Path;
use snafu::prelude::*;
use tracing::info;

use crate::error::{PublishError, ReadArtifactSnafu, UploadSnafu};
use crate::params::JobParams;
use crate::storage::StorageProvider;

/// Upload the transformed scratch file to the destination container.
///
/// The destination object is overwritten unconditionally; last writer
/// wins. Returns the full destination address.
pub async fn publish_artifact(
    params: &JobParams,
    artifact_path: &std::path::Path,
) -> Result<String, PublishError> {
    let blob_name = params.dest_blob_name();
    let address = format!("{}/{}", params.dest_bucket, blob_name);

    let bytes = tokio::fs::read(artifact_path)
        .await
        .context(ReadArtifactSnafu {
            path: artifact_path.display().to_string(),
        })?;

    let storage = StorageProvider::for_container(&params.dest_bucket, &params.credentials)
        .context(UploadSnafu {
            address: address.clone(),
        })?;

    info!(
        "Uploading file {} to {} at path {} ({} bytes)",
        artifact_path.display(),
        storage.canonical_url(),
        blob_name,
        bytes.len()
    );

    storage
        .put_parquet(&Path::from(blob_name.as_str()), bytes)
        .await
        .context(UploadSnafu {
            address: address.clone(),
        })?;

    info!("Upload successful");

    Ok(address)
}
