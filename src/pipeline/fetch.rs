//! Fetch step: retrieve the source payload to the raw scratch path.

use bytes::Bytes;
use snafu::prelude::*;
use tracing::info;

use crate::error::{DownloadSnafu, FetchError, RequestSnafu, ScratchWriteSnafu};
use crate::params::{JobParams, SourceSpec};
use crate::storage::StorageProvider;

/// Retrieve the source payload and write it to `scratch_path`.
///
/// Returns the number of bytes fetched. Any failure (authentication,
/// missing object, transport, scratch write) is fatal; no retry is
/// attempted beyond the storage client's defaults.
pub async fn fetch_source(
    params: &JobParams,
    scratch_path: &std::path::Path,
) -> Result<usize, FetchError> {
    let bytes = match &params.source {
        SourceSpec::Blob { bucket, .. } => {
            let blob_name = params
                .source_blob_name()
                .expect("blob source always has a blob name");
            let storage = StorageProvider::for_container(bucket, &params.credentials)
                .context(DownloadSnafu {
                    address: params.source.address(),
                })?;
            let bytes = storage
                .get(blob_name.as_str())
                .await
                .context(DownloadSnafu {
                    address: params.source.address(),
                })?;
            info!(
                "Downloaded storage object {} from {} ({} bytes)",
                blob_name,
                storage.canonical_url(),
                bytes.len()
            );
            bytes
        }
        SourceSpec::Api { url } => fetch_url(url).await?,
    };

    if let Some(parent) = scratch_path.parent() {
        std::fs::create_dir_all(parent).context(ScratchWriteSnafu {
            path: scratch_path.display().to_string(),
        })?;
    }
    tokio::fs::write(scratch_path, &bytes)
        .await
        .context(ScratchWriteSnafu {
            path: scratch_path.display().to_string(),
        })?;

    info!(
        "Wrote raw payload to local file {}",
        scratch_path.display()
    );

    Ok(bytes.len())
}

/// One blocking GET against the source API endpoint.
async fn fetch_url(url: &str) -> Result<Bytes, FetchError> {
    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .context(RequestSnafu {
            url: url.to_string(),
        })?;

    let bytes = response.bytes().await.context(RequestSnafu {
        url: url.to_string(),
    })?;

    info!("Fetched {} bytes from {}", bytes.len(), url);
    Ok(bytes)
}
