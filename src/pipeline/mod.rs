//! The three-step ingestion pipeline.
//!
//! `run_job` executes fetch, transform and publish strictly in sequence;
//! each step blocks until complete and any failure aborts the remaining
//! steps. There is no partial success and no compensating rollback of a
//! partially uploaded object.

mod fetch;
mod publish;

pub use fetch::fetch_source;
pub use publish::publish_artifact;

use tracing::info;

use crate::error::JobError;
use crate::params::JobParams;
use crate::transform::convert_to_parquet;

/// Statistics from a completed job.
#[derive(Debug, Clone)]
pub struct JobStats {
    /// Bytes retrieved from the source.
    pub bytes_fetched: usize,
    /// Rows written to the Parquet artifact.
    pub rows: usize,
    /// Column names of the converted table, in order.
    pub columns: Vec<String>,
    /// Full address of the published destination object.
    pub destination: String,
}

/// Run one ingestion job to completion.
///
/// The single durable side effect is a new or overwritten object at the
/// destination address. Scratch files are left behind for the execution
/// environment to reclaim.
pub async fn run_job(params: &JobParams) -> Result<JobStats, JobError> {
    let scratch = params.scratch();

    let bytes_fetched = fetch_source(params, &scratch.raw).await?;

    let report = convert_to_parquet(&scratch.raw, &scratch.transformed, params.format)?;
    info!(
        "Converted {} to Parquet at {}, no of records: {}",
        scratch.raw.display(),
        scratch.transformed.display(),
        report.rows
    );

    let destination = publish_artifact(params, &scratch.transformed).await?;

    Ok(JobStats {
        bytes_fetched,
        rows: report.rows,
        columns: report.columns,
        destination,
    })
}
