//! snowdrift: a single-shot tabular ingestion job.
//!
//! This library provides components for moving one object between cloud
//! storage locations while converting it from a row-oriented format
//! (CSV or JSON) to Parquet:
//! - Fetching the source object from GCS or local storage, or from an
//!   HTTP API endpoint
//! - Converting the payload to Parquet with an inferred schema
//! - Publishing the converted artifact to the destination bucket
//! - Declaring the orchestration graph that schedules the job
//!
//! # Example
//!
//! ```ignore
//! use snowdrift::{JobParams, run_job, error::JobError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), JobError> {
//!     let params: JobParams = resolve_invocation_parameters();
//!     let stats = run_job(&params).await?;
//!     println!("Published {} rows to {}", stats.rows, stats.destination);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod graph;
pub mod params;
pub mod pipeline;
pub mod storage;
pub mod transform;

// Re-export main types
pub use params::{JobParams, PayloadFormat, SourceSpec};
pub use pipeline::{JobStats, run_job};
pub use storage::StorageProvider;
