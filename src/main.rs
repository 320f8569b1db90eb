//! snowdrift: single-shot tabular ingestion job.
//!
//! Fetches one object from cloud storage (or an HTTP API), converts it
//! from CSV/JSON to Parquet, and uploads the result to a destination
//! bucket. Runs to completion or fails; the scheduler observes only the
//! exit status.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snowdrift::error::JobError;
use snowdrift::params::DEFAULT_CREDENTIALS;
use snowdrift::{JobParams, PayloadFormat, SourceSpec, run_job};

/// Tabular object to Parquet ingestion step.
#[derive(Parser, Debug)]
#[command(name = "snowdrift")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bucket name where data needs to be pulled from.
    #[arg(long, required_unless_present = "source_url", conflicts_with = "source_url")]
    source_bucket: Option<String>,

    /// Path of the input object within the source bucket.
    #[arg(long, required_unless_present = "source_url", conflicts_with = "source_url")]
    source_path: Option<String>,

    /// Name of the input object to be downloaded.
    #[arg(long, required_unless_present = "source_url", conflicts_with = "source_url")]
    source_object: Option<String>,

    /// HTTP API endpoint to fetch instead of a storage object.
    #[arg(long)]
    source_url: Option<String>,

    /// Bucket name where data needs to be stored.
    #[arg(long)]
    dest_bucket: String,

    /// Path of the output object within the destination bucket.
    #[arg(long)]
    dest_path: String,

    /// Output file name to be stored.
    #[arg(long)]
    dest_object: String,

    /// Storage credential path.
    #[arg(long, default_value = DEFAULT_CREDENTIALS)]
    credentials: PathBuf,

    /// Payload format. Defaults to csv, or json when --source-url is given.
    #[arg(long, value_enum)]
    format: Option<PayloadFormat>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<Args> for JobParams {
    fn from(args: Args) -> Self {
        let source = match args.source_url {
            Some(url) => SourceSpec::Api { url },
            None => SourceSpec::Blob {
                bucket: args.source_bucket.expect("clap enforces source flags"),
                path: args.source_path.expect("clap enforces source flags"),
                object: args.source_object.expect("clap enforces source flags"),
            },
        };

        let format = args.format.unwrap_or(match &source {
            SourceSpec::Api { .. } => PayloadFormat::Json,
            SourceSpec::Blob { .. } => PayloadFormat::Csv,
        });

        JobParams {
            source,
            dest_bucket: args.dest_bucket,
            dest_path: args.dest_path,
            dest_object: args.dest_object,
            credentials: args.credentials,
            format,
        }
    }
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), JobError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("snowdrift starting");

    let params = JobParams::from(args);
    info!("Source: {}", params.source.address());
    info!(
        "Destination: {}/{}",
        params.dest_bucket,
        params.dest_blob_name()
    );

    let stats = run_job(&params).await?;

    info!("Job completed successfully");
    info!("  Bytes fetched: {}", stats.bytes_fetched);
    info!("  Records converted: {}", stats.rows);
    info!("  Columns: {}", stats.columns.join(", "));
    info!("  Destination object: {}", stats.destination);

    Ok(())
}
