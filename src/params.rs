//! Job parameters and scratch path conventions.
//!
//! Parameters are resolved once per invocation, at process start, and are
//! never mutated during execution. Everything downstream receives them by
//! reference; nothing re-reads the environment or the command line.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default location of the storage service-account credential file.
///
/// The injection sidecar materializes this file before the runner starts;
/// the runner only ever reads it.
pub const DEFAULT_CREDENTIALS: &str = "/vault/secrets/gcp-sa-storage.json";

/// Prefix applied to both the transformed scratch file and the remote
/// destination object name.
pub const PROCESSED_PREFIX: &str = "processed_";

/// Row-oriented format of the source payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// CSV with a header row; schema inferred from the data.
    #[default]
    Csv,
    /// JSON records: an array of objects or newline-delimited objects.
    Json,
}

/// Where the source payload comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSpec {
    /// An object in a storage container.
    Blob {
        bucket: String,
        path: String,
        object: String,
    },
    /// An HTTP API endpoint, fetched with a single GET.
    Api { url: String },
}

impl SourceSpec {
    /// Human-readable address of the source, for logging.
    pub fn address(&self) -> String {
        match self {
            SourceSpec::Blob {
                bucket,
                path,
                object,
            } => format!("{bucket}/{path}/{object}"),
            SourceSpec::Api { url } => url.clone(),
        }
    }
}

/// Immutable parameter set for one job invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    /// Source of the raw payload.
    pub source: SourceSpec,
    /// Container receiving the output object.
    pub dest_bucket: String,
    /// Prefix of the output object within the destination container.
    pub dest_path: String,
    /// Base name used to derive scratch filenames and the remote name.
    pub dest_object: String,
    /// Path to the storage service-account credential file.
    pub credentials: PathBuf,
    /// Format of the source payload.
    pub format: PayloadFormat,
}

impl JobParams {
    /// Full path of the source object within its container.
    ///
    /// Only meaningful for blob sources.
    pub fn source_blob_name(&self) -> Option<String> {
        match &self.source {
            SourceSpec::Blob { path, object, .. } => Some(format!("{path}/{object}")),
            SourceSpec::Api { .. } => None,
        }
    }

    /// Full path of the destination object within the destination container.
    pub fn dest_blob_name(&self) -> String {
        format!(
            "{}/{}{}",
            self.dest_path, PROCESSED_PREFIX, self.dest_object
        )
    }

    /// Render the parameter set as runner command-line arguments.
    ///
    /// This is the argument list the orchestration graph embeds in its
    /// container node, so the flag names here and in the CLI definition
    /// must stay in sync.
    pub fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match &self.source {
            SourceSpec::Blob {
                bucket,
                path,
                object,
            } => {
                args.extend([
                    "--source-bucket".to_string(),
                    bucket.clone(),
                    "--source-path".to_string(),
                    path.clone(),
                    "--source-object".to_string(),
                    object.clone(),
                ]);
            }
            SourceSpec::Api { url } => {
                args.extend(["--source-url".to_string(), url.clone()]);
            }
        }
        args.extend([
            "--dest-bucket".to_string(),
            self.dest_bucket.clone(),
            "--dest-path".to_string(),
            self.dest_path.clone(),
            "--dest-object".to_string(),
            self.dest_object.clone(),
        ]);
        args
    }

    /// Scratch paths for this invocation.
    pub fn scratch(&self) -> ScratchPaths {
        ScratchPaths::for_base(&self.dest_object)
    }
}

/// Local scratch file locations for one invocation.
///
/// Paths live in a per-process subdirectory of the platform temp dir, so
/// concurrent runs never collide on local state. Nothing deletes them; the
/// execution environment reclaims ephemeral storage on process exit.
#[derive(Debug, Clone)]
pub struct ScratchPaths {
    /// Directory holding both scratch files.
    pub dir: PathBuf,
    /// Raw downloaded payload.
    pub raw: PathBuf,
    /// Converted Parquet artifact.
    pub transformed: PathBuf,
}

impl ScratchPaths {
    /// Derive scratch paths from the destination base name.
    pub fn for_base(base: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("snowdrift-{}", std::process::id()));
        let raw = dir.join(base);
        let transformed = dir.join(format!("{PROCESSED_PREFIX}{base}"));
        Self {
            dir,
            raw,
            transformed,
        }
    }
}
