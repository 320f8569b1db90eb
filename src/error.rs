//! Error types for snowdrift using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase. Every failure class is fatal to
//! the job: errors propagate to the top-level [`JobError`] and abort the
//! remaining steps.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Container spec does not match any known backend.
    #[snafu(display("Invalid storage container: {container}"))]
    InvalidContainer { container: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error"))]
    Io { source: std::io::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error"))]
    GcsConfig { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Fetch Errors ============

/// Errors that can occur while retrieving the source payload.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FetchError {
    /// Failed to download the source object.
    #[snafu(display("Failed to download {address}"))]
    Download {
        address: String,
        source: StorageError,
    },

    /// HTTP request to the source API failed (transport or non-2xx status).
    #[snafu(display("HTTP request to {url} failed"))]
    Request { url: String, source: reqwest::Error },

    /// Failed to write the payload to the local scratch path.
    #[snafu(display("Failed to write scratch file {path}"))]
    ScratchWrite {
        path: String,
        source: std::io::Error,
    },
}

// ============ Transform Errors ============

/// Errors that can occur while converting the payload to Parquet.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// Failed to open the raw scratch file.
    #[snafu(display("Failed to open input file {path}"))]
    OpenInput {
        path: String,
        source: std::io::Error,
    },

    /// CSV schema inference failed.
    #[snafu(display("Failed to infer CSV schema"))]
    CsvInfer { source: arrow::error::ArrowError },

    /// CSV decoding failed.
    #[snafu(display("Failed to decode CSV records"))]
    CsvDecode { source: arrow::error::ArrowError },

    /// Payload is not valid JSON.
    #[snafu(display("Failed to parse JSON payload"))]
    JsonParse { source: serde_json::Error },

    /// JSON schema inference failed.
    #[snafu(display("Failed to infer JSON schema"))]
    JsonInfer { source: arrow::error::ArrowError },

    /// JSON decoding into Arrow failed.
    #[snafu(display("Failed to decode JSON records"))]
    JsonDecode { source: arrow::error::ArrowError },

    /// Failed to write the Parquet file.
    #[snafu(display("Failed to write Parquet file {path}"))]
    ParquetWrite {
        path: String,
        source: parquet::errors::ParquetError,
    },

    /// Failed to create the transformed scratch file.
    #[snafu(display("Failed to create output file {path}"))]
    CreateOutput {
        path: String,
        source: std::io::Error,
    },
}

// ============ Publish Errors ============

/// Errors that can occur while uploading the transformed artifact.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PublishError {
    /// Failed to read the transformed scratch file.
    #[snafu(display("Failed to read artifact {path}"))]
    ReadArtifact {
        path: String,
        source: std::io::Error,
    },

    /// Failed to upload to the destination.
    #[snafu(display("Failed to upload to {address}"))]
    Upload {
        address: String,
        source: StorageError,
    },
}

// ============ Graph Errors ============

/// Errors that can occur while building or validating a task graph.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GraphError {
    /// A node was declared twice.
    #[snafu(display("Duplicate node id: {id}"))]
    DuplicateNode { id: String },

    /// A node depends on an id that is not in the graph.
    #[snafu(display("Node '{id}' depends on unknown node '{dependency}'"))]
    UnknownDependency { id: String, dependency: String },

    /// The dependency relation contains a cycle.
    #[snafu(display("Circular dependency detected: {path}"))]
    Cycle { path: String },

    /// A required orchestrator variable is not set.
    #[snafu(display("Environment variable '{name}' is not set"))]
    MissingVariable {
        name: String,
        source: std::env::VarError,
    },

    /// Failed to serialize the graph artifact.
    #[snafu(display("Failed to serialize graph artifact"))]
    Serialize { source: serde_yaml::Error },
}

// ============ Job Errors ============

/// Top-level job errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum JobError {
    /// Fetch step failed.
    #[snafu(display("Fetch failed"))]
    Fetch { source: FetchError },

    /// Transform step failed.
    #[snafu(display("Transform failed"))]
    Transform { source: TransformError },

    /// Publish step failed.
    #[snafu(display("Publish failed"))]
    Publish { source: PublishError },
}

impl From<FetchError> for JobError {
    fn from(source: FetchError) -> Self {
        JobError::Fetch { source }
    }
}

impl From<TransformError> for JobError {
    fn from(source: TransformError) -> Self {
        JobError::Transform { source }
    }
}

impl From<PublishError> for JobError {
    fn from(source: PublishError) -> Self {
        JobError::Publish { source }
    }
}
