//! Container spec parsing for storage backends.
//!
//! Job parameters identify containers by a short spec rather than a full
//! URL: a `gs://` URL or bare bucket name selects GCS, a filesystem path
//! or `file://` URI selects the local backend (used by tests and local
//! runs).

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{InvalidContainerSnafu, StorageError};

const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)$";
const GCS_BUCKET: &str = r"^(?P<bucket>[a-z0-9][a-z0-9\-\._]*[a-z0-9])$";

const FILE_URI: &str = r"^file://(?P<path>/.*)$";
const FILE_PATH: &str = r"^(?P<path>/.*)$";

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum Backend {
    Gcs,
    Local,
}

fn matchers() -> &'static HashMap<Backend, Vec<Regex>> {
    static MATCHERS: OnceLock<HashMap<Backend, Vec<Regex>>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        let mut m = HashMap::new();

        m.insert(
            Backend::Gcs,
            vec![Regex::new(GCS_URL).unwrap(), Regex::new(GCS_BUCKET).unwrap()],
        );

        m.insert(
            Backend::Local,
            vec![Regex::new(FILE_URI).unwrap(), Regex::new(FILE_PATH).unwrap()],
        );

        m
    })
}

/// GCS backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    pub bucket: String,
}

/// Local filesystem backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub path: String,
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Gcs(GcsConfig),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a container spec into a backend configuration.
    ///
    /// Local specs are tried first so absolute paths never get mistaken
    /// for bucket names.
    pub fn parse_container(container: &str) -> Result<Self, StorageError> {
        let m = matchers();

        for backend in [Backend::Local, Backend::Gcs] {
            if let Some(matches) = m[&backend].iter().filter_map(|r| r.captures(container)).next()
            {
                return Ok(match backend {
                    Backend::Gcs => BackendConfig::Gcs(GcsConfig {
                        bucket: matches["bucket"].to_string(),
                    }),
                    Backend::Local => BackendConfig::Local(LocalConfig {
                        path: matches["path"].to_string(),
                    }),
                });
            }
        }

        InvalidContainerSnafu {
            container: container.to_string(),
        }
        .fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcs_url_parsing() {
        let config = BackendConfig::parse_container("gs://my-bucket").unwrap();
        match config {
            BackendConfig::Gcs(gcs) => assert_eq!(gcs.bucket, "my-bucket"),
            _ => panic!("Expected GCS config"),
        }
    }

    #[test]
    fn test_bare_bucket_name() {
        let config = BackendConfig::parse_container("cp-sandbox-pipeline").unwrap();
        match config {
            BackendConfig::Gcs(gcs) => assert_eq!(gcs.bucket, "cp-sandbox-pipeline"),
            _ => panic!("Expected GCS config"),
        }
    }

    #[test]
    fn test_local_path_parsing() {
        let config = BackendConfig::parse_container("/local/data").unwrap();
        match config {
            BackendConfig::Local(local) => assert_eq!(local.path, "/local/data"),
            _ => panic!("Expected Local config"),
        }
    }

    #[test]
    fn test_file_uri_parsing() {
        let config = BackendConfig::parse_container("file:///local/data").unwrap();
        match config {
            BackendConfig::Local(local) => assert_eq!(local.path, "/local/data"),
            _ => panic!("Expected Local config"),
        }
    }

    #[test]
    fn test_invalid_container() {
        let result = BackendConfig::parse_container("not a bucket!");
        assert!(result.is_err());
    }
}
