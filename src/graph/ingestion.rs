//! The ingestion graph definition.
//!
//! Four nodes in a strict total order: `start` -> `download_data` ->
//! `container_task` -> `end`. Only `container_task` carries a payload: it
//! runs the pipeline step runner in an isolated pod, with credential files
//! populated by the vault sidecar before the runner starts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::prelude::*;
use std::collections::BTreeMap;

use crate::error::{GraphError, MissingVariableSnafu};
use crate::params::JobParams;

use super::{GraphDefaults, TaskGraph, TaskNode};

/// Directory where the sidecar materializes secret files.
pub const SECRET_LOCATION: &str = "/vault/secrets/";

/// Scheduler template for the graph id, resolved by the orchestrator at
/// run time.
pub const DAG_ID_TEMPLATE: &str = "{{dag.dag_id}}";

/// Scheduler template for the run id, resolved by the orchestrator at
/// run time.
pub const RUN_ID_TEMPLATE: &str = "{{run_id}}";

/// Kubernetes service account that enables sidecar injection.
const SERVICE_ACCOUNT_NAME: &str = "vault-sidecar";

/// A secret file the sidecar must populate before the runner starts.
///
/// Declared, not performed: the graph only records which vault path lands
/// at which file name under [`SECRET_LOCATION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretMount {
    /// File name under the secret location.
    pub file_name: String,
    /// Vault path of the secret material.
    pub vault_path: String,
}

impl SecretMount {
    pub fn new(file_name: impl Into<String>, vault_path: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            vault_path: vault_path.into(),
        }
    }

    /// Absolute path the runner reads the secret from.
    pub fn mount_path(&self) -> String {
        format!("{SECRET_LOCATION}{}", self.file_name)
    }
}

/// Environment-scoped configuration for the graph.
///
/// Resolved once at graph-construction time from the orchestrator's
/// variable store, not re-read per execution; the values are fixed for
/// the lifetime of the deployed graph definition.
#[derive(Debug, Clone, Serialize)]
pub struct GraphContext {
    /// Deployment environment tag (e.g. "dev", "prd").
    pub landscape: String,
    /// Cloud project identifier.
    pub project_id: String,
    /// Namespace the execution pod runs in.
    pub namespace: String,
    /// Container registry holding the runner image.
    pub registry: String,
    /// Name of the runner container image.
    pub container_name: String,
    /// Image tag to pull.
    pub image_tag: String,
    /// When this graph definition was constructed.
    pub defined_at: DateTime<Utc>,
}

impl GraphContext {
    /// Resolve the context from environment variables.
    pub fn from_env(registry: &str, container_name: &str) -> Result<Self, GraphError> {
        let var = |name: &str| {
            std::env::var(name).context(MissingVariableSnafu {
                name: name.to_string(),
            })
        };

        Ok(Self {
            landscape: var("LANDSCAPE_ABBV")?,
            project_id: var("GCP_PROJECT")?,
            namespace: var("NAMESPACE")?,
            registry: registry.to_string(),
            container_name: container_name.to_string(),
            image_tag: "dev".to_string(),
            defined_at: Utc::now(),
        })
    }

    /// Full image reference for the runner container.
    pub fn container_image(&self) -> String {
        format!("{}/{}:{}", self.registry, self.container_name, self.image_tag)
    }

    /// Templated name of the output table.
    ///
    /// Carries the scheduler's run id, so every invocation resolves to a
    /// distinct logical table name. The storage object name is NOT
    /// templated with the run id; the two naming schemes are independent
    /// conventions and are kept that way deliberately.
    pub fn output_table(&self) -> String {
        format!(
            "{}.sandbox_output.{}_{}_{}",
            self.project_id, DAG_ID_TEMPLATE, self.container_name, RUN_ID_TEMPLATE
        )
    }
}

/// The container execution node payload.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerTask {
    /// Pod name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Namespace the pod runs in.
    pub namespace: String,
    /// Service account enabling sidecar injection.
    pub service_account: String,
    /// Runner command-line arguments.
    pub arguments: Vec<String>,
    /// Secret files the sidecar populates before the runner starts.
    pub secrets: Vec<SecretMount>,
    /// Sidecar injection annotations attached to the pod.
    pub annotations: BTreeMap<String, String>,
    /// Templated output table name (run-id scoped).
    pub output_table: String,
}

/// Sidecar injection annotations for a pod in `namespace` requiring
/// `secrets`.
fn injection_annotations(
    namespace: &str,
    secrets: &[SecretMount],
) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert("vault.hashicorp.com/agent-inject".to_string(), "true".to_string());
    annotations.insert(
        "vault.hashicorp.com/agent-pre-populate-only".to_string(),
        "true".to_string(),
    );
    annotations.insert(
        "vault.hashicorp.com/role".to_string(),
        namespace.to_string(),
    );
    for secret in secrets {
        annotations.insert(
            format!(
                "vault.hashicorp.com/agent-inject-secret-{}",
                secret.file_name
            ),
            secret.vault_path.clone(),
        );
    }
    annotations
}

/// Secret materials required by the runner.
fn secret_mounts() -> Vec<SecretMount> {
    vec![
        SecretMount::new(
            "source-api-credentials.json",
            "secret/teams/external-data-ingest/source-api",
        ),
        SecretMount::new("gcp-sa-bq.json", "secret/teams/data-engineering/gcp-sa-bq"),
        SecretMount::new(
            "gcp-sa-storage.json",
            "secret/teams/data-engineering/gcp-sa-storage",
        ),
    ]
}

/// Build the four-node ingestion graph.
///
/// The graph is validated before being returned; the caller can hand the
/// YAML rendering straight to the scheduler.
pub fn ingestion_graph(ctx: &GraphContext, job: &JobParams) -> Result<TaskGraph, GraphError> {
    let mut graph = TaskGraph::new(
        format!("{}_ingestion", ctx.container_name),
        GraphDefaults::default(),
    );

    graph.add_node(TaskNode::marker("start"))?;
    graph.add_node(TaskNode::marker("download_data").after("start"))?;

    let secrets = secret_mounts();
    let task = ContainerTask {
        name: "container_task".to_string(),
        image: ctx.container_image(),
        namespace: ctx.namespace.clone(),
        service_account: SERVICE_ACCOUNT_NAME.to_string(),
        arguments: job.to_cli_args(),
        annotations: injection_annotations(&ctx.namespace, &secrets),
        secrets,
        output_table: ctx.output_table(),
    };
    graph.add_node(TaskNode::container("container_task", task).after("download_data"))?;

    graph.add_node(TaskNode::marker("end").after("container_task"))?;

    graph.validate()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaskPayload;
    use crate::params::{DEFAULT_CREDENTIALS, PayloadFormat, SourceSpec};
    use std::path::PathBuf;

    fn test_context() -> GraphContext {
        GraphContext {
            landscape: "dev".to_string(),
            project_id: "sandbox-project".to_string(),
            namespace: "ingest".to_string(),
            registry: "us-east4-docker.pkg.dev/artifacts/de-team".to_string(),
            container_name: "city_products".to_string(),
            image_tag: "dev".to_string(),
            defined_at: Utc::now(),
        }
    }

    fn test_job() -> JobParams {
        JobParams {
            source: SourceSpec::Blob {
                bucket: "in-bucket".to_string(),
                path: "team/input".to_string(),
                object: "rows.csv".to_string(),
            },
            dest_bucket: "out-bucket".to_string(),
            dest_path: "team/output".to_string(),
            dest_object: "rows.parquet".to_string(),
            credentials: PathBuf::from(DEFAULT_CREDENTIALS),
            format: PayloadFormat::Csv,
        }
    }

    #[test]
    fn test_graph_has_four_nodes_in_order() {
        let graph = ingestion_graph(&test_context(), &test_job()).unwrap();
        let order: Vec<&str> = graph
            .topological_order()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["start", "download_data", "container_task", "end"]);
    }

    #[test]
    fn test_marker_nodes_carry_no_payload() {
        let graph = ingestion_graph(&test_context(), &test_job()).unwrap();
        for id in ["start", "download_data", "end"] {
            assert!(matches!(
                graph.node(id).unwrap().payload,
                TaskPayload::Marker
            ));
        }
    }

    #[test]
    fn test_container_node_carries_runner_arguments() {
        let graph = ingestion_graph(&test_context(), &test_job()).unwrap();
        let TaskPayload::Container(task) = &graph.node("container_task").unwrap().payload else {
            panic!("Expected container payload");
        };

        assert_eq!(task.image, "us-east4-docker.pkg.dev/artifacts/de-team/city_products:dev");
        assert_eq!(task.service_account, "vault-sidecar");
        assert!(task.arguments.contains(&"--source-bucket".to_string()));
        assert!(task.arguments.contains(&"out-bucket".to_string()));
    }

    #[test]
    fn test_secret_mounts_land_under_secret_location() {
        let graph = ingestion_graph(&test_context(), &test_job()).unwrap();
        let TaskPayload::Container(task) = &graph.node("container_task").unwrap().payload else {
            panic!("Expected container payload");
        };

        assert_eq!(task.secrets.len(), 3);
        for secret in &task.secrets {
            assert!(secret.mount_path().starts_with(SECRET_LOCATION));
        }

        // The runner's default credential path matches the declared mount.
        let storage_mount = task
            .secrets
            .iter()
            .find(|s| s.file_name == "gcp-sa-storage.json")
            .unwrap();
        assert_eq!(storage_mount.mount_path(), DEFAULT_CREDENTIALS);
    }

    #[test]
    fn test_injection_annotations() {
        let graph = ingestion_graph(&test_context(), &test_job()).unwrap();
        let TaskPayload::Container(task) = &graph.node("container_task").unwrap().payload else {
            panic!("Expected container payload");
        };

        assert_eq!(
            task.annotations.get("vault.hashicorp.com/agent-inject"),
            Some(&"true".to_string())
        );
        assert_eq!(
            task.annotations.get("vault.hashicorp.com/role"),
            Some(&"ingest".to_string())
        );
        assert!(
            task.annotations
                .contains_key("vault.hashicorp.com/agent-inject-secret-gcp-sa-storage.json")
        );
    }

    #[test]
    fn test_table_name_templated_but_object_name_is_not() {
        let ctx = test_context();
        let job = test_job();
        let graph = ingestion_graph(&ctx, &job).unwrap();
        let TaskPayload::Container(task) = &graph.node("container_task").unwrap().payload else {
            panic!("Expected container payload");
        };

        assert!(task.output_table.contains(RUN_ID_TEMPLATE));
        assert_eq!(
            task.output_table,
            "sandbox-project.sandbox_output.{{dag.dag_id}}_city_products_{{run_id}}"
        );

        // The storage object name deliberately carries no run id.
        assert!(!job.dest_blob_name().contains(RUN_ID_TEMPLATE));
    }

    #[test]
    fn test_graph_yaml_artifact() {
        let graph = ingestion_graph(&test_context(), &test_job()).unwrap();
        let yaml = graph.to_yaml().unwrap();
        assert!(yaml.contains("container_task"));
        assert!(yaml.contains("vault-sidecar"));
        assert!(yaml.contains("gcp-sa-storage.json"));
        assert!(yaml.contains("vault.hashicorp.com/agent-inject"));
        assert!(yaml.contains("vault.hashicorp.com/role"));
    }
}
