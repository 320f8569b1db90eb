//! Orchestration task graph.
//!
//! The graph is a static artifact: nodes, a dependency relation and
//! per-node payloads, declared once and handed to the external scheduler.
//! This module provides the directed-acyclic graph abstraction; the
//! concrete ingestion graph is built in [`ingestion`].

mod ingestion;

pub use ingestion::{
    ContainerTask, GraphContext, SecretMount, ingestion_graph, DAG_ID_TEMPLATE, RUN_ID_TEMPLATE,
    SECRET_LOCATION,
};

use serde::Serialize;
use snafu::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{CycleSnafu, DuplicateNodeSnafu, GraphError, SerializeSnafu, UnknownDependencySnafu};

/// Payload carried by a graph node.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Pure sequencing marker; the scheduler runs nothing for it.
    Marker,
    /// Containerized execution of the pipeline step runner.
    Container(ContainerTask),
}

/// One node in the task graph.
#[derive(Debug, Clone, Serialize)]
pub struct TaskNode {
    /// Node identifier, unique within the graph.
    pub id: String,
    /// Ids of nodes that must complete before this one starts.
    pub depends_on: Vec<String>,
    /// What the scheduler executes for this node.
    pub payload: TaskPayload,
}

impl TaskNode {
    /// A no-op sequencing node.
    pub fn marker(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            payload: TaskPayload::Marker,
        }
    }

    /// A container execution node.
    pub fn container(id: impl Into<String>, task: ContainerTask) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            payload: TaskPayload::Container(task),
        }
    }

    /// Declare a dependency on another node.
    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }
}

/// Scheduler-facing metadata for the graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDefaults {
    /// Owner recorded on the deployed graph.
    pub owner: String,
    /// Addresses notified on failure.
    pub email: Vec<String>,
    /// Whether failure notifications are sent.
    pub email_on_failure: bool,
    /// Cron-style schedule; `None` means triggered on demand only.
    pub schedule: Option<String>,
}

impl Default for GraphDefaults {
    fn default() -> Self {
        Self {
            owner: "data-engineering".to_string(),
            email: Vec::new(),
            email_on_failure: true,
            schedule: None,
        }
    }
}

/// A static, acyclic task graph.
#[derive(Debug, Clone, Serialize)]
pub struct TaskGraph {
    /// Graph identifier, templated into output naming.
    pub dag_id: String,
    /// Scheduler-facing metadata.
    pub defaults: GraphDefaults,
    /// Nodes in declaration order.
    pub nodes: Vec<TaskNode>,
    #[serde(skip)]
    indices: HashMap<String, usize>,
}

impl TaskGraph {
    /// Create an empty graph.
    pub fn new(dag_id: impl Into<String>, defaults: GraphDefaults) -> Self {
        Self {
            dag_id: dag_id.into(),
            defaults,
            nodes: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Add a node, rejecting duplicate ids.
    pub fn add_node(&mut self, node: TaskNode) -> Result<(), GraphError> {
        ensure!(
            !self.indices.contains_key(&node.id),
            DuplicateNodeSnafu { id: node.id }
        );
        self.indices.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&TaskNode> {
        self.indices.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Validate the graph: every dependency exists and no cycle is present.
    pub fn validate(&self) -> Result<(), GraphError> {
        for node in &self.nodes {
            for dep in &node.depends_on {
                ensure!(
                    self.indices.contains_key(dep),
                    UnknownDependencySnafu {
                        id: node.id.clone(),
                        dependency: dep.clone(),
                    }
                );
            }
        }

        self.detect_cycles()
    }

    /// Detect cycles in the dependency relation using DFS.
    fn detect_cycles(&self) -> Result<(), GraphError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node in &self.nodes {
            if !visited.contains(node.id.as_str()) {
                if let Some(cycle) = self.dfs_cycle(node, &mut visited, &mut rec_stack) {
                    return CycleSnafu {
                        path: cycle.join(" -> "),
                    }
                    .fail();
                }
            }
        }

        Ok(())
    }

    fn dfs_cycle<'a>(
        &'a self,
        node: &'a TaskNode,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(&node.id);
        rec_stack.insert(&node.id);

        for dep in &node.depends_on {
            if !visited.contains(dep.as_str()) {
                if let Some(idx) = self.indices.get(dep) {
                    if let Some(mut cycle) =
                        self.dfs_cycle(&self.nodes[*idx], visited, rec_stack)
                    {
                        cycle.insert(0, node.id.clone());
                        return Some(cycle);
                    }
                }
            } else if rec_stack.contains(dep.as_str()) {
                return Some(vec![node.id.clone(), dep.clone()]);
            }
        }

        rec_stack.remove(node.id.as_str());
        None
    }

    /// Nodes in topological order (dependencies before dependents).
    ///
    /// Declaration order breaks ties, so a linear graph comes back in
    /// declaration order.
    pub fn topological_order(&self) -> Vec<&TaskNode> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for node in &self.nodes {
            in_degree.entry(&node.id).or_insert(0);
            for dep in &node.depends_on {
                dependents.entry(dep.as_str()).or_default().push(&node.id);
                *in_degree.entry(&node.id).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .filter(|n| in_degree[n.id.as_str()] == 0)
            .map(|n| n.id.as_str())
            .collect();

        let mut result = Vec::new();

        while let Some(id) = queue.pop_front() {
            if let Some(idx) = self.indices.get(id) {
                result.push(&self.nodes[*idx]);
            }

            if let Some(next) = dependents.get(id) {
                for &dependent in next {
                    if let Some(deg) = in_degree.get_mut(dependent) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        result
    }

    /// Render the graph as a YAML artifact for the scheduler runtime.
    pub fn to_yaml(&self) -> Result<String, GraphError> {
        serde_yaml::to_string(self).context(SerializeSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_graph() -> TaskGraph {
        let mut graph = TaskGraph::new("test_dag", GraphDefaults::default());
        graph.add_node(TaskNode::marker("a")).unwrap();
        graph.add_node(TaskNode::marker("b").after("a")).unwrap();
        graph.add_node(TaskNode::marker("c").after("b")).unwrap();
        graph
    }

    #[test]
    fn test_linear_graph_validates() {
        assert!(linear_graph().validate().is_ok());
    }

    #[test]
    fn test_topological_order_is_declaration_order() {
        let graph = linear_graph();
        let order: Vec<&str> = graph
            .topological_order()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = TaskGraph::new("test_dag", GraphDefaults::default());
        graph.add_node(TaskNode::marker("a")).unwrap();
        let err = graph.add_node(TaskNode::marker("a")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode { .. }));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let mut graph = TaskGraph::new("test_dag", GraphDefaults::default());
        graph
            .add_node(TaskNode::marker("a").after("missing"))
            .unwrap();
        let err = graph.validate().unwrap_err();
        assert!(matches!(err, GraphError::UnknownDependency { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = TaskGraph::new("test_dag", GraphDefaults::default());
        graph.add_node(TaskNode::marker("a").after("c")).unwrap();
        graph.add_node(TaskNode::marker("b").after("a")).unwrap();
        graph.add_node(TaskNode::marker("c").after("b")).unwrap();
        let err = graph.validate().unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn test_yaml_artifact_lists_nodes() {
        let yaml = linear_graph().to_yaml().unwrap();
        assert!(yaml.contains("test_dag"));
        assert!(yaml.contains("id: a"));
        assert!(yaml.contains("kind: marker"));
    }
}
