//! # Cluster State Probe
//!
//! Read-only queries against the Kubernetes API for node health, running job
//! count and allocatable capacity. Every call observes live state; nothing is
//! cached between calls.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::error::ProbeError;
use crate::quantity;

/// Node condition that is healthy when `True`; all others are healthy when `False`
pub const CONDITION_READY: &str = "Ready";

const JOB_COMPLETE: &str = "Complete";
const JOB_FAILED: &str = "Failed";

/// A single named condition flag on a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCondition {
    pub kind: String,
    pub healthy: bool,
}

impl NodeCondition {
    pub fn new(kind: impl Into<String>, healthy: bool) -> Self {
        Self {
            kind: kind.into(),
            healthy,
        }
    }
}

/// Node identifier plus its condition flags, in API order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub name: String,
    pub conditions: Vec<NodeCondition>,
}

impl NodeStatus {
    /// First flag that is not healthy, if any
    #[must_use]
    pub fn first_unhealthy(&self) -> Option<&NodeCondition> {
        self.conditions.iter().find(|condition| !condition.healthy)
    }

    /// Whether the node reports `Ready=True`
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.conditions
            .iter()
            .any(|condition| condition.kind == CONDITION_READY && condition.healthy)
    }
}

/// Allocatable resources summed over ready nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterCapacity {
    pub cpu_millis: u64,
    pub memory_bytes: u64,
    pub pods: u64,
}

/// Read-only view of cluster state used by readiness conditions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterProbe: Send + Sync {
    /// All nodes with their normalized condition flags
    async fn list_nodes(&self) -> Result<Vec<NodeStatus>, ProbeError>;

    /// Number of jobs across all namespaces that have not finished
    async fn count_running_jobs(&self) -> Result<usize, ProbeError>;

    /// Allocatable cpu, memory and pods of ready nodes
    async fn cluster_capacity(&self) -> Result<ClusterCapacity, ProbeError>;
}

/// `ClusterProbe` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterProbe {
    client: Client,
}

impl KubeClusterProbe {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn nodes(&self) -> Result<Vec<Node>, ProbeError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        debug!(count = nodes.items.len(), "Listed cluster nodes");
        Ok(nodes.items)
    }
}

#[async_trait]
impl ClusterProbe for KubeClusterProbe {
    async fn list_nodes(&self) -> Result<Vec<NodeStatus>, ProbeError> {
        self.nodes().await?.iter().map(node_status).collect()
    }

    async fn count_running_jobs(&self) -> Result<usize, ProbeError> {
        let api: Api<Job> = Api::all(self.client.clone());
        let jobs = api.list(&ListParams::default()).await?;
        let running = jobs.items.iter().filter(|job| job_is_running(job)).count();
        debug!(
            total = jobs.items.len(),
            running = running,
            "Listed jobs across all namespaces"
        );
        Ok(running)
    }

    async fn cluster_capacity(&self) -> Result<ClusterCapacity, ProbeError> {
        let mut capacity = ClusterCapacity::default();
        for node in self.nodes().await? {
            if !node_status(&node)?.is_ready() {
                continue;
            }
            let node_capacity = allocatable(&node)?;
            capacity.cpu_millis += node_capacity.cpu_millis;
            capacity.memory_bytes += node_capacity.memory_bytes;
            capacity.pods += node_capacity.pods;
        }
        Ok(capacity)
    }
}

/// Whether a raw condition status counts as healthy for its condition type
#[must_use]
pub fn condition_is_healthy(kind: &str, status: &str) -> bool {
    if kind == CONDITION_READY {
        status == "True"
    } else {
        status == "False"
    }
}

/// Normalize a Kubernetes node into a `NodeStatus`
pub fn node_status(node: &Node) -> Result<NodeStatus, ProbeError> {
    let name = node.name_any();
    let conditions = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .ok_or_else(|| ProbeError::MissingStatus {
            resource: format!("node/{name}"),
        })?;

    Ok(NodeStatus {
        conditions: conditions
            .iter()
            .map(|c| NodeCondition::new(&c.type_, condition_is_healthy(&c.type_, &c.status)))
            .collect(),
        name,
    })
}

/// A job is running until it carries a true `Complete` or `Failed` condition
#[must_use]
pub fn job_is_running(job: &Job) -> bool {
    let Some(status) = job.status.as_ref() else {
        return true;
    };

    !status.conditions.iter().flatten().any(|condition| {
        (condition.type_ == JOB_COMPLETE || condition.type_ == JOB_FAILED)
            && condition.status == "True"
    })
}

/// Allocatable resources reported by a single node
pub fn allocatable(node: &Node) -> Result<ClusterCapacity, ProbeError> {
    let name = node.name_any();
    let Some(resources) = node
        .status
        .as_ref()
        .and_then(|status| status.allocatable.as_ref())
    else {
        return Ok(ClusterCapacity::default());
    };

    let read = |key: &str, parse: fn(&str) -> Option<u64>| -> Result<u64, ProbeError> {
        match resources.get(key) {
            None => Ok(0),
            Some(value) => parse(&value.0).ok_or_else(|| ProbeError::InvalidQuantity {
                resource: format!("node/{name} {key}"),
                value: value.0.clone(),
            }),
        }
    };

    Ok(ClusterCapacity {
        cpu_millis: read("cpu", quantity::cpu_millis)?,
        memory_bytes: read("memory", quantity::whole_units)?,
        pods: read("pods", quantity::whole_units)?,
    })
}
