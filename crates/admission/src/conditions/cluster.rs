//! Built-in conditions over the cluster state probe.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use super::Condition;
use crate::config::CapacityConfig;
use crate::error::ConfigError;
use crate::probe::{ClusterCapacity, ClusterProbe};

/// Every flag on every node must be healthy. Any red light halts admission.
pub struct NodeHealthCondition {
    probe: Arc<dyn ClusterProbe>,
}

impl NodeHealthCondition {
    #[must_use]
    pub fn new(probe: Arc<dyn ClusterProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl Condition for NodeHealthCondition {
    async fn check(&self) -> bool {
        let nodes = match self.probe.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!(error = %e, "Failed to get node information");
                return false;
            }
        };

        for node in &nodes {
            if let Some(condition) = node.first_unhealthy() {
                warn!(
                    node = %node.name,
                    condition = %condition.kind,
                    "Node reports an unhealthy condition"
                );
                return false;
            }
        }

        debug!(nodes = nodes.len(), "All node conditions healthy");
        true
    }
}

/// Running jobs must be at or below the configured maximum
pub struct JobCapacityCondition {
    probe: Arc<dyn ClusterProbe>,
    maximum_concurrent_jobs: usize,
}

impl JobCapacityCondition {
    #[must_use]
    pub fn new(probe: Arc<dyn ClusterProbe>, maximum_concurrent_jobs: usize) -> Self {
        Self {
            probe,
            maximum_concurrent_jobs,
        }
    }
}

#[async_trait]
impl Condition for JobCapacityCondition {
    async fn check(&self) -> bool {
        match self.probe.count_running_jobs().await {
            Ok(running) if running > self.maximum_concurrent_jobs => {
                warn!(
                    running = running,
                    maximum = self.maximum_concurrent_jobs,
                    "Running job limit reached"
                );
                false
            }
            Ok(running) => {
                debug!(
                    running = running,
                    maximum = self.maximum_concurrent_jobs,
                    "Running jobs within limit"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to get running job list");
                false
            }
        }
    }
}

/// Ready nodes must together offer at least the configured allocatable resources
pub struct MinimumCapacityCondition {
    probe: Arc<dyn ClusterProbe>,
    minimum: ClusterCapacity,
}

impl MinimumCapacityCondition {
    #[must_use]
    pub fn new(probe: Arc<dyn ClusterProbe>, minimum: ClusterCapacity) -> Self {
        Self { probe, minimum }
    }

    pub fn from_config(
        probe: Arc<dyn ClusterProbe>,
        capacity: &CapacityConfig,
    ) -> Result<Self, ConfigError> {
        let minimum = ClusterCapacity {
            cpu_millis: capacity.minimum_cpu_millis()?,
            memory_bytes: capacity.minimum_memory_bytes()?,
            pods: capacity.minimum_pods,
        };
        Ok(Self::new(probe, minimum))
    }

    fn shortfall(&self, available: &ClusterCapacity) -> Option<&'static str> {
        if available.cpu_millis < self.minimum.cpu_millis {
            Some("cpu")
        } else if available.memory_bytes < self.minimum.memory_bytes {
            Some("memory")
        } else if available.pods < self.minimum.pods {
            Some("pods")
        } else {
            None
        }
    }
}

#[async_trait]
impl Condition for MinimumCapacityCondition {
    async fn check(&self) -> bool {
        let available = match self.probe.cluster_capacity().await {
            Ok(available) => available,
            Err(e) => {
                error!(error = %e, "Failed to get cluster capacity");
                return false;
            }
        };

        if let Some(resource) = self.shortfall(&available) {
            warn!(
                resource = resource,
                available = ?available,
                minimum = ?self.minimum,
                "Cluster capacity below minimum"
            );
            return false;
        }

        true
    }
}
