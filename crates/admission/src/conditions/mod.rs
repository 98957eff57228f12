//! # Condition Registry
//!
//! Readiness conditions are zero-argument async predicates registered under a
//! name. Condition groups in the configuration refer to them by that name;
//! references are resolved once when the readiness evaluator is built, so an
//! unknown name fails startup instead of failing a readiness check.

pub mod cluster;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CapacityConfig;
use crate::error::ConfigError;
use crate::probe::ClusterProbe;

pub use cluster::{JobCapacityCondition, MinimumCapacityCondition, NodeHealthCondition};

/// Every node condition flag must be healthy
pub const NODE_HEALTH: &str = "node-health";
/// Running jobs must not exceed the configured maximum
pub const JOB_CAPACITY: &str = "job-capacity";
/// Ready nodes must offer the configured minimum allocatable resources
pub const MINIMUM_CAPACITY: &str = "minimum-capacity";

/// A named boolean predicate evaluated against live cluster state.
///
/// Implementations must not fail outward: probe errors are logged and turned
/// into `false`.
#[async_trait]
pub trait Condition: Send + Sync {
    async fn check(&self) -> bool;
}

/// Condition backed by a synchronous closure
pub struct FnCondition<F> {
    predicate: F,
}

#[async_trait]
impl<F> Condition for FnCondition<F>
where
    F: Fn() -> bool + Send + Sync,
{
    async fn check(&self) -> bool {
        (self.predicate)()
    }
}

/// Wrap a closure as a condition
pub fn from_fn<F>(predicate: F) -> Arc<dyn Condition>
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    Arc::new(FnCondition { predicate })
}

/// Name to condition mapping, populated at startup
#[derive(Clone, Default)]
pub struct ConditionRegistry {
    conditions: BTreeMap<String, Arc<dyn Condition>>,
}

impl ConditionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in cluster conditions
    pub fn with_builtins(
        probe: Arc<dyn ClusterProbe>,
        capacity: &CapacityConfig,
    ) -> Result<Self, ConfigError> {
        let minimum_capacity = MinimumCapacityCondition::from_config(probe.clone(), capacity)?;

        Ok(Self::new()
            .register(NODE_HEALTH, Arc::new(NodeHealthCondition::new(probe.clone())))
            .register(
                JOB_CAPACITY,
                Arc::new(JobCapacityCondition::new(
                    probe,
                    capacity.maximum_concurrent_jobs,
                )),
            )
            .register(MINIMUM_CAPACITY, Arc::new(minimum_capacity)))
    }

    /// Register a condition, replacing any previous one with the same name
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, condition: Arc<dyn Condition>) -> Self {
        self.conditions.insert(name.into(), condition);
        self
    }

    /// Resolve a condition referenced from `group`
    pub fn resolve(&self, group: &str, name: &str) -> Result<Arc<dyn Condition>, ConfigError> {
        self.conditions
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownCondition {
                group: group.to_string(),
                condition: name.to_string(),
            })
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MockClusterProbe;

    #[tokio::test]
    async fn resolves_registered_conditions() {
        let registry = ConditionRegistry::new()
            .register("always", from_fn(|| true))
            .register("never", from_fn(|| false));

        assert!(registry.resolve("g", "always").unwrap().check().await);
        assert!(!registry.resolve("g", "never").unwrap().check().await);
    }

    #[test]
    fn unknown_condition_is_a_config_error() {
        let registry = ConditionRegistry::new();
        let err = registry.resolve("cluster-health", "gpu-quota").err().unwrap();
        assert!(matches!(
            err,
            ConfigError::UnknownCondition { ref group, ref condition }
                if group == "cluster-health" && condition == "gpu-quota"
        ));
    }

    #[test]
    fn builtins_are_registered() {
        let probe: Arc<dyn ClusterProbe> = Arc::new(MockClusterProbe::new());
        let registry =
            ConditionRegistry::with_builtins(probe, &CapacityConfig::default()).unwrap();

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec![JOB_CAPACITY, MINIMUM_CAPACITY, NODE_HEALTH]
        );
    }

    #[test]
    fn builtins_reject_malformed_minimums() {
        let probe: Arc<dyn ClusterProbe> = Arc::new(MockClusterProbe::new());
        let capacity = CapacityConfig {
            minimum_cpu: "two".to_string(),
            ..CapacityConfig::default()
        };
        assert!(ConditionRegistry::with_builtins(probe, &capacity).is_err());
    }
}
