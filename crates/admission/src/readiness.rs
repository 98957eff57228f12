//! # Readiness Evaluator
//!
//! Decides whether new workflow submissions may be admitted. Groups and the
//! conditions inside them run strictly in declaration order and evaluation
//! stops at the first condition that is not met; later conditions, some of
//! which are network calls, never run.

use std::sync::Arc;

use tracing::{debug, info};

use crate::conditions::{Condition, ConditionRegistry};
use crate::config::{validate_groups, ConditionGroupConfig};
use crate::error::ConfigError;

/// Outcome of a readiness evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady { group: String, condition: String },
}

impl Readiness {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

struct ResolvedCondition {
    name: String,
    condition: Arc<dyn Condition>,
}

struct ResolvedGroup {
    name: String,
    conditions: Vec<ResolvedCondition>,
}

/// Walks condition groups against live cluster state.
///
/// Holds no mutable state and is safe to share across tasks.
pub struct ReadinessEvaluator {
    groups: Vec<ResolvedGroup>,
}

impl ReadinessEvaluator {
    /// Resolve every condition reference up front.
    ///
    /// An unknown condition name is a configuration error, not a failed check.
    pub fn new(
        groups: &[ConditionGroupConfig],
        registry: &ConditionRegistry,
    ) -> Result<Self, ConfigError> {
        validate_groups(groups)?;

        let groups = groups
            .iter()
            .map(|group| {
                let conditions = group
                    .conditions
                    .iter()
                    .map(|name| {
                        Ok(ResolvedCondition {
                            name: name.clone(),
                            condition: registry.resolve(&group.name, name)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                Ok(ResolvedGroup {
                    name: group.name.clone(),
                    conditions,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { groups })
    }

    /// Evaluate groups in order, stopping at the first unmet condition
    pub async fn check(&self) -> Readiness {
        for group in &self.groups {
            for resolved in &group.conditions {
                if !resolved.condition.check().await {
                    info!(
                        group = %group.name,
                        condition = %resolved.name,
                        "Admission blocked by unmet condition"
                    );
                    return Readiness::NotReady {
                        group: group.name.clone(),
                        condition: resolved.name.clone(),
                    };
                }
                debug!(
                    group = %group.name,
                    condition = %resolved.name,
                    "Condition met"
                );
            }
        }

        Readiness::Ready
    }

    /// Whether new workflows can be admitted right now
    pub async fn is_ready(&self) -> bool {
        self.check().await.is_ready()
    }

    /// Group names in evaluation order
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::from_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn recording(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        result: bool,
    ) -> Arc<dyn Condition> {
        let log = log.clone();
        from_fn(move || {
            log.lock().unwrap().push(name);
            result
        })
    }

    #[tokio::test]
    async fn stops_at_first_unmet_condition() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ConditionRegistry::new()
            .register("a", recording(&log, "a", true))
            .register("b", recording(&log, "b", false))
            .register("c", recording(&log, "c", true))
            .register("d", recording(&log, "d", true));
        let groups = vec![
            ConditionGroupConfig::new("first", &["a", "b", "c"]),
            ConditionGroupConfig::new("second", &["d"]),
        ];

        let evaluator = ReadinessEvaluator::new(&groups, &registry).unwrap();

        assert_eq!(
            evaluator.check().await,
            Readiness::NotReady {
                group: "first".to_string(),
                condition: "b".to_string(),
            }
        );
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn ready_when_every_condition_is_met() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ConditionRegistry::new()
            .register("a", recording(&log, "a", true))
            .register("b", recording(&log, "b", true))
            .register("c", recording(&log, "c", true));
        let groups = vec![
            ConditionGroupConfig::new("second", &["c", "a"]),
            ConditionGroupConfig::new("first", &["b"]),
        ];

        let evaluator = ReadinessEvaluator::new(&groups, &registry).unwrap();

        assert!(evaluator.is_ready().await);
        assert_eq!(*log.lock().unwrap(), vec!["c", "a", "b"]);
        assert_eq!(evaluator.group_names().collect::<Vec<_>>(), vec!["second", "first"]);
    }

    #[tokio::test]
    async fn later_groups_run_only_after_earlier_groups_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = calls.clone();
            from_fn(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };
        let registry = ConditionRegistry::new()
            .register("ok", counted)
            .register("blocked", from_fn(|| false));
        let groups = vec![
            ConditionGroupConfig::new("one", &["ok", "ok"]),
            ConditionGroupConfig::new("two", &["blocked", "ok"]),
        ];

        let evaluator = ReadinessEvaluator::new(&groups, &registry).unwrap();

        assert!(!evaluator.is_ready().await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unresolvable_condition_fails_construction() {
        let registry = ConditionRegistry::new().register("a", from_fn(|| true));
        let groups = vec![ConditionGroupConfig::new("g", &["a", "missing"])];

        assert!(matches!(
            ReadinessEvaluator::new(&groups, &registry),
            Err(ConfigError::UnknownCondition { .. })
        ));
    }

    #[test]
    fn empty_group_list_fails_construction() {
        let registry = ConditionRegistry::new();
        assert!(ReadinessEvaluator::new(&[], &registry).is_err());
    }
}
