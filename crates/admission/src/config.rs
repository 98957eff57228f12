//! Admission controller configuration
//!
//! Loaded once at startup from a mounted YAML file and immutable afterwards.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::conditions::{JOB_CAPACITY, NODE_HEALTH};
use crate::error::ConfigError;
use crate::quantity;

/// Environment override for `capacity.maximumConcurrentJobs`
const ENV_MAXIMUM_CONCURRENT_JOBS: &str = "MAXIMUM_CONCURRENT_JOBS";
/// Environment override for `jobController.url`
const ENV_JOB_CONTROLLER_URL: &str = "JOB_CONTROLLER_URL";
/// Environment override for `scheduler.namespace`
const ENV_NAMESPACE: &str = "ADMISSION_NAMESPACE";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionConfig {
    #[serde(default)]
    pub readiness: ReadinessConfig,

    #[serde(default)]
    pub capacity: CapacityConfig,

    #[serde(default)]
    pub job_controller: JobControllerConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub cancellation: CancellationConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Readiness gate configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessConfig {
    /// Condition groups, evaluated in declaration order
    #[serde(default = "default_condition_groups")]
    pub condition_groups: Vec<ConditionGroupConfig>,
}

/// A named, ordered list of condition references
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConditionGroupConfig {
    pub name: String,
    pub conditions: Vec<String>,
}

impl ConditionGroupConfig {
    pub fn new(name: impl Into<String>, conditions: &[&str]) -> Self {
        Self {
            name: name.into(),
            conditions: conditions.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Cluster capacity thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityConfig {
    /// Upper bound on running jobs across all namespaces
    #[serde(default = "default_maximum_concurrent_jobs")]
    pub maximum_concurrent_jobs: usize,

    /// Minimum allocatable CPU across ready nodes (Kubernetes quantity)
    #[serde(default = "default_minimum_cpu")]
    pub minimum_cpu: String,

    /// Minimum allocatable memory across ready nodes (Kubernetes quantity)
    #[serde(default = "default_minimum_memory")]
    pub minimum_memory: String,

    /// Minimum allocatable pod slots across ready nodes
    #[serde(default = "default_minimum_pods")]
    pub minimum_pods: u64,
}

/// Job controller client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobControllerConfig {
    #[serde(default = "default_job_controller_url")]
    pub url: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Task-scheduling backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Namespace holding workflow execution Jobs
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Label that carries the workflow id on its execution Job
    #[serde(default = "default_execution_label")]
    pub execution_label: String,
}

/// Cancellation worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Requests running longer than this are answered with 408
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_condition_groups() -> Vec<ConditionGroupConfig> {
    vec![ConditionGroupConfig::new(
        "cluster-health",
        &[NODE_HEALTH, JOB_CAPACITY],
    )]
}

fn default_maximum_concurrent_jobs() -> usize {
    10
}

fn default_minimum_cpu() -> String {
    "2500m".to_string()
}

fn default_minimum_memory() -> String {
    "4Gi".to_string()
}

fn default_minimum_pods() -> u64 {
    4
}

fn default_job_controller_url() -> String {
    "http://job-controller:5000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_execution_label() -> String {
    "workflow.admission.dev/execution-id".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    60
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            condition_groups: default_condition_groups(),
        }
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            maximum_concurrent_jobs: default_maximum_concurrent_jobs(),
            minimum_cpu: default_minimum_cpu(),
            minimum_memory: default_minimum_memory(),
            minimum_pods: default_minimum_pods(),
        }
    }
}

impl Default for JobControllerConfig {
    fn default() -> Self {
        Self {
            url: default_job_controller_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            execution_label: default_execution_label(),
        }
    }
}

impl Default for CancellationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl CapacityConfig {
    /// Minimum CPU in millicores
    pub fn minimum_cpu_millis(&self) -> Result<u64, ConfigError> {
        quantity::cpu_millis(&self.minimum_cpu).ok_or_else(|| {
            ConfigError::Invalid(format!("capacity.minimumCpu {:?}", self.minimum_cpu))
        })
    }

    /// Minimum memory in bytes
    pub fn minimum_memory_bytes(&self) -> Result<u64, ConfigError> {
        quantity::whole_units(&self.minimum_memory).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "capacity.minimumMemory {:?}",
                self.minimum_memory
            ))
        })
    }
}

impl AdmissionConfig {
    /// Parse configuration from YAML and apply environment overrides
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: AdmissionConfig = serde_yaml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a mounted ConfigMap file
    pub fn from_mounted_file(config_path: &str) -> Result<Self, ConfigError> {
        let config_str =
            std::fs::read_to_string(config_path).map_err(|source| ConfigError::Io {
                path: config_path.to_string(),
                source,
            })?;
        Self::from_yaml(&config_str)
    }

    /// Load from `config_path`, falling back to defaults only when the file does not exist.
    /// Unreadable or malformed files are errors.
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        match Self::from_mounted_file(config_path) {
            Ok(config) => {
                debug!(path = %config_path, "Loaded admission configuration");
                Ok(config)
            }
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                warn!(path = %config_path, "Configuration file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
            Err(e) => Err(e),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(ENV_MAXIMUM_CONCURRENT_JOBS) {
            match raw.trim().parse::<usize>() {
                Ok(value) => self.capacity.maximum_concurrent_jobs = value,
                Err(e) => warn!(
                    value = %raw,
                    error = %e,
                    "Ignoring invalid {ENV_MAXIMUM_CONCURRENT_JOBS}"
                ),
            }
        }
        if let Ok(url) = std::env::var(ENV_JOB_CONTROLLER_URL) {
            self.job_controller.url = url;
        }
        if let Ok(namespace) = std::env::var(ENV_NAMESPACE) {
            self.scheduler.namespace = namespace;
        }
    }

    /// Look up a condition group by name
    pub fn condition_group(&self, name: &str) -> Result<&ConditionGroupConfig, ConfigError> {
        self.readiness
            .condition_groups
            .iter()
            .find(|group| group.name == name)
            .ok_or_else(|| ConfigError::UnknownGroup(name.to_string()))
    }

    /// Validate the configuration; any error is fatal at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_groups(&self.readiness.condition_groups)?;

        self.capacity.minimum_cpu_millis()?;
        self.capacity.minimum_memory_bytes()?;

        if self.job_controller.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "jobController.timeoutSeconds must be greater than zero".to_string(),
            ));
        }
        if self.cancellation.workers == 0 {
            return Err(ConfigError::Invalid(
                "cancellation.workers must be greater than zero".to_string(),
            ));
        }
        if self.cancellation.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "cancellation.queueCapacity must be greater than zero".to_string(),
            ));
        }
        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "server.requestTimeoutSeconds must be greater than zero".to_string(),
            ));
        }
        if self.scheduler.execution_label.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "scheduler.executionLabel must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Groups must be present, uniquely named and non-empty
pub fn validate_groups(groups: &[ConditionGroupConfig]) -> Result<(), ConfigError> {
    if groups.is_empty() {
        return Err(ConfigError::Invalid(
            "readiness.conditionGroups must declare at least one group".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for group in groups {
        if !seen.insert(group.name.as_str()) {
            return Err(ConfigError::DuplicateGroup(group.name.clone()));
        }
        if group.conditions.is_empty() {
            return Err(ConfigError::EmptyGroup(group.name.clone()));
        }
    }

    Ok(())
}
