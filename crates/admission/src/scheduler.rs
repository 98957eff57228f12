//! Task-scheduling backend.
//!
//! A workflow's scheduled execution unit is the batch Job labelled with its
//! workflow id. Revoking deletes that Job; with `terminate` the pods are
//! killed without a grace period instead of being allowed to wind down.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, DeleteParams, ListParams, PropagationPolicy};
use kube::{Client, Error as KubeError};
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

/// Cancels previously scheduled units of execution
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn revoke(&self, execution_id: &str, terminate: bool) -> Result<(), SchedulerError>;
}

/// `TaskScheduler` that revokes workflow execution Jobs through the Kubernetes API
#[derive(Clone)]
pub struct KubeTaskScheduler {
    client: Client,
    namespace: String,
    execution_label: String,
}

impl KubeTaskScheduler {
    #[must_use]
    pub fn new(client: Client, config: &SchedulerConfig) -> Self {
        Self {
            client,
            namespace: config.namespace.clone(),
            execution_label: config.execution_label.clone(),
        }
    }

    fn selector(&self, execution_id: &str) -> String {
        execution_selector(&self.execution_label, execution_id)
    }
}

/// Label selector matching the execution Job of a workflow
#[must_use]
pub fn execution_selector(label: &str, execution_id: &str) -> String {
    format!("{label}={execution_id}")
}

/// Delete parameters for a revocation
#[must_use]
pub fn revoke_params(terminate: bool) -> DeleteParams {
    DeleteParams {
        grace_period_seconds: terminate.then_some(0),
        propagation_policy: Some(PropagationPolicy::Background),
        ..Default::default()
    }
}

#[async_trait]
impl TaskScheduler for KubeTaskScheduler {
    async fn revoke(&self, execution_id: &str, terminate: bool) -> Result<(), SchedulerError> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), &self.namespace);
        let lp = ListParams::default().labels(&self.selector(execution_id));

        match jobs.delete_collection(&revoke_params(terminate), &lp).await {
            Ok(_) => {
                info!(
                    execution_id = %execution_id,
                    namespace = %self.namespace,
                    terminate = terminate,
                    "Revoked workflow execution"
                );
                Ok(())
            }
            Err(KubeError::Api(err)) if err.code == 404 => {
                debug!(
                    execution_id = %execution_id,
                    "Workflow execution already gone"
                );
                Ok(())
            }
            Err(e) => Err(SchedulerError::Kube(e)),
        }
    }
}
