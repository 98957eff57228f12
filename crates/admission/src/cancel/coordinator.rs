//! # Cancellation Coordinator
//!
//! Revokes a workflow's execution and deletes its jobs. Nothing escapes a stop:
//! the outcome is visible in logs and in the returned side-channel record only.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use super::{CancellationState, CancellationStatus, WorkflowStopRequest};
use crate::error::CancellationError;
use crate::job_controller::JobControllerClient;
use crate::scheduler::TaskScheduler;

/// Worker id recorded for stops run outside the worker pool
const INLINE_WORKER: &str = "inline";

#[derive(Clone)]
pub struct CancellationCoordinator {
    scheduler: Arc<dyn TaskScheduler>,
    job_controller: Arc<dyn JobControllerClient>,
}

impl CancellationCoordinator {
    #[must_use]
    pub fn new(
        scheduler: Arc<dyn TaskScheduler>,
        job_controller: Arc<dyn JobControllerClient>,
    ) -> Self {
        Self {
            scheduler,
            job_controller,
        }
    }

    /// Stop a workflow.
    ///
    /// Revokes the execution with forced termination, then deletes `job_ids`
    /// in order. The first failure is logged and ends the stop; remaining jobs
    /// are not attempted.
    pub async fn stop_workflow(&self, workflow_id: &str, job_ids: &[String]) {
        let request = WorkflowStopRequest::new(workflow_id, job_ids.to_vec());
        self.execute(&request, INLINE_WORKER).await;
    }

    /// Run a stop and describe what happened
    pub async fn execute(
        &self,
        request: &WorkflowStopRequest,
        worker_id: &str,
    ) -> CancellationStatus {
        let mut status = CancellationStatus::running(&request.workflow_id, worker_id);

        match self.run(request, &mut status.deleted_jobs).await {
            Ok(()) => {
                info!(
                    workflow_id = %request.workflow_id,
                    deleted = status.deleted_jobs.len(),
                    "Workflow stopped"
                );
                status.status = CancellationState::Completed;
            }
            Err(e) => {
                error!(
                    workflow_id = %request.workflow_id,
                    error = %e,
                    "Something went wrong while stopping workflow"
                );
                let attempted = match &e {
                    CancellationError::DeleteJob { .. } => status.deleted_jobs.len() + 1,
                    _ => 0,
                };
                status.skipped_jobs = request.job_ids.iter().skip(attempted).cloned().collect();
                status.status = CancellationState::Failed;
                status.error = Some(e.to_string());
            }
        }

        status.end_time = Some(Utc::now());
        status
    }

    async fn run(
        &self,
        request: &WorkflowStopRequest,
        deleted: &mut Vec<String>,
    ) -> Result<(), CancellationError> {
        let workflow_id = &request.workflow_id;

        info!(workflow_id = %workflow_id, "Stopping workflow execution");
        self.scheduler.revoke(workflow_id, true).await?;

        for job_id in &request.job_ids {
            info!(
                workflow_id = %workflow_id,
                job_id = %job_id,
                "Stopping job from workflow"
            );
            let (deletion, raw) = self
                .job_controller
                .delete_job(job_id)
                .await
                .map_err(|source| CancellationError::DeleteJob {
                    job_id: job_id.clone(),
                    source,
                })?;
            info!(
                workflow_id = %workflow_id,
                job_id = %job_id,
                response = ?deletion,
                http_status = raw.status,
                http_body = %raw.body,
                "Job deleted"
            );
            deleted.push(job_id.clone());
        }

        Ok(())
    }
}
