//! # Workflow Cancellation
//!
//! Stopping a workflow revokes its scheduled execution and then deletes each
//! job it spawned, in order. The operation is best effort: the first failure
//! is logged and ends the stop, so jobs after the failing one are left alone.
//!
//! ## Components
//!
//! - **`CancellationCoordinator`**: the stop protocol itself
//! - **`CancellationQueue`**: fire-and-forget submission to a tokio worker pool
//! - **`CancellationStatus`**: side-channel record of each stop, published to
//!   subscribers and never returned to the requester
//!
//! ## Usage
//!
//! ```rust,ignore
//! let coordinator = Arc::new(CancellationCoordinator::new(scheduler, job_controller));
//! let (queue, workers) = CancellationQueue::start(coordinator, &config.cancellation);
//!
//! queue.submit(WorkflowStopRequest::new("3f1c...", vec!["job-1".into()]))?;
//!
//! workers.shutdown().await;
//! ```

pub mod coordinator;
pub mod queue;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use coordinator::CancellationCoordinator;
pub use queue::{CancellationQueue, CancellationWorkers};

/// Request to stop a workflow and the jobs known to belong to it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStopRequest {
    pub workflow_id: String,
    #[serde(default)]
    pub job_ids: Vec<String>,
}

impl WorkflowStopRequest {
    pub fn new(workflow_id: impl Into<String>, job_ids: Vec<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            job_ids,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationState {
    Running,
    Completed,
    Failed,
}

/// Record of a single stop, for observers only
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationStatus {
    pub workflow_id: String,
    pub status: CancellationState,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub worker_id: String,
    pub deleted_jobs: Vec<String>,
    pub skipped_jobs: Vec<String>,
}

impl CancellationStatus {
    fn running(workflow_id: &str, worker_id: &str) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            status: CancellationState::Running,
            start_time: Some(Utc::now()),
            end_time: None,
            error: None,
            worker_id: worker_id.to_string(),
            deleted_jobs: Vec::new(),
            skipped_jobs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_request_uses_camel_case() {
        let request: WorkflowStopRequest =
            serde_json::from_str(r#"{"workflowId":"wf-1","jobIds":["a","b"]}"#).unwrap();
        assert_eq!(request, WorkflowStopRequest::new("wf-1", vec!["a".into(), "b".into()]));

        let request: WorkflowStopRequest = serde_json::from_str(r#"{"workflowId":"wf-2"}"#).unwrap();
        assert!(request.job_ids.is_empty());
    }

    #[test]
    fn status_serializes_state_in_lowercase() {
        let status = CancellationStatus::running("wf-1", "worker-0");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["workerId"], "worker-0");
    }
}
