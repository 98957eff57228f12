//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use admission::error::{JobControllerError, ProbeError, SchedulerError};
use admission::job_controller::{JobDeletion, RawResponse};
use admission::probe::{ClusterCapacity, NodeCondition};
use admission::{ClusterProbe, JobControllerClient, NodeStatus, TaskScheduler};
use async_trait::async_trait;

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn node(name: &str, flags: &[(&str, bool)]) -> NodeStatus {
    NodeStatus {
        name: name.to_string(),
        conditions: flags
            .iter()
            .map(|(kind, healthy)| NodeCondition::new(*kind, *healthy))
            .collect(),
    }
}

pub fn healthy_node(name: &str) -> NodeStatus {
    node(
        name,
        &[
            ("MemoryPressure", true),
            ("DiskPressure", true),
            ("PIDPressure", true),
            ("Ready", true),
        ],
    )
}

/// Probe serving canned cluster state and counting calls
#[derive(Default)]
pub struct FakeProbe {
    pub nodes: Option<Vec<NodeStatus>>,
    pub running_jobs: Option<usize>,
    pub capacity: Option<ClusterCapacity>,
    pub node_calls: AtomicUsize,
    pub job_calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new(nodes: Vec<NodeStatus>, running_jobs: usize) -> Self {
        Self {
            nodes: Some(nodes),
            running_jobs: Some(running_jobs),
            ..Self::default()
        }
    }

    pub fn node_calls(&self) -> usize {
        self.node_calls.load(Ordering::SeqCst)
    }

    pub fn job_calls(&self) -> usize {
        self.job_calls.load(Ordering::SeqCst)
    }
}

fn unreachable_api() -> ProbeError {
    ProbeError::MissingStatus {
        resource: "apiserver".to_string(),
    }
}

#[async_trait]
impl ClusterProbe for FakeProbe {
    async fn list_nodes(&self) -> Result<Vec<NodeStatus>, ProbeError> {
        self.node_calls.fetch_add(1, Ordering::SeqCst);
        self.nodes.clone().ok_or_else(unreachable_api)
    }

    async fn count_running_jobs(&self) -> Result<usize, ProbeError> {
        self.job_calls.fetch_add(1, Ordering::SeqCst);
        self.running_jobs.ok_or_else(unreachable_api)
    }

    async fn cluster_capacity(&self) -> Result<ClusterCapacity, ProbeError> {
        self.capacity.ok_or_else(unreachable_api)
    }
}

pub struct RecordingScheduler {
    pub calls: CallLog,
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn revoke(&self, execution_id: &str, terminate: bool) -> Result<(), SchedulerError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("revoke:{execution_id}:{terminate}"));
        Ok(())
    }
}

pub struct RecordingJobs {
    pub calls: CallLog,
    pub failing: Vec<String>,
}

#[async_trait]
impl JobControllerClient for RecordingJobs {
    async fn delete_job(
        &self,
        job_id: &str,
    ) -> Result<(JobDeletion, RawResponse), JobControllerError> {
        self.calls.lock().unwrap().push(format!("delete:{job_id}"));
        if self.failing.iter().any(|failing| failing == job_id) {
            return Err(JobControllerError::Status {
                status: 500,
                body: "transport failure".to_string(),
            });
        }
        Ok((
            JobDeletion {
                job_id: Some(job_id.to_string()),
                message: None,
            },
            RawResponse {
                status: 200,
                body: format!(r#"{{"job_id":"{job_id}"}}"#),
            },
        ))
    }
}

pub fn recording_pair(failing: &[&str]) -> (Arc<RecordingScheduler>, Arc<RecordingJobs>, CallLog) {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    (
        Arc::new(RecordingScheduler {
            calls: calls.clone(),
        }),
        Arc::new(RecordingJobs {
            calls: calls.clone(),
            failing: failing.iter().map(ToString::to_string).collect(),
        }),
        calls,
    )
}
