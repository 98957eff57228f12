//! Workflow stop protocol, inline and through the worker pool.

mod common;

use std::sync::Arc;
use std::time::Duration;

use admission::config::CancellationConfig;
use admission::{
    CancellationCoordinator, CancellationQueue, CancellationState, CancellationStatus,
    WorkflowStopRequest,
};
use common::recording_pair;
use tokio::sync::broadcast;

fn jobs(ids: &[&str]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

async fn final_status(statuses: &mut broadcast::Receiver<CancellationStatus>) -> CancellationStatus {
    loop {
        let status = tokio::time::timeout(Duration::from_secs(5), statuses.recv())
            .await
            .expect("status within timeout")
            .expect("status channel open");
        if status.status != CancellationState::Running {
            return status;
        }
    }
}

#[tokio::test]
async fn failing_deletion_skips_remaining_jobs() {
    let (scheduler, job_controller, calls) = recording_pair(&["j2"]);
    let coordinator = CancellationCoordinator::new(scheduler, job_controller);

    coordinator
        .stop_workflow("wf-1", &jobs(&["j1", "j2", "j3"]))
        .await;

    let calls = calls.lock().unwrap();
    assert_eq!(
        calls.iter().filter(|call| call.starts_with("revoke:")).count(),
        1
    );
    assert_eq!(*calls, vec!["revoke:wf-1:true", "delete:j1", "delete:j2"]);
}

#[tokio::test]
async fn empty_job_list_revokes_once() {
    let (scheduler, job_controller, calls) = recording_pair(&[]);
    let coordinator = CancellationCoordinator::new(scheduler, job_controller);

    coordinator.stop_workflow("wf-empty", &[]).await;

    assert_eq!(*calls.lock().unwrap(), vec!["revoke:wf-empty:true"]);
}

#[tokio::test]
async fn queued_stops_report_through_status_channel() {
    let (scheduler, job_controller, calls) = recording_pair(&["j2"]);
    let coordinator = Arc::new(CancellationCoordinator::new(scheduler, job_controller));
    let (queue, workers) = CancellationQueue::start(
        coordinator,
        &CancellationConfig {
            workers: 1,
            queue_capacity: 4,
        },
    );
    let mut statuses = queue.subscribe();

    queue
        .submit(WorkflowStopRequest::new("wf-1", jobs(&["j1", "j2", "j3"])))
        .unwrap();
    let status = final_status(&mut statuses).await;

    assert_eq!(status.status, CancellationState::Failed);
    assert_eq!(status.worker_id, "worker-0");
    assert_eq!(status.deleted_jobs, jobs(&["j1"]));
    assert_eq!(status.skipped_jobs, jobs(&["j3"]));

    queue
        .submit(WorkflowStopRequest::new("wf-2", jobs(&["j4"])))
        .unwrap();
    let status = final_status(&mut statuses).await;

    assert_eq!(status.workflow_id, "wf-2");
    assert_eq!(status.status, CancellationState::Completed);

    workers.shutdown().await;
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "revoke:wf-1:true",
            "delete:j1",
            "delete:j2",
            "revoke:wf-2:true",
            "delete:j4",
        ]
    );
}

#[tokio::test]
async fn full_queue_rejects_submissions() {
    let (scheduler, job_controller, _) = recording_pair(&[]);
    let coordinator = Arc::new(CancellationCoordinator::new(scheduler, job_controller));
    let (queue, workers) = CancellationQueue::start(
        coordinator,
        &CancellationConfig {
            workers: 1,
            queue_capacity: 1,
        },
    );

    let results: Vec<_> = (0..50)
        .map(|i| queue.submit(WorkflowStopRequest::new(format!("wf-{i}"), vec![])))
        .collect();

    assert!(results.iter().any(|result| matches!(
        result,
        Err(admission::CancellationError::QueueFull)
    )));

    workers.shutdown().await;
}
