//! Fire-and-forget submission of stop requests to a pool of tokio workers.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CancellationCoordinator, CancellationStatus, WorkflowStopRequest};
use crate::config::CancellationConfig;
use crate::error::CancellationError;

/// Status records kept for slow subscribers before they start lagging
const STATUS_CHANNEL_CAPACITY: usize = 128;

type SharedReceiver = Arc<Mutex<mpsc::Receiver<WorkflowStopRequest>>>;

/// Handle for submitting stop requests
#[derive(Clone)]
pub struct CancellationQueue {
    sender: mpsc::Sender<WorkflowStopRequest>,
    statuses: broadcast::Sender<CancellationStatus>,
    shutdown: CancellationToken,
}

/// Worker tasks draining the queue
pub struct CancellationWorkers {
    handles: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl CancellationQueue {
    /// Spawn the worker pool and return the submission handle
    #[must_use]
    pub fn start(
        coordinator: Arc<CancellationCoordinator>,
        config: &CancellationConfig,
    ) -> (Self, CancellationWorkers) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (statuses, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let receiver: SharedReceiver = Arc::new(Mutex::new(receiver));
        let shutdown = CancellationToken::new();

        let handles = (0..config.workers.max(1))
            .map(|index| {
                tokio::spawn(run_worker(
                    format!("worker-{index}"),
                    coordinator.clone(),
                    receiver.clone(),
                    statuses.clone(),
                    shutdown.clone(),
                ))
            })
            .collect::<Vec<_>>();

        info!(
            workers = handles.len(),
            queue_capacity = config.queue_capacity,
            "Cancellation workers started"
        );

        (
            Self {
                sender,
                statuses,
                shutdown: shutdown.clone(),
            },
            CancellationWorkers { handles, shutdown },
        )
    }

    /// Queue a stop request. Returns as soon as the request is queued.
    pub fn submit(&self, request: WorkflowStopRequest) -> Result<(), CancellationError> {
        if self.shutdown.is_cancelled() {
            return Err(CancellationError::QueueClosed);
        }

        let workflow_id = request.workflow_id.clone();
        match self.sender.try_send(request) {
            Ok(()) => {
                debug!(workflow_id = %workflow_id, "Queued workflow stop");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(workflow_id = %workflow_id, "Cancellation queue full");
                Err(CancellationError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(CancellationError::QueueClosed),
        }
    }

    /// Subscribe to status records of stops processed from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CancellationStatus> {
        self.statuses.subscribe()
    }
}

impl CancellationWorkers {
    /// Stop accepting requests, finish queued stops and wait for the workers
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Cancellation worker ended abnormally");
            }
        }
        info!("Cancellation workers stopped");
    }
}

async fn run_worker(
    worker_id: String,
    coordinator: Arc<CancellationCoordinator>,
    receiver: SharedReceiver,
    statuses: broadcast::Sender<CancellationStatus>,
    shutdown: CancellationToken,
) {
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            let received = tokio::select! {
                biased;
                request = receiver.recv() => Some(request),
                () = shutdown.cancelled() => None,
            };
            // After shutdown, refuse new sends and drain whatever is already queued
            received.unwrap_or_else(|| {
                receiver.close();
                receiver.try_recv().ok()
            })
        };

        let Some(request) = next else {
            break;
        };

        // No subscribers is not an error
        let _ = statuses.send(CancellationStatus::running(&request.workflow_id, &worker_id));
        let status = coordinator.execute(&request, &worker_id).await;
        let _ = statuses.send(status);
    }

    debug!(worker_id = %worker_id, "Cancellation worker exiting");
}
