/*
 * 5D Labs Agent Platform - Workflow Admission
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::doc_markdown)]

//! Workflow admission library
//!
//! Two pieces of decision logic for the workflow platform:
//!
//! - a readiness gate that decides whether the cluster has enough healthy
//!   nodes and spare job capacity to admit new workflows
//!   ([`ReadinessEvaluator`] over a [`ConditionRegistry`])
//! - a cancellation path that revokes a running workflow and deletes the
//!   jobs it spawned ([`CancellationCoordinator`], queued through
//!   [`CancellationQueue`])
//!
//! Both are advisory and eventually consistent; neither holds shared mutable
//! state.

pub mod cancel;
pub mod conditions;
pub mod config;
pub mod error;
pub mod job_controller;
pub mod probe;
pub mod quantity;
pub mod readiness;
pub mod scheduler;
pub mod server;

// Re-export commonly used types
pub use cancel::{
    CancellationCoordinator, CancellationQueue, CancellationState, CancellationStatus,
    CancellationWorkers, WorkflowStopRequest,
};
pub use conditions::{Condition, ConditionRegistry};
pub use config::{AdmissionConfig, ConditionGroupConfig};
pub use error::{CancellationError, ConfigError, JobControllerError, ProbeError, SchedulerError};
pub use job_controller::{HttpJobControllerClient, JobControllerClient};
pub use probe::{ClusterProbe, KubeClusterProbe, NodeStatus};
pub use readiness::{Readiness, ReadinessEvaluator};
pub use scheduler::{KubeTaskScheduler, TaskScheduler};
