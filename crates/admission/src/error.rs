//! Error types for the admission gate and cancellation path.

use thiserror::Error;

/// Errors raised by the cluster state probe.
///
/// These never leave a readiness condition: every condition maps them to
/// "not met" after logging.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Kubernetes API call failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource returned without the status block we need
    #[error("{resource} has no status")]
    MissingStatus { resource: String },

    /// A resource quantity could not be parsed
    #[error("Invalid quantity {value:?} on {resource}")]
    InvalidQuantity { resource: String, value: String },
}

/// Configuration errors. These are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown condition group: {0}")]
    UnknownGroup(String),

    #[error("Condition group {group} references unknown condition {condition}")]
    UnknownCondition { group: String, condition: String },

    #[error("Condition group {0} is declared more than once")]
    DuplicateGroup(String),

    #[error("Condition group {0} has no conditions")]
    EmptyGroup(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Errors from the task-scheduling backend.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Errors from the job controller client.
#[derive(Debug, Error)]
pub enum JobControllerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Job controller answered with a non-success status
    #[error("Job controller returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid job controller URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Job id that cannot be addressed as a single path segment
    #[error("Invalid job id {0:?}")]
    InvalidJobId(String),
}

/// Errors raised while stopping a workflow or queueing a stop request.
#[derive(Debug, Error)]
pub enum CancellationError {
    #[error("Revocation failed: {0}")]
    Revoke(#[from] SchedulerError),

    #[error("Deleting job {job_id} failed: {source}")]
    DeleteJob {
        job_id: String,
        #[source]
        source: JobControllerError,
    },

    #[error("Cancellation queue is full")]
    QueueFull,

    #[error("Cancellation queue is closed")]
    QueueClosed,
}
