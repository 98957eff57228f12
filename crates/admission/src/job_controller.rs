//! Job controller client.
//!
//! Jobs spawned by a workflow are owned by the job controller service; this
//! client asks it to delete them one at a time.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JobControllerConfig;
use crate::error::JobControllerError;

/// Parsed body of a job deletion response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDeletion {
    #[serde(default, alias = "job_id")]
    pub job_id: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Raw HTTP response of a job deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Client for the job controller service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobControllerClient: Send + Sync {
    /// Delete a single job by identifier
    async fn delete_job(&self, job_id: &str)
        -> Result<(JobDeletion, RawResponse), JobControllerError>;
}

/// `JobControllerClient` speaking HTTP to the job controller
#[derive(Clone)]
pub struct HttpJobControllerClient {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpJobControllerClient {
    pub fn new(config: &JobControllerConfig) -> Result<Self, JobControllerError> {
        let invalid = |message: String| JobControllerError::InvalidUrl {
            url: config.url.clone(),
            message,
        };

        let base_url = Url::parse(&config.url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(invalid("expected an http:// or https:// URL".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { base_url, client })
    }

    /// `{base}/jobs/{job_id}` with the id escaped as a single path segment
    fn job_url(&self, job_id: &str) -> Result<Url, JobControllerError> {
        if job_id.is_empty() || job_id == "." || job_id == ".." {
            return Err(JobControllerError::InvalidJobId(job_id.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| JobControllerError::InvalidUrl {
                url: self.base_url.to_string(),
                message: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push("jobs")
            .push(job_id);
        Ok(url)
    }
}

#[async_trait]
impl JobControllerClient for HttpJobControllerClient {
    async fn delete_job(
        &self,
        job_id: &str,
    ) -> Result<(JobDeletion, RawResponse), JobControllerError> {
        let response = self.client.delete(self.job_url(job_id)?).send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(job_id = %job_id, status = status.as_u16(), "Job controller responded");

        if !status.is_success() {
            return Err(JobControllerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let deletion = serde_json::from_str(&body).unwrap_or_default();
        Ok((
            deletion,
            RawResponse {
                status: status.as_u16(),
                body,
            },
        ))
    }
}
