//! Bulk server-side jobs: exports and dataset migrations.
//!
//! A [`Query`](crate::Query) does not run these itself; it serializes its
//! filter/field/limit configuration and hands it to a [`BulkJobs`]
//! collaborator, which returns a [`BulkJob`] handle that can be polled to
//! completion.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Query configuration carried by an export or migration request.
///
/// Pagination-only parameters (offset, ordering) are deliberately absent:
/// bulk jobs consume the whole filtered result set server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_fields: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub genome_build: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// Request to export a query's result set.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRequest {
    pub dataset: String,
    #[serde(flatten)]
    pub params: JobParams,
}

/// Request to copy a query's result set into another dataset.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationRequest {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub params: JobParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled
        )
    }
}

/// Polling policy for [`BulkJob::follow`].
#[derive(Debug, Clone, Copy)]
pub struct Follow {
    pub poll_interval: Duration,
    /// Give up after this long; `None` polls until the job is terminal.
    pub deadline: Option<Duration>,
}

impl Default for Follow {
    fn default() -> Self {
        Follow {
            poll_interval: Duration::from_secs(3),
            deadline: None,
        }
    }
}

/// Handle on a running bulk job.
pub trait BulkJob: std::fmt::Debug {
    fn id(&self) -> &str;

    fn status(&self) -> Result<JobStatus>;

    /// Blocks until the job reaches a terminal status, checking at
    /// `follow.poll_interval` and giving up at `follow.deadline`.
    fn follow(&self, follow: Follow) -> Result<JobStatus> {
        let started = Instant::now();
        loop {
            let status = self.status()?;
            if status.is_terminal() {
                return Ok(status);
            }
            if let Some(deadline) = follow.deadline {
                if started.elapsed() + follow.poll_interval > deadline {
                    return Err(Error::RemoteQuery(format!(
                        "job {} still {:?} after {:?}",
                        self.id(),
                        status,
                        deadline
                    )));
                }
            }
            tracing::debug!(job = self.id(), ?status, "waiting for bulk job");
            std::thread::sleep(follow.poll_interval);
        }
    }
}

/// Factory for bulk jobs.
pub trait BulkJobs: Send + Sync {
    fn create_export(&self, request: &ExportRequest) -> Result<Box<dyn BulkJob>>;

    fn create_migration(&self, request: &MigrationRequest) -> Result<Box<dyn BulkJob>>;
}
