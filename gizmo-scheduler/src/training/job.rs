//! Training job records and their lifecycle transitions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use gizmo_common::JobStatus;

use crate::work::Work;

/// Message stored on jobs removed from the queue before they started.
pub const CANCELLED_MESSAGE: &str = "Cancelled by user.";

/// Snapshot of a training job as seen by callers.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingJob<T> {
    /// Unique job identifier.
    pub id: String,
    /// Human-readable name shown in the dashboard.
    pub name: String,
    /// Caller's estimate of how long the job takes.
    pub estimated_minutes: f64,
    pub status: JobStatus,
    /// Value returned by the work, once done.
    pub result: Option<T>,
    /// Failure or cancellation message, once in error.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl<T> TrainingJob<T> {
    fn new(name: String, estimated_minutes: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            estimated_minutes,
            status: JobStatus::Queued,
            result: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Wall-clock run time, once the job has finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// A job together with the work it will run.
pub(crate) struct JobSlot<T> {
    pub(crate) job: TrainingJob<T>,
    work: Option<Work<T>>,
}

impl<T> JobSlot<T> {
    pub(crate) fn new(name: String, estimated_minutes: f64, work: Work<T>) -> Self {
        Self {
            job: TrainingJob::new(name, estimated_minutes),
            work: Some(work),
        }
    }

    pub(crate) fn is_queued(&self) -> bool {
        self.job.status == JobStatus::Queued
    }

    /// Queued -> running. Hands the work to the caller.
    pub(crate) fn start(&mut self) -> Option<Work<T>> {
        if !self.is_queued() {
            return None;
        }
        self.job.status = JobStatus::Running;
        self.job.started_at = Some(Utc::now());
        self.work.take()
    }

    /// Running -> done or error.
    pub(crate) fn finish(&mut self, outcome: Result<T, String>) {
        if self.job.status != JobStatus::Running {
            return;
        }
        match outcome {
            Ok(value) => {
                self.job.result = Some(value);
                self.job.status = JobStatus::Done;
            }
            Err(message) => {
                self.job.error_message = Some(message);
                self.job.status = JobStatus::Error;
            }
        }
        self.job.finished_at = Some(Utc::now());
    }

    /// Queued -> error. Running and terminal jobs are left alone.
    pub(crate) fn cancel(&mut self) -> bool {
        if !self.is_queued() {
            return false;
        }
        self.work = None;
        self.job.status = JobStatus::Error;
        self.job.error_message = Some(CANCELLED_MESSAGE.to_string());
        self.job.finished_at = Some(Utc::now());
        true
    }
}
