//! Lifecycle states for queued work.

use serde::{Deserialize, Serialize};

/// Lifecycle of a training job.
///
/// Jobs start `Queued`, become `Running` when the worker picks them up and
/// end in one of the terminal states. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for the worker
    Queued,
    /// Currently executing
    Running,
    /// Finished normally
    Done,
    /// Failed or cancelled before it started
    Error,
}

impl JobStatus {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Whether the job still counts towards the remaining workload.
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Where an inference request currently is, as seen by a polling caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RequestStatus {
    /// Waiting in the FIFO
    Queued {
        /// 1-based position in the queue
        position: usize,
    },
    /// Popped by the worker and executing
    Running,
    /// Result is waiting to be collected
    Finished,
    /// Never enqueued, or its result was already collected
    Unknown,
}

impl RequestStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, RequestStatus::Finished)
    }
}
