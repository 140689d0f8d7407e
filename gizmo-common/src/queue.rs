//! Queue summary exposed to dashboards.

use serde::{Deserialize, Serialize};

/// Point-in-time view of the inference queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSummary {
    /// Number of requests waiting (excluding the one running).
    pub queued: usize,
    /// Whether the worker is currently draining the queue.
    pub worker_running: bool,
    /// Results published but not yet collected.
    pub unclaimed_results: usize,
    /// Mean duration of recently completed requests, in seconds.
    #[serde(default)]
    pub avg_job_secs: Option<f64>,
}
