//! FIFO inference queue with a lazily started serial worker.
//!
//! The GPU runs one generation at a time. Every admitted request enters a
//! FIFO; a single worker task pops entries one by one, runs them outside the
//! lock, publishes the outcome to the [`ResultStore`] and fires the entry's
//! completion signal. The worker exits as soon as it finds the queue empty
//! and the next enqueue starts a new one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use gizmo_common::{QueueSummary, RequestStatus};

use super::completion::{self, Completion, CompletionTrigger};
use super::results::{Outcome, ResultStore};
use crate::config::{Config, QueueConfig};
use crate::error::{Result, SchedulerError};
use crate::rate_limit::{Admission, RateLimiter};
use crate::work::Work;

/// Receipt for an admitted request.
#[derive(Debug, Clone)]
pub struct QueueTicket {
    /// Id under which the result will be published.
    pub request_id: String,
    /// 1-based queue position at admission time.
    pub position: usize,
    /// Fires once the result is available.
    pub completion: Completion,
}

impl QueueTicket {
    /// Human-readable admission status for the UI.
    pub fn message(&self) -> String {
        if self.position > 1 {
            format!("Queued (position {})", self.position)
        } else {
            "Processing".to_string()
        }
    }
}

struct QueueEntry<T> {
    request_id: String,
    work: Work<T>,
    done: CompletionTrigger,
    enqueued_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Idle,
    Running,
}

struct QueueState<T> {
    entries: VecDeque<QueueEntry<T>>,
    worker: WorkerState,
    /// Request currently executing, if any.
    active: Option<String>,
    results: ResultStore<T>,
    /// Durations of the most recent completions, oldest first.
    recent: VecDeque<Duration>,
}

impl<T> QueueState<T> {
    fn position(&self, request_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.request_id == request_id)
            .map(|idx| idx + 1)
    }

    fn is_known(&self, request_id: &str) -> bool {
        self.active.as_deref() == Some(request_id)
            || self.results.contains(request_id)
            || self.position(request_id).is_some()
    }

    fn record_duration(&mut self, elapsed: Duration, window: usize) {
        self.recent.push_back(elapsed);
        while self.recent.len() > window.max(1) {
            self.recent.pop_front();
        }
    }

    fn average_secs(&self) -> Option<f64> {
        if self.recent.is_empty() {
            return None;
        }
        let total: f64 = self.recent.iter().map(Duration::as_secs_f64).sum();
        Some(total / self.recent.len() as f64)
    }
}

struct Shared<T> {
    limiter: RateLimiter,
    config: QueueConfig,
    state: Mutex<QueueState<T>>,
}

/// Serializes generation requests from many users onto one worker.
///
/// Cloning is cheap and yields a handle to the same queue.
pub struct RequestScheduler<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RequestScheduler<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + 'static> RequestScheduler<T> {
    /// Create an idle scheduler. No task is spawned until the first enqueue.
    pub fn new(config: &Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                limiter: RateLimiter::new(&config.rate_limits),
                config: config.queue.clone(),
                state: Mutex::new(QueueState {
                    entries: VecDeque::new(),
                    worker: WorkerState::Idle,
                    active: None,
                    results: ResultStore::new(),
                    recent: VecDeque::new(),
                }),
            }),
        }
    }

    /// The limiter consulted on every enqueue.
    pub fn limiter(&self) -> &RateLimiter {
        &self.shared.limiter
    }

    /// Submit work on behalf of `user` under a generated request id.
    pub async fn enqueue(&self, user: &str, work: Work<T>) -> Result<QueueTicket> {
        self.submit(user, None, work).await
    }

    /// Submit work under a caller-chosen request id.
    ///
    /// Fails with [`SchedulerError::DuplicateRequestId`] if the id is still
    /// queued, running, or holding an uncollected result.
    pub async fn enqueue_with_id(
        &self,
        user: &str,
        request_id: impl Into<String>,
        work: Work<T>,
    ) -> Result<QueueTicket> {
        self.submit(user, Some(request_id.into()), work).await
    }

    async fn submit(
        &self,
        user: &str,
        request_id: Option<String>,
        work: Work<T>,
    ) -> Result<QueueTicket> {
        let request_id = request_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let (done, completion) = completion::signal();

        let (position, start_worker) = {
            let mut state = self.shared.state.lock().await;
            // Duplicates are rejected before the limiter records anything.
            if state.is_known(&request_id) {
                return Err(SchedulerError::DuplicateRequestId(request_id));
            }

            if let Admission::Denied { retry_after } = self.shared.limiter.check(user).await {
                let retry_after_secs = retry_after.as_secs_f64().round() as u64;
                tracing::info!(user = %user, retry_after_secs, "Request rate limited");
                return Err(SchedulerError::RateLimited { retry_after_secs });
            }

            state.entries.push_back(QueueEntry {
                request_id: request_id.clone(),
                work,
                done,
                enqueued_at: Instant::now(),
            });
            let position = state.entries.len();

            let start_worker = state.worker == WorkerState::Idle;
            if start_worker {
                state.worker = WorkerState::Running;
            }
            (position, start_worker)
        };

        if start_worker {
            tokio::spawn(drain(self.shared.clone()));
        }

        tracing::debug!(user = %user, request_id = %request_id, position, "Request queued");

        Ok(QueueTicket {
            request_id,
            position,
            completion,
        })
    }

    /// Number of requests waiting (the running one is not counted).
    pub async fn queue_length(&self) -> usize {
        self.shared.state.lock().await.entries.len()
    }

    /// 1-based position of a waiting request, or 0 if it is not waiting.
    pub async fn queue_position(&self, request_id: &str) -> usize {
        self.shared
            .state
            .lock()
            .await
            .position(request_id)
            .unwrap_or(0)
    }

    /// Rough ETA: position times a caller-chosen per-request duration.
    pub async fn estimated_wait_seconds(&self, request_id: &str, per_job_seconds: f64) -> f64 {
        self.queue_position(request_id).await as f64 * per_job_seconds
    }

    /// ETA from recently observed durations, falling back to
    /// `queue.seconds_per_request` until something has completed.
    pub async fn estimated_wait(&self, request_id: &str) -> Duration {
        let (position, average) = {
            let state = self.shared.state.lock().await;
            (state.position(request_id).unwrap_or(0), state.average_secs())
        };
        let per_job = average.unwrap_or(self.shared.config.seconds_per_request);
        Duration::from_secs_f64(position as f64 * per_job.max(0.0))
    }

    /// Mean duration of recent completions in seconds.
    pub async fn average_job_seconds(&self) -> Option<f64> {
        self.shared.state.lock().await.average_secs()
    }

    /// Collect a finished result. Returns `None` if the request is unknown,
    /// still pending, or was already collected.
    pub async fn get_result(&self, request_id: &str) -> Option<Outcome<T>> {
        self.shared.state.lock().await.results.take(request_id)
    }

    /// Wait for the ticket's completion signal, then collect its result.
    pub async fn wait_result(&self, mut ticket: QueueTicket) -> Option<Outcome<T>> {
        ticket.completion.wait().await;
        self.get_result(&ticket.request_id).await
    }

    pub async fn request_status(&self, request_id: &str) -> RequestStatus {
        let state = self.shared.state.lock().await;
        if state.active.as_deref() == Some(request_id) {
            RequestStatus::Running
        } else if let Some(position) = state.position(request_id) {
            RequestStatus::Queued { position }
        } else if state.results.contains(request_id) {
            RequestStatus::Finished
        } else {
            RequestStatus::Unknown
        }
    }

    pub async fn is_worker_running(&self) -> bool {
        self.shared.state.lock().await.worker == WorkerState::Running
    }

    pub async fn summary(&self) -> QueueSummary {
        let state = self.shared.state.lock().await;
        QueueSummary {
            queued: state.entries.len(),
            worker_running: state.worker == WorkerState::Running,
            unclaimed_results: state.results.len(),
            avg_job_secs: state.average_secs(),
        }
    }
}

/// Worker loop: drain the FIFO one entry at a time, then go idle.
async fn drain<T: Send + 'static>(shared: Arc<Shared<T>>) {
    tracing::debug!("Inference worker started");

    loop {
        let entry = {
            let mut state = shared.state.lock().await;
            match state.entries.pop_front() {
                Some(entry) => {
                    state.active = Some(entry.request_id.clone());
                    entry
                }
                None => {
                    // Must flip under the queue lock: enqueue decides whether
                    // to spawn a worker from this flag.
                    state.worker = WorkerState::Idle;
                    break;
                }
            }
        };

        let QueueEntry {
            request_id,
            work,
            done,
            enqueued_at,
        } = entry;

        let started = Instant::now();
        let outcome = work.run().await.map_err(SchedulerError::ExecutionFailed);
        let elapsed = started.elapsed();

        match &outcome {
            Ok(_) => tracing::info!(
                request_id = %request_id,
                waited_ms = %started.saturating_duration_since(enqueued_at).as_millis(),
                duration_ms = %elapsed.as_millis(),
                "Request completed"
            ),
            Err(e) => tracing::warn!(
                request_id = %request_id,
                duration_ms = %elapsed.as_millis(),
                error = %e,
                "Request failed"
            ),
        }

        {
            let mut state = shared.state.lock().await;
            state.active = None;
            state.record_duration(elapsed, shared.config.eta_window);
            state.results.insert(request_id, outcome);
        }
        done.fire();
    }

    tracing::debug!("Inference worker idle");
}
