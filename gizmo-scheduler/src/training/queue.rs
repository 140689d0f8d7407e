//! Training job queue.
//!
//! Jobs run back-to-back on a single worker task. Jobs that have not started
//! yet can be reordered or cancelled; the worker always picks the first
//! queued job in list order.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::job::{JobSlot, TrainingJob};
use crate::config::Config;
use crate::work::Work;

/// Direction for [`TrainingQueue::move_job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// One slot closer to execution (-1).
    Earlier,
    /// One slot further from execution (+1).
    Later,
}

impl MoveDirection {
    pub fn offset(self) -> isize {
        match self {
            MoveDirection::Earlier => -1,
            MoveDirection::Later => 1,
        }
    }
}

impl TryFrom<i32> for MoveDirection {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(MoveDirection::Earlier),
            1 => Ok(MoveDirection::Later),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Idle,
    Running,
}

struct TrainingState<T> {
    jobs: Vec<JobSlot<T>>,
    worker: WorkerState,
}

impl<T> TrainingState<T> {
    /// Indices into `jobs` of the queued jobs, in list order.
    fn queued_view(&self) -> Vec<usize> {
        self.jobs
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_queued())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Swap a queued job with its queued neighbour. Non-queued jobs keep
    /// their indices because only slots from the queued view are exchanged.
    fn move_queued(&mut self, job_id: &str, direction: MoveDirection) -> bool {
        let view = self.queued_view();
        let Some(pos) = view.iter().position(|&idx| self.jobs[idx].job.id == job_id) else {
            return false;
        };
        let Some(target) = pos
            .checked_add_signed(direction.offset())
            .filter(|&t| t < view.len())
        else {
            return false;
        };
        self.jobs.swap(view[pos], view[target]);
        true
    }

    fn find_mut(&mut self, job_id: &str) -> Option<&mut JobSlot<T>> {
        self.jobs.iter_mut().find(|slot| slot.job.id == job_id)
    }
}

/// Serial queue of long-running training jobs.
///
/// Cloning is cheap and yields a handle to the same queue.
pub struct TrainingQueue<T> {
    state: Arc<Mutex<TrainingState<T>>>,
    default_estimated_minutes: f64,
}

impl<T> Clone for TrainingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            default_estimated_minutes: self.default_estimated_minutes,
        }
    }
}

impl<T: Clone + Send + 'static> TrainingQueue<T> {
    pub fn new(config: &Config) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrainingState {
                jobs: Vec::new(),
                worker: WorkerState::Idle,
            })),
            default_estimated_minutes: config.training.default_estimated_minutes,
        }
    }

    /// Append a job and start the worker if it is idle.
    pub async fn add_job(
        &self,
        name: impl Into<String>,
        work: Work<T>,
        estimated_minutes: f64,
    ) -> TrainingJob<T> {
        let slot = JobSlot::new(name.into(), estimated_minutes, work);
        let job = slot.job.clone();

        let start_worker = {
            let mut state = self.state.lock().await;
            state.jobs.push(slot);
            let idle = state.worker == WorkerState::Idle;
            if idle {
                state.worker = WorkerState::Running;
            }
            idle
        };

        if start_worker {
            tokio::spawn(drain(self.state.clone()));
        }

        tracing::info!(
            job_id = %job.id,
            name = %job.name,
            estimated_minutes = job.estimated_minutes,
            "Training job queued"
        );
        job
    }

    /// Append a job using `training.default_estimated_minutes`.
    pub async fn add_job_default(&self, name: impl Into<String>, work: Work<T>) -> TrainingJob<T> {
        self.add_job(name, work, self.default_estimated_minutes).await
    }

    /// Snapshot of all jobs, in list order.
    pub async fn get_jobs(&self) -> Vec<TrainingJob<T>> {
        let state = self.state.lock().await;
        state.jobs.iter().map(|slot| slot.job.clone()).collect()
    }

    pub async fn get_job(&self, job_id: &str) -> Option<TrainingJob<T>> {
        let state = self.state.lock().await;
        state
            .jobs
            .iter()
            .find(|slot| slot.job.id == job_id)
            .map(|slot| slot.job.clone())
    }

    /// Move a queued job one place among the queued jobs.
    ///
    /// Returns false (and changes nothing) if the job is not queued or is
    /// already at that end of the queue.
    pub async fn move_job(&self, job_id: &str, direction: MoveDirection) -> bool {
        let moved = self.state.lock().await.move_queued(job_id, direction);
        if moved {
            tracing::info!(job_id = %job_id, ?direction, "Training job moved");
        }
        moved
    }

    /// Cancel a job that has not started yet.
    pub async fn cancel_job(&self, job_id: &str) -> bool {
        let cancelled = {
            let mut state = self.state.lock().await;
            state.find_mut(job_id).is_some_and(|slot| slot.cancel())
        };
        if cancelled {
            tracing::info!(job_id = %job_id, "Training job cancelled");
        }
        cancelled
    }

    /// Estimated minutes until every queued and running job is finished.
    pub async fn estimated_total_minutes(&self) -> f64 {
        let state = self.state.lock().await;
        state
            .jobs
            .iter()
            .filter(|slot| slot.job.status.is_pending())
            .map(|slot| slot.job.estimated_minutes)
            .sum()
    }

    /// Drop all done and errored jobs. Returns how many were removed.
    pub async fn clear_finished(&self) -> usize {
        let mut state = self.state.lock().await;
        let before = state.jobs.len();
        state.jobs.retain(|slot| !slot.job.status.is_terminal());
        before - state.jobs.len()
    }

    pub async fn queued_count(&self) -> usize {
        self.state.lock().await.queued_view().len()
    }

    pub async fn is_worker_running(&self) -> bool {
        self.state.lock().await.worker == WorkerState::Running
    }
}

/// Worker loop: run the first queued job until none are left.
async fn drain<T: Send + 'static>(state: Arc<Mutex<TrainingState<T>>>) {
    tracing::debug!("Training worker started");

    loop {
        let (job_id, name, work) = {
            let mut guard = state.lock().await;
            let next = guard.jobs.iter().position(|slot| slot.is_queued());
            let Some(idx) = next else {
                guard.worker = WorkerState::Idle;
                break;
            };
            let slot = &mut guard.jobs[idx];
            let work = slot.start();
            (slot.job.id.clone(), slot.job.name.clone(), work)
        };

        tracing::info!(job_id = %job_id, name = %name, "Training job started");

        let outcome = match work {
            Some(work) => work.run().await,
            None => Err("Job has no work attached".to_string()),
        };

        match &outcome {
            Ok(_) => tracing::info!(job_id = %job_id, name = %name, "Training job done"),
            Err(e) => tracing::warn!(job_id = %job_id, name = %name, error = %e, "Training job failed"),
        }

        let mut guard = state.lock().await;
        if let Some(slot) = guard.find_mut(&job_id) {
            slot.finish(outcome);
        }
    }

    tracing::debug!("Training worker idle");
}
