//! Gizmo Scheduler
//!
//! Shares one GPU between many users. Inference requests go through a
//! per-user sliding-window rate limiter into a FIFO drained by a single
//! worker; training jobs go into a reorderable queue drained by its own
//! worker. Both workers start on demand and stop when there is nothing
//! left to run.

pub mod config;
pub mod error;
pub mod inference;
pub mod logging;
pub mod rate_limit;
pub mod training;
pub mod work;

pub use config::{Config, LoggingConfig, QueueConfig, RateLimitConfig, TrainingConfig};
pub use error::{Result, SchedulerError};
pub use inference::{Completion, Outcome, QueueTicket, RequestScheduler};
pub use rate_limit::{Admission, RateLimiter, RateWindow};
pub use training::{MoveDirection, TrainingJob, TrainingQueue};
pub use work::{BoxError, Work, WorkResult};

pub use gizmo_common::{JobStatus, QueueSummary, RequestStatus};
