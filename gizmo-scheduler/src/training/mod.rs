//! Training job scheduling.

mod job;
pub mod queue;

pub use job::{TrainingJob, CANCELLED_MESSAGE};
pub use queue::{MoveDirection, TrainingQueue};
