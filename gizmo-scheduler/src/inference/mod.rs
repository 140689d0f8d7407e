//! Inference request scheduling.
//!
//! This module provides:
//! - FIFO request queue drained by a single lazily started worker
//! - Per-request completion signals for blocking waiters
//! - Result store for polling callers

mod completion;
pub mod queue;
mod results;

pub use completion::Completion;
pub use queue::{QueueTicket, RequestScheduler};
pub use results::{Outcome, ResultStore};
