//! Gizmo Common Types
//!
//! Status types shared between the schedulers and the UI layers that poll them.

pub mod queue;
pub mod status;

pub use queue::QueueSummary;
pub use status::{JobStatus, RequestStatus};
