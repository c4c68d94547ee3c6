//! Job state machine: one processing request from submission to a terminal state.

pub mod model;
pub mod observer;
pub mod runner;
pub mod state;

pub use model::{Job, JobError, JobSnapshot, JobSubmission};
pub use observer::{BroadcastObserver, ChannelObserver, JobObserver, NoopObserver};
pub use runner::JobRunner;
pub use state::{InvalidTransition, JobState};
