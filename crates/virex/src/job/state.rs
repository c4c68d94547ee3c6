use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a processing job.
///
/// `Idle → Uploading → Processing → Downloading → Completed`, and any
/// non-terminal state may move to `Error`. Nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Uploading,
    Processing,
    Downloading,
    Completed,
    Error,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Error)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        match (self, next) {
            (JobState::Idle, JobState::Uploading)
            | (JobState::Uploading, JobState::Processing)
            | (JobState::Processing, JobState::Downloading)
            | (JobState::Downloading, JobState::Completed) => true,
            (current, JobState::Error) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Progress message shown when entering this state.
    pub fn default_message(self) -> &'static str {
        match self {
            JobState::Idle => "Ready",
            JobState::Uploading => "Uploading video...",
            JobState::Processing => "Processing...",
            JobState::Downloading => "Downloading result...",
            JobState::Completed => "Done",
            JobState::Error => "Processing error",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Idle => write!(f, "Idle"),
            JobState::Uploading => write!(f, "Uploading"),
            JobState::Processing => write!(f, "Processing"),
            JobState::Downloading => write!(f, "Downloading"),
            JobState::Completed => write!(f, "Completed"),
            JobState::Error => write!(f, "Error"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid job transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}
