//! Job model and its snapshot.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::state::{InvalidTransition, JobState};
use crate::error::{ErrorCategory, StoreError};
use crate::session::SessionError;
use crate::store::Artifact;
use crate::transfer::TransferError;

/// What the caller asks for: a local file and a template to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
    pub source: PathBuf,
    pub template_id: String,
    pub overlay_text: Option<String>,
}

impl JobSubmission {
    pub fn new(source: impl Into<PathBuf>, template_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            template_id: template_id.into(),
            overlay_text: None,
        }
    }

    /// Sets the overlay text. Trimmed; blank text means none.
    pub fn with_overlay_text(mut self, text: impl AsRef<str>) -> Self {
        self.overlay_text = normalize_overlay_text(text.as_ref());
        self
    }
}

pub(crate) fn normalize_overlay_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Terminal failure detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub category: ErrorCategory,
    pub message: String,
    /// HTTP status, when the server rejected the job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl JobError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            status: None,
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::PreconditionFailed, message)
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::ServerRejected,
            message: message.into(),
            status: Some(status),
        }
    }
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {}): {}", self.category, status, self.message),
            None => write!(f, "{}: {}", self.category, self.message),
        }
    }
}

impl From<TransferError> for JobError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Rejected { status, message } => JobError::rejected(status, message),
            other => JobError::new(other.category(), other.to_string()),
        }
    }
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        JobError::new(err.category(), err.to_string())
    }
}

impl From<SessionError> for JobError {
    fn from(err: SessionError) -> Self {
        JobError::new(err.category(), err.to_string())
    }
}

impl From<InvalidTransition> for JobError {
    fn from(err: InvalidTransition) -> Self {
        JobError::new(ErrorCategory::Unknown, err.to_string())
    }
}

/// Full, immutable view of a job handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub template_id: String,
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_text: Option<String>,
    pub state: JobState,
    pub progress_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Artifact>,
    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// One submit-to-result cycle. Memory only.
///
/// State only moves along the edges [`JobState::can_transition_to`] allows;
/// `error` is set exactly when the state is `Error` and `result` exactly when
/// it is `Completed`.
#[derive(Debug)]
pub struct Job {
    id: String,
    submission: JobSubmission,
    state: JobState,
    progress_message: String,
    error: Option<JobError>,
    result: Option<Artifact>,
    updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(submission: JobSubmission) -> Self {
        let submission = JobSubmission {
            overlay_text: submission
                .overlay_text
                .as_deref()
                .and_then(normalize_overlay_text),
            ..submission
        };

        Self {
            id: Uuid::new_v4().to_string(),
            submission,
            state: JobState::Idle,
            progress_message: JobState::Idle.default_message().to_string(),
            error: None,
            result: None,
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn submission(&self) -> &JobSubmission {
        &self.submission
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn move_to(&mut self, next: JobState, message: String) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.progress_message = message;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves to one of the in-progress states.
    pub fn advance(&mut self, next: JobState, message: &str) -> Result<(), InvalidTransition> {
        if next.is_terminal() {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.move_to(next, message.to_string())
    }

    pub fn complete(&mut self, artifact: Artifact) -> Result<(), InvalidTransition> {
        self.move_to(
            JobState::Completed,
            JobState::Completed.default_message().to_string(),
        )?;
        self.result = Some(artifact);
        Ok(())
    }

    pub fn fail(&mut self, error: JobError) -> Result<(), InvalidTransition> {
        self.move_to(JobState::Error, error.message.clone())?;
        self.error = Some(error);
        Ok(())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            template_id: self.submission.template_id.clone(),
            source: self.submission.source.clone(),
            overlay_text: self.submission.overlay_text.clone(),
            state: self.state,
            progress_message: self.progress_message.clone(),
            error: self.error.clone(),
            result: self.result.clone(),
            updated_at: self.updated_at,
        }
    }
}
