use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use super::model::{Job, JobError, JobSnapshot, JobSubmission};
use super::observer::JobObserver;
use super::state::JobState;
use crate::api::schemas::error_message_from_body;
use crate::sanitize::{redact_path, truncate_body};
use crate::session::SessionStore;
use crate::store::{Artifact, ArtifactStore};
use crate::transfer::{TransferClient, TransferRequest};

pub const PROCESS_PATH: &str = "api/video/process";
const GENERIC_REJECTION: &str = "Processing error";

/// Drives one job from submission to a terminal state.
///
/// Each `run` owns its own [`Job`]; several may run in parallel against the
/// same runner.
#[derive(Clone)]
pub struct JobRunner {
    client: TransferClient,
    store: ArtifactStore,
}

impl JobRunner {
    pub fn new(client: TransferClient, store: ArtifactStore) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn session(&self) -> &Arc<SessionStore> {
        self.client.session()
    }

    /// Runs the job to completion and returns its terminal snapshot.
    ///
    /// Observers see the initial `Idle` snapshot and then every transition.
    /// Never returns a non-terminal snapshot.
    pub async fn run(&self, submission: JobSubmission, observer: &dyn JobObserver) -> JobSnapshot {
        let mut job = Job::new(submission);
        let span = info_span!(
            "job",
            job_id = %job.id(),
            template = %job.submission().template_id,
            file = %redact_path(&job.submission().source),
        );

        async {
            observer.on_transition(&job.snapshot());

            let outcome = self.execute(&mut job, observer).await;
            let finished = match outcome {
                Ok(artifact) => job.complete(artifact),
                Err(error) => {
                    warn!(category = %error.category, "Job failed: {}", error.message);
                    job.fail(error)
                }
            };
            if let Err(e) = finished {
                warn!("{}", e);
            }

            let snapshot = job.snapshot();
            observer.on_transition(&snapshot);
            snapshot
        }
        .instrument(span)
        .await
    }

    /// Runs the job on the tokio runtime.
    pub fn spawn(
        &self,
        submission: JobSubmission,
        observer: Arc<dyn JobObserver>,
    ) -> JoinHandle<JobSnapshot> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(submission, observer.as_ref()).await })
    }

    fn advance(
        &self,
        job: &mut Job,
        next: JobState,
        observer: &dyn JobObserver,
    ) -> Result<(), JobError> {
        job.advance(next, next.default_message())?;
        debug!(state = %next, "Job transition");
        observer.on_transition(&job.snapshot());
        Ok(())
    }

    async fn check_preconditions(&self, submission: &JobSubmission) -> Result<(), JobError> {
        let source_name = redact_path(&submission.source);
        let readable = match tokio::fs::metadata(&submission.source).await {
            Ok(metadata) if metadata.is_file() => tokio::fs::File::open(&submission.source)
                .await
                .is_ok(),
            _ => false,
        };
        if !readable {
            return Err(JobError::precondition(format!(
                "Source file '{}' is not readable",
                source_name
            )));
        }

        if submission.template_id.trim().is_empty() {
            return Err(JobError::precondition("Template id is required"));
        }

        self.session().identity()?;
        Ok(())
    }

    async fn execute(&self, job: &mut Job, observer: &dyn JobObserver) -> Result<Artifact, JobError> {
        self.check_preconditions(job.submission()).await?;

        let template_id = job.submission().template_id.trim().to_string();
        if let Err(e) = self.session().set_last_template(&template_id) {
            warn!("Failed to remember last template: {}", e);
        }

        self.advance(job, JobState::Uploading, observer)?;

        let staged = self
            .store
            .stage_input(&job.submission().source)
            .instrument(info_span!("stage_input"))
            .await?;

        let mut request = TransferRequest::post(PROCESS_PATH)
            .authenticated()
            .file_part("video", staged.path())
            .text_part("template", &template_id);
        if let Some(text) = &job.submission().overlay_text {
            request = request.text_part("text", text);
        }

        let sent = self
            .client
            .send(request)
            .instrument(info_span!("upload"))
            .await;
        // The scratch copy is only needed while the request body is sent.
        drop(staged);
        let response = sent?;

        self.advance(job, JobState::Processing, observer)?;

        if !response.is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %truncate_body(&body), "Server rejected job");
            let message =
                error_message_from_body(&body).unwrap_or_else(|| GENERIC_REJECTION.to_string());
            return Err(JobError::rejected(status, message));
        }

        self.advance(job, JobState::Downloading, observer)?;

        let artifact = self
            .store
            .register(response.into_body())
            .instrument(info_span!("download"))
            .await?;

        if let Err(e) = self.session().record_completed_video() {
            warn!("Failed to update video counter: {}", e);
        }

        info!(
            file = %artifact.file_name,
            bytes = artifact.size_bytes,
            "Job completed"
        );
        Ok(artifact)
    }
}
