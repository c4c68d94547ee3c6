//! Test harness for isolated job execution.
//!
//! The `TestHarness` struct provides:
//! - A temporary cache directory backing the artifact store
//! - An in-memory session, signed in by default
//! - A scripted transport standing in for the network

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use virex::api::schemas::{AuthResponse, UserInfo};
use virex::job::{JobObserver, JobRunner, JobSnapshot, JobState};
use virex::store::ArtifactStore;
use virex::transfer::{RetryPolicy, TransferClient};
use virex::SessionStore;

use super::transport::{ScriptedTransport, Step};

pub const TEST_USER_ID: i64 = 42;
pub const TEST_TOKEN: &str = "test-token";

/// Isolated environment for driving jobs against a scripted transport.
pub struct TestHarness {
    /// Keeps the temporary tree alive for the harness lifetime.
    temp_dir: TempDir,
    /// Managed cache directory (artifacts and staged inputs).
    pub cache_dir: PathBuf,
    /// Directory for source files handed to jobs.
    pub input_dir: PathBuf,
    pub session: Arc<SessionStore>,
    pub transport: Arc<ScriptedTransport>,
    pub store: ArtifactStore,
}

impl TestHarness {
    /// Signed-in harness with the given transport script.
    pub fn new(steps: Vec<Step>) -> Self {
        let harness = Self::signed_out(steps);
        harness.sign_in();
        harness
    }

    pub fn signed_out(steps: Vec<Step>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache_dir = temp_dir.path().join("cache");
        let input_dir = temp_dir.path().join("inputs");
        std::fs::create_dir_all(&cache_dir).expect("Failed to create cache directory");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input directory");

        Self {
            store: ArtifactStore::new(&cache_dir),
            session: Arc::new(SessionStore::in_memory("http://processing.test")),
            transport: Arc::new(ScriptedTransport::new(steps)),
            temp_dir,
            cache_dir,
            input_dir,
        }
    }

    pub fn sign_in(&self) {
        self.session
            .apply_auth(&AuthResponse {
                success: true,
                token: Some(TEST_TOKEN.to_string()),
                user: Some(UserInfo {
                    id: TEST_USER_ID,
                    username: Some("tester".to_string()),
                    first_name: None,
                }),
                ..Default::default()
            })
            .expect("Failed to sign in");
    }

    /// Retry policy used by `runner()`: 3 attempts, 1s base delay.
    pub fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1000))
    }

    pub fn client(&self) -> TransferClient {
        TransferClient::with_transport(
            self.transport.clone(),
            self.session.clone(),
            Self::policy(),
        )
    }

    pub fn runner(&self) -> JobRunner {
        JobRunner::new(self.client(), self.store.clone())
    }

    /// Writes a source file of `size` bytes into the input directory.
    pub fn write_source(&self, name: &str, size: usize) -> PathBuf {
        let path = self.input_dir.join(name);
        std::fs::write(&path, vec![0xAB; size]).expect("Failed to write source file");
        path
    }

    /// Places a file directly in the cache directory.
    pub fn write_cache_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.cache_dir.join(name);
        std::fs::write(&path, content).expect("Failed to write cache file");
        path
    }

    /// Sorted names of everything in the cache directory.
    pub fn cache_entries(&self) -> Vec<String> {
        list_names(&self.cache_dir)
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }
}

fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read directory")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Observer that keeps every snapshot it is handed.
#[derive(Default)]
pub struct RecordingObserver {
    snapshots: Mutex<Vec<JobSnapshot>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<JobState> {
        self.snapshots().into_iter().map(|s| s.state).collect()
    }
}

impl JobObserver for RecordingObserver {
    fn on_transition(&self, snapshot: &JobSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}
