use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::sanitize::redact_path;

/// A scratch copy of the source file, removed when dropped.
///
/// Owned by the submit flow; dropping it on any exit path (success, error,
/// early return, panic unwinding) deletes the file.
#[derive(Debug)]
pub struct StagedInput {
    path: PathBuf,
}

impl StagedInput {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedInput {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(file = %redact_path(&self.path), "Removed staged input"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                file = %redact_path(&self.path),
                "Failed to remove staged input: {}", e
            ),
        }
    }
}
