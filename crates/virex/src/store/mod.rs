//! Artifact store: the managed cache directory of completed outputs.
//!
//! The directory is shared with staged inputs and may be modified by other
//! processes, so every query reads it fresh. Files are recognized as artifacts
//! only by name (`virex_output_<millis>[_<n>].mp4`); anything else is left
//! alone. Downloads are written to a `.part` sibling and renamed into place
//! only once complete.

pub mod artifact;
pub mod staging;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub use artifact::{human_size, Artifact};
pub use staging::StagedInput;

use crate::error::StoreError;
use crate::sanitize::redact_path;
use artifact::{
    is_artifact_name, is_scratch_name, ArtifactName, ARTIFACT_EXTENSION, PARTIAL_SUFFIX,
    STAGING_PREFIX,
};

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// An exclusively created `.part` file and the artifact name it was reserved for.
struct Reservation {
    name: ArtifactName,
    part_path: PathBuf,
    file: tokio::fs::File,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    directory: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    async fn ensure_directory(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| StoreError::CreateDirectory {
                path: self.directory.clone(),
                source: e,
            })
    }

    /// True if `path` is an artifact-named file directly inside this store.
    pub fn is_managed(&self, path: &Path) -> bool {
        path.parent() == Some(self.directory.as_path())
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_artifact_name)
    }

    /// Picks a fresh artifact name and exclusively creates its `.part` file.
    async fn reserve(&self) -> Result<Reservation, StoreError> {
        let millis = Utc::now().timestamp_millis();

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let final_path = self
                .directory
                .join(ArtifactName::file_name(millis, counter));
            if tokio::fs::symlink_metadata(&final_path).await.is_ok() {
                continue;
            }

            let part_path = partial_path(&final_path);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&part_path)
                .await
            {
                Ok(file) => {
                    return Ok(Reservation {
                        name: ArtifactName { millis, counter },
                        part_path,
                        file,
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StoreError::WriteFile {
                        path: part_path,
                        source: e,
                    })
                }
            }
        }

        Err(StoreError::FileExists(
            self.directory.join(ArtifactName::file_name(millis, 1)),
        ))
    }

    /// Publishes a finished `.part` file under the first free artifact name at
    /// or after `name`. Never replaces an existing file: the name is claimed
    /// with a hard link, which fails if the target exists.
    async fn commit(&self, part_path: &Path, name: ArtifactName) -> Result<PathBuf, StoreError> {
        let last = name.counter.saturating_add(MAX_NAME_ATTEMPTS);

        for counter in name.counter..last {
            let final_path = self
                .directory
                .join(ArtifactName::file_name(name.millis, counter));
            match tokio::fs::hard_link(part_path, &final_path).await {
                Ok(()) => {
                    remove_quietly(part_path).await;
                    return Ok(final_path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StoreError::WriteFile {
                        path: final_path,
                        source: e,
                    })
                }
            }
        }

        Err(StoreError::FileExists(
            self.directory
                .join(ArtifactName::file_name(name.millis, name.counter)),
        ))
    }

    /// Persists `stream` as a new artifact.
    ///
    /// Returns only after the whole stream is on disk. On any failure the
    /// partial file is removed and nothing becomes visible to [`list`].
    ///
    /// [`list`]: ArtifactStore::list
    pub async fn register<S>(&self, mut stream: S) -> Result<Artifact, StoreError>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin,
    {
        self.ensure_directory().await?;
        let Reservation {
            name,
            part_path,
            mut file,
        } = self.reserve().await?;

        let copied = copy_stream(&mut stream, &mut file, &part_path).await;
        drop(file);

        let written = match copied {
            Ok(written) => written,
            Err(e) => {
                remove_quietly(&part_path).await;
                return Err(e);
            }
        };

        let final_path = match self.commit(&part_path, name).await {
            Ok(path) => path,
            Err(e) => {
                remove_quietly(&part_path).await;
                return Err(e);
            }
        };

        let artifact = Artifact::from_path(&final_path)
            .ok_or_else(|| StoreError::NotManaged(final_path.clone()))?;

        info!(
            file = %artifact.file_name,
            bytes = written,
            "Registered artifact"
        );
        Ok(artifact)
    }

    /// All artifacts, newest first. Reads the directory on every call.
    pub fn list(&self) -> Result<Vec<Artifact>, StoreError> {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::ReadDirectory {
                    path: self.directory.clone(),
                    source: e,
                })
            }
        };

        let mut artifacts: Vec<Artifact> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Artifact::from_path(&entry.path()))
            .collect();

        artifacts.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        Ok(artifacts)
    }

    /// Resolves a path (or bare file name) to a managed artifact.
    pub fn artifact_for<P: AsRef<Path>>(&self, path: P) -> Option<Artifact> {
        let path = path.as_ref();
        let path = if path.parent().is_some_and(|p| p.as_os_str().is_empty()) {
            self.directory.join(path)
        } else {
            path.to_path_buf()
        };

        if !self.is_managed(&path) {
            return None;
        }
        Artifact::from_path(&path)
    }

    /// Removes one artifact. Returns whether a file was actually removed.
    pub fn delete(&self, artifact: &Artifact) -> Result<bool, StoreError> {
        self.delete_path(&artifact.path)
    }

    fn delete_path(&self, path: &Path) -> Result<bool, StoreError> {
        if !self.is_managed(path) {
            return Err(StoreError::NotManaged(path.to_path_buf()));
        }

        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(file = %redact_path(path), "Deleted artifact");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::RemoveFile {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Removes every artifact. Unrelated files are untouched. Returns the count removed.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for artifact in self.list()? {
            if self.delete(&artifact)? {
                removed += 1;
            }
        }
        info!(removed, "Cleared artifact history");
        Ok(removed)
    }

    /// Combined size of all artifacts.
    pub fn total_size(&self) -> Result<u64, StoreError> {
        Ok(self.list()?.iter().map(|a| a.size_bytes).sum())
    }

    /// Removes staged inputs and partial downloads left behind by a crashed run.
    ///
    /// Must not run while a job is in flight against the same directory.
    pub fn sweep_scratch(&self) -> Result<usize, StoreError> {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(StoreError::ReadDirectory {
                    path: self.directory.clone(),
                    source: e,
                })
            }
        };

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_scratch = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_scratch_name);
            if !is_scratch || !path.is_file() {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = %redact_path(&path), "Failed to sweep scratch file: {}", e),
            }
        }

        if removed > 0 {
            info!(removed, "Swept leftover scratch files");
        }
        Ok(removed)
    }

    /// Copies `source` into a scratch file next to the artifacts.
    ///
    /// The returned guard deletes the copy when dropped.
    pub async fn stage_input(&self, source: &Path) -> Result<StagedInput, StoreError> {
        self.ensure_directory().await?;

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or(ARTIFACT_EXTENSION)
            .to_string();
        let millis = Utc::now().timestamp_millis();

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let file_name = if counter == 1 {
                format!("{}{}.{}", STAGING_PREFIX, millis, extension)
            } else {
                format!("{}{}_{}.{}", STAGING_PREFIX, millis, counter, extension)
            };
            let path = self.directory.join(file_name);

            let created = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match created {
                Ok(_) => {
                    let staged = StagedInput::new(path);
                    tokio::fs::copy(source, staged.path())
                        .await
                        .map_err(|e| StoreError::WriteFile {
                            path: staged.path().to_path_buf(),
                            source: e,
                        })?;
                    debug!(file = %redact_path(staged.path()), "Staged input");
                    return Ok(staged);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StoreError::WriteFile { path, source: e }),
            }
        }

        Err(StoreError::FileExists(self.directory.join(format!(
            "{}{}.{}",
            STAGING_PREFIX, millis, extension
        ))))
    }
}

fn partial_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn copy_stream<S>(
    stream: &mut S,
    file: &mut tokio::fs::File,
    part_path: &Path,
) -> Result<u64, StoreError>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let write_err = |source| StoreError::WriteFile {
        path: part_path.to_path_buf(),
        source,
    };

    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| StoreError::Stream {
            path: part_path.to_path_buf(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;
    Ok(written)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(file = %redact_path(path), "Failed to remove partial file: {}", e);
        }
    }
}
