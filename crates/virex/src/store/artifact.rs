//! Artifact descriptor and the managed naming convention.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const ARTIFACT_PREFIX: &str = "virex_output_";
pub const ARTIFACT_EXTENSION: &str = "mp4";
pub const STAGING_PREFIX: &str = "temp_input_";
pub const PARTIAL_SUFFIX: &str = ".part";

/// A completed output file in the managed cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl Artifact {
    /// Reads the descriptor of a managed file. `None` for anything that does
    /// not follow the naming convention or is not a regular file.
    pub(crate) fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let name = ArtifactName::parse(&file_name)?;

        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        let created_at = DateTime::from_timestamp_millis(name.millis)
            .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or_default();

        Some(Self {
            path: path.to_path_buf(),
            file_name,
            created_at,
            size_bytes: metadata.len(),
        })
    }

    pub fn human_size(&self) -> String {
        human_size(self.size_bytes)
    }

    /// Ordering key: creation time, then the collision counter.
    pub(crate) fn sort_key(&self) -> (DateTime<Utc>, u32) {
        let counter = ArtifactName::parse(&self.file_name)
            .map(|n| n.counter)
            .unwrap_or(0);
        (self.created_at, counter)
    }
}

/// Parsed `virex_output_<millis>[_<n>].mp4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArtifactName {
    pub millis: i64,
    pub counter: u32,
}

impl ArtifactName {
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name
            .strip_prefix(ARTIFACT_PREFIX)?
            .strip_suffix(ARTIFACT_EXTENSION)?
            .strip_suffix('.')?;

        let (millis, counter) = match stem.split_once('_') {
            Some((millis, counter)) => (millis, counter.parse().ok()?),
            None => (stem, 1),
        };

        Some(Self {
            millis: millis.parse().ok()?,
            counter,
        })
    }

    pub fn file_name(millis: i64, counter: u32) -> String {
        if counter <= 1 {
            format!("{}{}.{}", ARTIFACT_PREFIX, millis, ARTIFACT_EXTENSION)
        } else {
            format!(
                "{}{}_{}.{}",
                ARTIFACT_PREFIX, millis, counter, ARTIFACT_EXTENSION
            )
        }
    }
}

pub fn is_artifact_name(file_name: &str) -> bool {
    ArtifactName::parse(file_name).is_some()
}

/// Scratch files left behind by staging or an interrupted download.
pub fn is_scratch_name(file_name: &str) -> bool {
    file_name.starts_with(STAGING_PREFIX)
        || (file_name.starts_with(ARTIFACT_PREFIX) && file_name.ends_with(PARTIAL_SUFFIX))
}

/// Formats a byte count as `B`, `KB` or `MB`.
pub fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
