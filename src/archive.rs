//! Weekly brief archive: one JSON document per run under a local directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::RunStats;
use crate::summarize::AccountBrief;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode brief: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Invalid run key '{0}'")]
    InvalidRunKey(String),
}

/// What gets archived for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedBrief {
    pub run_key: String,
    pub generated_at: DateTime<Utc>,
    pub briefs: Vec<AccountBrief>,
    pub stats: RunStats,
}

#[derive(Debug, Clone)]
pub struct BriefArchive {
    dir: PathBuf,
}

impl BriefArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<run_key>.json`
    pub fn path_for(&self, run_key: &str) -> Result<PathBuf, ArchiveError> {
        let valid = !run_key.is_empty()
            && run_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ArchiveError::InvalidRunKey(run_key.to_string()));
        }
        Ok(self.dir.join(format!("{run_key}.json")))
    }

    /// Write the brief, replacing any earlier archive for the same run.
    pub fn write_brief(&self, brief: &ArchivedBrief) -> Result<PathBuf, ArchiveError> {
        let path = self.path_for(&brief.run_key)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| ArchiveError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let body = serde_json::to_vec_pretty(brief)?;
        atomic_write(&path, &body)?;
        tracing::info!(path = %path.display(), "Archived weekly brief");
        Ok(path)
    }

    /// `None` when no archive exists for `run_key`.
    pub fn read_brief(&self, run_key: &str) -> Result<Option<ArchivedBrief>, ArchiveError> {
        let path = self.path_for(run_key)?;
        let body = match std::fs::read(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ArchiveError::Io { path, source }),
        };
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

/// Write to a fresh temp file beside `dst`, fsync, then rename over `dst`.
fn atomic_write(dst: &Path, content: &[u8]) -> Result<(), ArchiveError> {
    use std::time::{SystemTime, UNIX_EPOCH};
    // Unpredictable name, created exclusively
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", suffix));
    let io_err = |source| ArchiveError::Io {
        path: temp_path.clone(),
        source,
    };

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(io_err)?;

    if let Err(e) = file.write_all(content).and_then(|()| file.sync_all()) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(io_err(e));
    }
    drop(file);

    // Windows refuses to rename over an existing file
    #[cfg(windows)]
    if dst.exists() {
        let _ = std::fs::remove_file(dst);
    }

    std::fs::rename(&temp_path, dst).map_err(|source| {
        let _ = std::fs::remove_file(&temp_path);
        ArchiveError::Io {
            path: dst.to_path_buf(),
            source,
        }
    })
}
