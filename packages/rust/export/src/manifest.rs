//! Output manifest: what a run produced, with a checksum per file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use issuekb_shared::{IssueKbError, Result};

use crate::json::write_json_atomic;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Counts reported for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestCounts {
    /// Records in the input export, pull requests included.
    pub issues_loaded: usize,
    /// Threads processed after dropping pull requests and applying the cap.
    pub threads: usize,
    pub qa_pairs: usize,
    pub accepted_answers: usize,
    pub maintainers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refined: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine_failures: Option<usize>,
}

/// One output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: u64,
}

/// `manifest.json` contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: Uuid,
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    /// Input export the run read.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub counts: ManifestCounts,
    pub files: Vec<FileEntry>,
}

/// Checksum an output file already on disk.
pub fn file_entry(path: &Path) -> Result<FileEntry> {
    let bytes = std::fs::read(path).map_err(|e| IssueKbError::io(path, e))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IssueKbError::Export(format!("not a file path: {}", path.display())))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);

    Ok(FileEntry {
        filename,
        sha256: format!("{:x}", hasher.finalize()),
        size_bytes: bytes.len() as u64,
    })
}

/// Write `manifest.json` into `dir`.
pub fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<PathBuf> {
    let path = dir.join(MANIFEST_FILE_NAME);
    write_json_atomic(&path, manifest)?;
    debug!(path = %path.display(), files = manifest.files.len(), "wrote manifest");
    Ok(path)
}
