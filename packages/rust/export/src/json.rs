//! JSON exports, written atomically.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use issuekb_shared::{Discussion, IssueKbError, QaPair, RefinedQa, Result};

use crate::{date_stamp, timestamp_stamp};

/// Write `content` to `path` via a temp file in the same directory and a rename.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| IssueKbError::io(dir, e))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| IssueKbError::Export(format!("not a file path: {}", path.display())))?;
    let temp = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| IssueKbError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| IssueKbError::io(path, e))?;

    debug!(path = %path.display(), size = content.len(), "wrote file");
    Ok(())
}

/// Pretty-print `data` as JSON and write it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| IssueKbError::Export(format!("JSON serialization failed: {e}")))?;
    write_text_atomic(path, &json)
}

/// Write `github_qa_<date>.json`.
pub fn export_qa_pairs(dir: &Path, pairs: &[QaPair], now: DateTime<Utc>) -> Result<PathBuf> {
    let path = dir.join(format!("github_qa_{}.json", date_stamp(now)));
    write_json_atomic(&path, pairs)?;
    info!(path = %path.display(), count = pairs.len(), "exported Q&A pairs");
    Ok(path)
}

/// Write `github_discussions_<date>.json`.
pub fn export_discussions(
    dir: &Path,
    discussions: &[Discussion],
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let path = dir.join(format!("github_discussions_{}.json", date_stamp(now)));
    write_json_atomic(&path, discussions)?;
    info!(path = %path.display(), count = discussions.len(), "exported discussions");
    Ok(path)
}

/// Write `llm_qa_<timestamp>.json`.
pub fn export_refined(dir: &Path, refined: &[RefinedQa], now: DateTime<Utc>) -> Result<PathBuf> {
    let path = dir.join(format!("llm_qa_{}.json", timestamp_stamp(now)));
    write_json_atomic(&path, refined)?;
    info!(path = %path.display(), count = refined.len(), "exported refined Q&A pairs");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{answer, now, pair, refined, temp_dir};

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = temp_dir("issuekb-json-test");
        let path = dir.join("out.json");
        write_json_atomic(&path, &serde_json::json!({"a": 1})).unwrap();

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["out.json".to_string()]);

        write_text_atomic(&path, "replaced").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "replaced");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn qa_export_is_a_json_array_of_pairs() {
        let dir = temp_dir("issuekb-json-test");
        let pairs = vec![
            pair(1, vec![answer("bob", "fixed", true)]),
            pair(2, vec![]),
        ];
        let path = export_qa_pairs(&dir, &pairs, now()).unwrap();
        assert!(path.ends_with("github_qa_2024-06-02.json"));

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["answers"][0]["is_accepted"], true);
        assert_eq!(items[0]["has_accepted_answer"], true);
        assert_eq!(items[1]["answers"], serde_json::json!([]));
        assert_eq!(items[1]["has_accepted_answer"], false);

        let back: Vec<QaPair> = serde_json::from_value(parsed).unwrap();
        assert_eq!(back, pairs);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn refined_export_uses_timestamp_name() {
        let dir = temp_dir("issuekb-json-test");
        let path = export_refined(&dir, &[refined(4)], now()).unwrap();
        assert!(path.ends_with("llm_qa_20240602_140509.json"));

        let back: Vec<RefinedQa> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back[0].issue_id, 4);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
