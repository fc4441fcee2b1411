//! JSON and Markdown exporters for issuekb.
//!
//! Everything here writes into a single output directory:
//!
//! ```text
//! <output_dir>/
//! ├── github_qa_<date>.json
//! ├── github_discussions_<date>.json
//! ├── knowledge_base_<timestamp>.md
//! ├── llm_qa_<timestamp>.json            (refinement only)
//! ├── llm_knowledge_base_<timestamp>.md  (refinement only)
//! └── manifest.json
//! ```
//!
//! Callers pass the generation time in; nothing in this crate reads the clock.

pub mod json;
pub mod manifest;
pub mod markdown;

pub use json::{
    export_discussions, export_qa_pairs, export_refined, write_json_atomic, write_text_atomic,
};
pub use manifest::{FileEntry, Manifest, ManifestCounts, file_entry, write_manifest};
pub use markdown::{
    KbHeader, export_knowledge_base, export_refined_markdown, render_knowledge_base,
    render_refined_markdown,
};

use chrono::{DateTime, Utc};

/// `YYYY-MM-DD`, used in the JSON export names.
pub fn date_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// `YYYYmmdd_HHMMSS`, used in the Markdown and refinement export names.
pub fn timestamp_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use chrono::{DateTime, TimeZone, Utc};
    use issuekb_shared::{Answer, Candidate, QaPair, RefinedQa, Response, Thread, ThreadState};

    pub fn temp_dir(prefix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 2, 14, 5, 9).unwrap()
    }

    pub fn thread(id: u64) -> Thread {
        Thread {
            id,
            url: format!("https://github.com/acme/widgets/issues/{id}"),
            title: format!("Issue {id} title"),
            created_at: None,
            updated_at: None,
            closed_at: None,
            state: ThreadState::Closed,
            labels: vec![],
            author: "alice".into(),
            author_url: "https://github.com/alice".into(),
            body: "details".into(),
            comments: vec![],
        }
    }

    pub fn answer(author: &str, content: &str, accepted: bool) -> Answer {
        Answer {
            response: Response {
                author: author.into(),
                author_url: format!("https://github.com/{author}"),
                content: content.into(),
                created_at: None,
                updated_at: None,
            },
            is_clarification: false,
            is_from_maintainer: accepted,
            is_accepted: accepted,
        }
    }

    pub fn pair(id: u64, answers: Vec<Answer>) -> QaPair {
        let t = thread(id);
        QaPair::new(&t, format!("{}\n\n{}", t.title, t.body), answers)
    }

    pub fn refined(id: u64) -> RefinedQa {
        RefinedQa {
            candidate: Candidate {
                extracted_question: format!("How do I fix {id}?"),
                extracted_answer: "Upgrade to 1.2.".into(),
                confidence: 0.9,
                multiple_answers: false,
                needs_more_info: false,
            },
            issue_id: id,
            issue_url: format!("https://github.com/acme/widgets/issues/{id}"),
            original_title: format!("Issue {id} title"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_format_generation_time() {
        let now = test_support::now();
        assert_eq!(date_stamp(now), "2024-06-02");
        assert_eq!(timestamp_stamp(now), "20240602_140509");
    }
}
