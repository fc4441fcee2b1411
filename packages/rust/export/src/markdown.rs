//! Markdown knowledge-base renderers.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use issuekb_shared::{QaPair, RefinedQa, Result};

use crate::json::write_text_atomic;
use crate::timestamp_stamp;

/// Repository identity shown at the top of the knowledge base.
#[derive(Debug, Clone, Default)]
pub struct KbHeader {
    /// Display name, usually `owner/repo`.
    pub repo: String,
    pub repo_url: Option<String>,
}

/// Render the basic knowledge base from classified pairs.
pub fn render_knowledge_base(pairs: &[QaPair], header: &KbHeader, now: DateTime<Utc>) -> String {
    let mut out = format!("# {} knowledge base\n\n", header.repo);
    match &header.repo_url {
        Some(url) => {
            out.push_str(&format!("Generated from GitHub repository [{}]({url})\n\n", header.repo));
        }
        None => out.push_str(&format!("Generated from GitHub issues of {}\n\n", header.repo)),
    }
    out.push_str(&format!("Generated at: {}\n\n", now.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str("---\n\n");

    for pair in pairs {
        let heading = pair.question.lines().next().unwrap_or_default().trim();
        out.push_str(&format!("## {}. {heading}\n\n", pair.issue_id));

        if pair.answers().is_empty() {
            out.push_str("*No answers yet*\n\n");
        }
        for (i, answer) in pair.answers().iter().enumerate() {
            let prefix = if answer.is_accepted {
                "**Accepted answer**".to_string()
            } else {
                format!("**Answer {}**", i + 1)
            };
            out.push_str(&format!(
                "{prefix} by [{}]({})\n\n{}\n\n",
                answer.response.author, answer.response.author_url, answer.response.content
            ));
        }

        out.push_str(&format!("[View on GitHub]({})\n\n---\n\n", pair.issue_url));
    }

    out
}

/// Render the refined knowledge base, one `Q<i>` section per pair.
pub fn render_refined_markdown(refined: &[RefinedQa]) -> String {
    let mut out = String::from("# GitHub knowledge base\n\n");
    out.push_str("*Q&A pairs extracted from GitHub issues*\n\n---\n\n");

    for (i, qa) in refined.iter().enumerate() {
        out.push_str(&format!(
            "## Q{}: {}\n\n{}\n\n",
            i + 1,
            qa.candidate.extracted_question.trim(),
            qa.candidate.extracted_answer.trim()
        ));
        if !qa.issue_url.is_empty() {
            out.push_str(&format!("[View original discussion]({})\n\n", qa.issue_url));
        }
        out.push_str("---\n\n");
    }

    out
}

/// Write `knowledge_base_<timestamp>.md`.
pub fn export_knowledge_base(
    dir: &Path,
    pairs: &[QaPair],
    header: &KbHeader,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let path = dir.join(format!("knowledge_base_{}.md", timestamp_stamp(now)));
    write_text_atomic(&path, &render_knowledge_base(pairs, header, now))?;
    info!(path = %path.display(), count = pairs.len(), "exported knowledge base");
    Ok(path)
}

/// Write `llm_knowledge_base_<timestamp>.md`.
pub fn export_refined_markdown(
    dir: &Path,
    refined: &[RefinedQa],
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let path = dir.join(format!("llm_knowledge_base_{}.md", timestamp_stamp(now)));
    write_text_atomic(&path, &render_refined_markdown(refined))?;
    info!(path = %path.display(), count = refined.len(), "exported refined knowledge base");
    Ok(path)
}
