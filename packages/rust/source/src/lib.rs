//! Issue export adapter for issuekb.
//!
//! Reads the JSON array an issue fetcher writes (GitHub REST issue objects,
//! each with its comments attached under `comment_data`) and turns it into
//! the [`Thread`]s the classifier consumes. Pull requests are dropped here,
//! logins and timestamps are normalized, and labels are flattened to names.
//!
//! No network access happens in this crate.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use issuekb_shared::normalize::{display_login, parse_optional_timestamp, profile_url};
use issuekb_shared::{Comment, IssueKbError, MaintainerSet, Result, Thread, ThreadState};

// ---------------------------------------------------------------------------
// Raw export records
// ---------------------------------------------------------------------------

/// An account reference as it appears in the export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// A label, either the REST object form or a bare name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLabel {
    Object { name: String },
    Name(String),
}

impl RawLabel {
    pub fn name(&self) -> &str {
        match self {
            Self::Object { name } | Self::Name(name) => name,
        }
    }
}

/// One comment as exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// `OWNER`, `MEMBER`, `COLLABORATOR`, `CONTRIBUTOR`, `NONE`, ...
    #[serde(default)]
    pub author_association: Option<String>,
}

/// One issue (or pull request) as exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub labels: Vec<RawLabel>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    /// Present (non-null) only on pull requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
    #[serde(default)]
    pub comment_data: Option<Vec<RawComment>>,
}

impl RawIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn comments(&self) -> &[RawComment] {
        self.comment_data.as_deref().unwrap_or_default()
    }

    /// Convert into a [`Thread`]. Pull requests yield `None`.
    pub fn into_thread(self) -> Option<Thread> {
        if self.is_pull_request() {
            return None;
        }

        let (author, author_url) = normalize_user(self.user.as_ref());
        let state = if self.state.trim().eq_ignore_ascii_case("closed") {
            ThreadState::Closed
        } else {
            ThreadState::Open
        };

        let mut labels: Vec<String> = Vec::with_capacity(self.labels.len());
        for label in &self.labels {
            let name = label.name().trim();
            if !name.is_empty() && !labels.iter().any(|l| l == name) {
                labels.push(name.to_string());
            }
        }

        let comments = self
            .comment_data
            .unwrap_or_default()
            .into_iter()
            .map(|raw| {
                let (author, author_url) = normalize_user(raw.user.as_ref());
                Comment {
                    author,
                    author_url,
                    body: raw.body.unwrap_or_default(),
                    created_at: parse_optional_timestamp(raw.created_at.as_deref()),
                    updated_at: parse_optional_timestamp(raw.updated_at.as_deref()),
                }
            })
            .collect();

        Some(Thread {
            id: self.number,
            url: self.html_url,
            title: self.title,
            created_at: parse_optional_timestamp(self.created_at.as_deref()),
            updated_at: parse_optional_timestamp(self.updated_at.as_deref()),
            closed_at: parse_optional_timestamp(self.closed_at.as_deref()),
            state,
            labels,
            author,
            author_url,
            body: self.body.unwrap_or_default(),
            comments,
        })
    }
}

fn normalize_user(user: Option<&RawUser>) -> (String, String) {
    let login = display_login(user.map(|u| u.login.as_str()));
    let url = profile_url(&login, user.and_then(|u| u.html_url.as_deref()));
    (login, url)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse an issue export from a JSON string.
pub fn parse_issues(json: &str) -> Result<Vec<RawIssue>> {
    serde_json::from_str(json)
        .map_err(|e| IssueKbError::parse(format!("invalid issue export: {e}")))
}

/// Read and parse an issue export file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_issues(path: &Path) -> Result<Vec<RawIssue>> {
    let content = std::fs::read_to_string(path).map_err(|e| IssueKbError::io(path, e))?;
    let issues = parse_issues(&content)
        .map_err(|e| IssueKbError::parse(format!("{}: {e}", path.display())))?;
    info!(count = issues.len(), "loaded issue export");
    Ok(issues)
}

/// Convert raw issues into threads, dropping pull requests.
///
/// `max_issues` caps the number of threads returned, counted after
/// pull requests are removed. Export order is kept.
pub fn threads_from_issues(issues: Vec<RawIssue>, max_issues: Option<usize>) -> Vec<Thread> {
    let total = issues.len();
    let limit = max_issues.unwrap_or(usize::MAX);

    let threads: Vec<Thread> = issues
        .into_iter()
        .filter_map(RawIssue::into_thread)
        .take(limit)
        .collect();

    if max_issues.is_some_and(|max| threads.len() == max) {
        debug!(limit, "issue cap reached");
    }
    debug!(total, threads = threads.len(), "converted issues to threads");
    threads
}

/// Collect commenters whose `author_association` is one of `associations`.
///
/// Association names compare case-insensitively. An empty `associations`
/// list yields an empty set.
pub fn maintainers_from_associations(issues: &[RawIssue], associations: &[String]) -> MaintainerSet {
    let mut set = MaintainerSet::new();
    if associations.is_empty() {
        return set;
    }

    for issue in issues.iter().filter(|i| !i.is_pull_request()) {
        for comment in issue.comments() {
            let Some(association) = comment.author_association.as_deref() else {
                continue;
            };
            if !associations
                .iter()
                .any(|a| a.trim().eq_ignore_ascii_case(association.trim()))
            {
                continue;
            }
            match comment.user.as_ref().map(|u| u.login.as_str()) {
                Some(login) if !login.trim().is_empty() => {
                    set.insert(login);
                }
                _ => warn!(issue = issue.number, "maintainer comment without a login"),
            }
        }
    }

    debug!(maintainers = set.len(), "derived maintainers from associations");
    set
}
