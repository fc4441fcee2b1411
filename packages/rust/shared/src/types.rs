//! Core domain records for issuekb.
//!
//! Input side: [`Thread`] and [`Comment`], supplied by an upstream source
//! with pull requests already removed and comments in chronological order.
//! Output side: [`Topic`], [`Response`], [`Discussion`], [`Answer`],
//! [`QaPair`], plus the refinement records [`Candidate`] and [`RefinedQa`].
//!
//! Field names and nesting are the JSON interchange format consumed by the
//! exporters, so renaming a field is a format change.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::identity_key;

// ---------------------------------------------------------------------------
// Thread (input)
// ---------------------------------------------------------------------------

/// Lifecycle state of a thread, normalized to two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadState {
    #[default]
    Open,
    Closed,
}

impl ThreadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for ThreadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One follow-up comment in a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub author_url: String,
    pub body: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A discussion thread: the opening post plus its ordered comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Issue number within the repository.
    pub id: u64,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: ThreadState,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Login of the original poster.
    pub author: String,
    #[serde(default)]
    pub author_url: String,
    /// Opening post text (may be empty).
    #[serde(default)]
    pub body: String,
    /// Comments in chronological order. Not re-sorted by consumers.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

// ---------------------------------------------------------------------------
// MaintainerSet
// ---------------------------------------------------------------------------

/// The set of author identities treated as repository maintainers.
///
/// Supplied by the caller; the classifier only ever asks [`contains`].
/// An empty set disables maintainer detection.
///
/// [`contains`]: MaintainerSet::contains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintainerSet {
    keys: HashSet<String>,
}

impl MaintainerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a login. Blank logins are ignored.
    pub fn insert(&mut self, login: &str) -> bool {
        let key = identity_key(login);
        if key.is_empty() {
            return false;
        }
        self.keys.insert(key)
    }

    pub fn contains(&self, login: &str) -> bool {
        !self.keys.is_empty() && self.keys.contains(&identity_key(login))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Normalized logins, sorted for stable output.
    pub fn logins(&self) -> Vec<String> {
        let mut logins: Vec<String> = self.keys.iter().cloned().collect();
        logins.sort();
        logins
    }
}

impl<S: AsRef<str>> Extend<S> for MaintainerSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for login in iter {
            self.insert(login.as_ref());
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for MaintainerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

// ---------------------------------------------------------------------------
// Organized view: Topic + Responses
// ---------------------------------------------------------------------------

/// The opening post of a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub author: String,
    pub author_url: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// One reply in a thread, in thread order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub author: String,
    pub author_url: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A whole thread in "topic + responses" form, with the issue metadata the
/// discussion export carries alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    #[serde(alias = "issue_number")]
    pub issue_id: u64,
    pub issue_url: String,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: ThreadState,
    pub labels: Vec<String>,
    pub topic: Topic,
    pub responses: Vec<Response>,
}

// ---------------------------------------------------------------------------
// Q&A view
// ---------------------------------------------------------------------------

/// A reply tagged with the classifier's three independent flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(flatten)]
    pub response: Response,
    /// Written by the original poster.
    pub is_clarification: bool,
    /// Written by a member of the maintainer set.
    pub is_from_maintainer: bool,
    /// Selected by the acceptance policy.
    pub is_accepted: bool,
}

impl Answer {
    pub fn author(&self) -> &str {
        &self.response.author
    }
}

/// A thread projected into question + tagged answers.
///
/// `answers` and `has_accepted_answer` are private so the flag can only be
/// derived from the answers, never set on its own. Deserialization
/// recomputes it as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QaPairRecord")]
pub struct QaPair {
    pub question: String,
    answers: Vec<Answer>,
    pub issue_id: u64,
    pub issue_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub state: ThreadState,
    pub labels: Vec<String>,
    has_accepted_answer: bool,
}

impl QaPair {
    /// Build a pair for `thread`, copying its metadata.
    pub fn new(thread: &Thread, question: String, answers: Vec<Answer>) -> Self {
        Self::from(QaPairRecord {
            question,
            answers,
            issue_id: thread.id,
            issue_url: thread.url.clone(),
            created_at: thread.created_at,
            updated_at: thread.updated_at,
            state: thread.state,
            labels: thread.labels.clone(),
        })
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn has_accepted_answer(&self) -> bool {
        self.has_accepted_answer
    }

    /// The accepted answers, in thread order.
    pub fn accepted_answers(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter().filter(|a| a.is_accepted)
    }
}

/// Wire shape of a [`QaPair`] without the derived flag.
#[derive(Deserialize)]
struct QaPairRecord {
    question: String,
    #[serde(default)]
    answers: Vec<Answer>,
    #[serde(alias = "issue_number")]
    issue_id: u64,
    issue_url: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    state: ThreadState,
    #[serde(default)]
    labels: Vec<String>,
}

impl From<QaPairRecord> for QaPair {
    fn from(record: QaPairRecord) -> Self {
        let has_accepted_answer = record.answers.iter().any(|a| a.is_accepted);
        Self {
            question: record.question,
            answers: record.answers,
            issue_id: record.issue_id,
            issue_url: record.issue_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
            state: record.state,
            labels: record.labels,
            has_accepted_answer,
        }
    }
}

// ---------------------------------------------------------------------------
// Refinement records
// ---------------------------------------------------------------------------

/// A Q&A pair proposed by the external extractor for one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub extracted_question: String,
    pub extracted_answer: String,
    /// Extraction quality in `0.0..=1.0`.
    pub confidence: f64,
    #[serde(default)]
    pub multiple_answers: bool,
    #[serde(default)]
    pub needs_more_info: bool,
}

/// A [`Candidate`] tied back to the issue it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedQa {
    #[serde(flatten)]
    pub candidate: Candidate,
    #[serde(alias = "issue_number")]
    pub issue_id: u64,
    pub issue_url: String,
    pub original_title: String,
}
