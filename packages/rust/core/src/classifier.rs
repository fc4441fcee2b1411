//! Q&A classifier.
//!
//! Turns a [`Thread`] into a [`QaPair`]: the question text plus one tagged
//! [`Answer`] per non-empty comment. Tagging is by author identity only:
//!
//! - `is_from_maintainer`: the commenter is in the [`MaintainerSet`]
//! - `is_clarification`: the commenter is the original poster
//! - `is_accepted`: chosen by the [`AcceptancePolicy`] after the other two
//!   flags are set
//!
//! Classification is a pure function of the thread and the maintainer set.
//! Comment order is trusted as supplied; nothing is re-sorted.

use tracing::debug;

use issuekb_shared::normalize::{question_text, same_identity};
use issuekb_shared::{Answer, MaintainerSet, QaPair, Thread};

use crate::acceptance::{AcceptancePolicy, LastMaintainerReply};
use crate::organizer::response_from;

/// Classifier parameterized by an acceptance policy.
pub struct QaClassifier {
    policy: Box<dyn AcceptancePolicy>,
}

impl Default for QaClassifier {
    fn default() -> Self {
        Self::new(LastMaintainerReply)
    }
}

impl std::fmt::Debug for QaClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaClassifier")
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl QaClassifier {
    pub fn new(policy: impl AcceptancePolicy + 'static) -> Self {
        Self {
            policy: Box::new(policy),
        }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Classify one thread.
    ///
    /// Comments whose body is blank are skipped; they carry nothing to
    /// answer with and never count as the last reply.
    pub fn classify(&self, thread: &Thread, maintainers: &MaintainerSet) -> QaPair {
        let mut answers: Vec<Answer> = thread
            .comments
            .iter()
            .filter(|c| !c.body.trim().is_empty())
            .map(|comment| Answer {
                response: response_from(comment),
                is_clarification: same_identity(&comment.author, &thread.author),
                is_from_maintainer: maintainers.contains(&comment.author),
                is_accepted: false,
            })
            .collect();

        for index in self.policy.accepted(thread, &answers) {
            if let Some(answer) = answers.get_mut(index) {
                answer.is_accepted = true;
            }
        }

        let pair = QaPair::new(thread, question_text(&thread.title, &thread.body), answers);

        debug!(
            issue = thread.id,
            answers = pair.answers().len(),
            skipped = thread.comments.len() - pair.answers().len(),
            accepted = pair.has_accepted_answer(),
            policy = self.policy.name(),
            "classified thread"
        );

        pair
    }
}

/// Classify with the default [`LastMaintainerReply`] policy.
pub fn classify(thread: &Thread, maintainers: &MaintainerSet) -> QaPair {
    QaClassifier::default().classify(thread, maintainers)
}
