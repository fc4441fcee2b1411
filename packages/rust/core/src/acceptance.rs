//! Acceptance policies.
//!
//! GitHub issues carry no explicit "accepted answer" marker, so acceptance
//! is a heuristic over the already-tagged answers. The classifier asks an
//! [`AcceptancePolicy`] which answers to mark; swapping the policy changes
//! nothing else about classification.

use issuekb_shared::{Answer, Thread};

/// Picks the accepted answers of a thread.
///
/// `answers` arrive tagged with `is_clarification` and `is_from_maintainer`,
/// `is_accepted` still false. Return indices into `answers`; out-of-range
/// indices are ignored. Returning more than one index is allowed.
pub trait AcceptancePolicy: Send + Sync {
    fn accepted(&self, thread: &Thread, answers: &[Answer]) -> Vec<usize>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Accept the last answer of a closed thread when a maintainer wrote it.
///
/// A maintainer replying to their own issue is a self-reply and is not
/// accepted. Open threads never have an accepted answer. At most one index
/// is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastMaintainerReply;

impl AcceptancePolicy for LastMaintainerReply {
    fn accepted(&self, thread: &Thread, answers: &[Answer]) -> Vec<usize> {
        if !thread.state.is_closed() {
            return Vec::new();
        }
        match answers.last() {
            Some(last) if last.is_from_maintainer && !last.is_clarification => {
                vec![answers.len() - 1]
            }
            _ => Vec::new(),
        }
    }

    fn name(&self) -> &'static str {
        "last-maintainer-reply"
    }
}

/// Never accept anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverAccept;

impl AcceptancePolicy for NeverAccept {
    fn accepted(&self, _thread: &Thread, _answers: &[Answer]) -> Vec<usize> {
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "never"
    }
}
