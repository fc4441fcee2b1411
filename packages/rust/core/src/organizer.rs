//! Thread organizer: splits a thread into its opening post and replies.
//!
//! No classification happens here. Every comment becomes exactly one
//! [`Response`], in the order the source supplied, including comments with
//! empty bodies.

use issuekb_shared::{Comment, Discussion, Response, Thread, Topic};

/// Project a thread into `(Topic, responses)`.
pub fn organize(thread: &Thread) -> (Topic, Vec<Response>) {
    let topic = Topic {
        author: thread.author.clone(),
        author_url: thread.author_url.clone(),
        content: thread.body.clone(),
        created_at: thread.created_at,
    };

    let responses = thread.comments.iter().map(response_from).collect();
    (topic, responses)
}

/// [`organize`] plus the issue metadata the discussion export carries.
pub fn discussion(thread: &Thread) -> Discussion {
    let (topic, responses) = organize(thread);
    Discussion {
        issue_id: thread.id,
        issue_url: thread.url.clone(),
        title: thread.title.clone(),
        created_at: thread.created_at,
        updated_at: thread.updated_at,
        closed_at: thread.closed_at,
        state: thread.state,
        labels: thread.labels.clone(),
        topic,
        responses,
    }
}

pub(crate) fn response_from(comment: &Comment) -> Response {
    Response {
        author: comment.author.clone(),
        author_url: comment.author_url.clone(),
        content: comment.body.clone(),
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use issuekb_shared::ThreadState;

    pub(crate) fn comment(author: &str, body: &str) -> Comment {
        Comment {
            author: author.into(),
            author_url: format!("https://github.com/{author}"),
            body: body.into(),
            created_at: None,
            updated_at: None,
        }
    }

    pub(crate) fn thread(state: ThreadState, author: &str, comments: Vec<Comment>) -> Thread {
        Thread {
            id: 42,
            url: "https://github.com/acme/widgets/issues/42".into(),
            title: "Build fails on Windows".into(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
            updated_at: None,
            closed_at: None,
            state,
            labels: vec!["bug".into()],
            author: author.into(),
            author_url: format!("https://github.com/{author}"),
            body: "linker error LNK2019".into(),
            comments,
        }
    }

    #[test]
    fn topic_comes_from_opening_post() {
        let t = thread(ThreadState::Open, "alice", vec![]);
        let (topic, responses) = organize(&t);
        assert_eq!(topic.author, "alice");
        assert_eq!(topic.content, "linker error LNK2019");
        assert_eq!(topic.created_at, t.created_at);
        assert!(responses.is_empty());
    }

    #[test]
    fn one_response_per_comment_in_order() {
        let comments: Vec<Comment> = (0..7)
            .map(|i| comment(if i % 2 == 0 { "bob" } else { "alice" }, &format!("reply {i}")))
            .collect();
        let t = thread(ThreadState::Closed, "alice", comments.clone());
        let (_, responses) = organize(&t);

        assert_eq!(responses.len(), comments.len());
        for (response, comment) in responses.iter().zip(&comments) {
            assert_eq!(response.author, comment.author);
            assert_eq!(response.content, comment.body);
        }
    }

    #[test]
    fn empty_comment_bodies_are_kept() {
        let t = thread(ThreadState::Open, "alice", vec![comment("bob", ""), comment("carol", "hi")]);
        let (_, responses) = organize(&t);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].content, "");
    }

    #[test]
    fn discussion_copies_issue_metadata() {
        let t = thread(ThreadState::Closed, "alice", vec![comment("bob", "fixed")]);
        let d = discussion(&t);
        assert_eq!(d.issue_id, 42);
        assert_eq!(d.title, "Build fails on Windows");
        assert_eq!(d.state, ThreadState::Closed);
        assert_eq!(d.labels, vec!["bug".to_string()]);
        assert_eq!(d.responses.len(), 1);

        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["topic"]["author"], "alice");
        assert_eq!(json["responses"][0]["content"], "fixed");
        assert!(json["closed_at"].is_null());
    }
}
