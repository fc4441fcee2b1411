//! LLM refinement orchestrator.
//!
//! Each thread is rendered to text and handed to an [`Extractor`], which
//! returns a [`Candidate`] Q&A pair with a confidence score. The prompt and
//! the model call live outside this crate: [`BridgeExtractor`] spawns an
//! external bridge process and talks to it over a JSON-lines protocol on
//! stdin/stdout.
//!
//! Threads are processed in batches with a bounded number of extractions in
//! flight and a pause between batches. A failed extraction is recorded as a
//! [`RefineOutcome::Failed`] and never aborts the run.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use issuekb_shared::{Candidate, IssueKbError, RefineConfig, RefinedQa, Result, Thread};

/// Answers the extraction prompt asks for when a thread has no usable answer.
const NO_CLEAR_ANSWER_MARKERS: &[&str] = &["no clear answer found", "没有找到明确答案"];

// ---------------------------------------------------------------------------
// Extraction request
// ---------------------------------------------------------------------------

/// One thread, rendered for the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub issue_id: u64,
    pub issue_url: String,
    pub title: String,
    /// Title, body, and every comment with its author.
    pub text: String,
}

impl ExtractRequest {
    pub fn from_thread(thread: &Thread) -> Self {
        Self {
            issue_id: thread.id,
            issue_url: thread.url.clone(),
            title: thread.title.clone(),
            text: render_thread_text(thread),
        }
    }
}

/// Render a thread as plain text: title, description, then numbered comments.
pub fn render_thread_text(thread: &Thread) -> String {
    let mut text = format!("Title: {}\n\nDescription:\n{}\n\nComments:", thread.title, thread.body);
    for (i, comment) in thread.comments.iter().enumerate() {
        text.push_str(&format!(
            "\n\nComment {} (author: {}):\n{}",
            i + 1,
            comment.author,
            comment.body
        ));
    }
    text
}

/// Turns rendered threads into candidate Q&A pairs.
///
/// Implementations block; the orchestrator runs them on the blocking pool.
pub trait Extractor: Send + Sync {
    fn extract(&self, request: &ExtractRequest) -> Result<Candidate>;

    /// Model identifier, recorded in logs and the manifest.
    fn model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Bridge protocol
// ---------------------------------------------------------------------------

/// Request message sent to the bridge.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum RequestMessage<'a> {
    #[serde(rename = "extract")]
    Extract {
        id: String,
        request: &'a ExtractRequest,
    },
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Response message received from the bridge.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseMessage {
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "result")]
    Result { id: String, result: Candidate },
    #[serde(rename = "error")]
    Error { id: String, error: String },
}

/// Handle to the spawned bridge subprocess.
struct BridgeHandle {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    request_counter: u64,
}

impl BridgeHandle {
    fn spawn(config: &RefineConfig) -> Result<Self> {
        info!(cmd = %config.bridge_cmd, script = %config.bridge_script, model = %config.model, "spawning refinement bridge");

        let mut command = Command::new(&config.bridge_cmd);
        if !config.bridge_script.is_empty() {
            command.arg(&config.bridge_script);
        }
        let mut child = command
            .arg("--model")
            .arg(&config.model)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                IssueKbError::Refine(format!(
                    "failed to spawn bridge: {e}. Is `{}` installed?",
                    config.bridge_cmd
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| IssueKbError::Refine("failed to capture bridge stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| IssueKbError::Refine("failed to capture bridge stdout".into()))?;

        let mut handle = Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            request_counter: 0,
        };
        handle.wait_for_ready()?;
        Ok(handle)
    }

    fn read_message(&mut self) -> Result<ResponseMessage> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| IssueKbError::Refine(format!("bridge read error: {e}")))?;

        if line.is_empty() {
            return Err(IssueKbError::Refine("bridge closed stdout unexpectedly".into()));
        }

        serde_json::from_str(line.trim()).map_err(|e| {
            let preview: String = line.chars().take(200).collect();
            IssueKbError::Refine(format!("invalid bridge message: {e} (got: {preview})"))
        })
    }

    fn wait_for_ready(&mut self) -> Result<()> {
        match self.read_message()? {
            ResponseMessage::Ready => {
                info!("bridge is ready");
                Ok(())
            }
            other => Err(IssueKbError::Refine(format!(
                "expected ready message, got: {other:?}"
            ))),
        }
    }

    fn send(&mut self, request: &ExtractRequest) -> Result<Candidate> {
        self.request_counter += 1;
        let id = format!("req-{}", self.request_counter);

        let message = RequestMessage::Extract {
            id: id.clone(),
            request,
        };
        let json = serde_json::to_string(&message)
            .map_err(|e| IssueKbError::Refine(format!("failed to serialize request: {e}")))?;

        writeln!(self.stdin, "{json}")
            .map_err(|e| IssueKbError::Refine(format!("failed to write to bridge stdin: {e}")))?;
        self.stdin
            .flush()
            .map_err(|e| IssueKbError::Refine(format!("failed to flush bridge stdin: {e}")))?;

        match self.read_message()? {
            ResponseMessage::Result { id: resp_id, result } if resp_id == id => Ok(result),
            ResponseMessage::Error { id: resp_id, error } if resp_id == id => {
                Err(IssueKbError::Refine(error))
            }
            ResponseMessage::Ready => Err(IssueKbError::Refine(
                "unexpected ready message during extraction".into(),
            )),
            other => Err(IssueKbError::Refine(format!(
                "bridge answered out of order: expected {id}, got {other:?}"
            ))),
        }
    }

    fn shutdown(mut self) {
        if let Ok(json) = serde_json::to_string(&RequestMessage::Shutdown) {
            let _ = writeln!(self.stdin, "{json}");
            let _ = self.stdin.flush();
        }

        match self.child.wait() {
            Ok(status) => info!(?status, "bridge exited"),
            Err(e) => warn!("bridge wait error: {e}"),
        }
    }
}

/// [`Extractor`] backed by a bridge subprocess.
///
/// The bridge handles one request at a time; concurrent callers queue on
/// an internal lock.
pub struct BridgeExtractor {
    model: String,
    handle: Mutex<Option<BridgeHandle>>,
}

impl BridgeExtractor {
    /// Spawn the bridge and wait for its ready handshake.
    pub fn spawn(config: &RefineConfig) -> Result<Self> {
        let handle = BridgeHandle::spawn(config)?;
        Ok(Self {
            model: config.model.clone(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Ask the bridge to exit and wait for it. Later extractions fail.
    pub fn shutdown(&self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }
}

impl Extractor for BridgeExtractor {
    fn extract(&self, request: &ExtractRequest) -> Result<Candidate> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|_| IssueKbError::Refine("bridge lock poisoned".into()))?;
        let handle = guard
            .as_mut()
            .ok_or_else(|| IssueKbError::Refine("bridge already shut down".into()))?;
        handle.send(request)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl Drop for BridgeExtractor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Batch orchestration
// ---------------------------------------------------------------------------

/// Batching and concurrency knobs.
#[derive(Debug, Clone)]
pub struct RefineOptions {
    pub batch_size: usize,
    pub max_workers: usize,
    pub rate_limit_pause: Duration,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_workers: 5,
            rate_limit_pause: Duration::from_secs(1),
        }
    }
}

impl From<&RefineConfig> for RefineOptions {
    fn from(config: &RefineConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_workers: config.max_workers,
            rate_limit_pause: config.rate_limit_pause,
        }
    }
}

/// Result of refining one thread.
#[derive(Debug, Clone, PartialEq)]
pub enum RefineOutcome {
    Refined(RefinedQa),
    Failed {
        issue_id: u64,
        issue_url: String,
        error: String,
    },
}

impl RefineOutcome {
    pub fn issue_id(&self) -> u64 {
        match self {
            Self::Refined(qa) => qa.issue_id,
            Self::Failed { issue_id, .. } => *issue_id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Progress callback for refinement.
pub trait RefineProgress: Send + Sync {
    /// A batch is about to start (`batch` is 1-based).
    fn batch_started(&self, batch: usize, total_batches: usize, size: usize);
    /// One more thread finished, successfully or not.
    fn thread_refined(&self, done: usize, total: usize);
}

/// No-op refinement progress.
pub struct SilentRefineProgress;

impl RefineProgress for SilentRefineProgress {
    fn batch_started(&self, _batch: usize, _total_batches: usize, _size: usize) {}
    fn thread_refined(&self, _done: usize, _total: usize) {}
}

/// Refine every thread, returning one outcome per thread in input order.
#[instrument(skip_all, fields(threads = threads.len(), model = %extractor.model()))]
pub async fn refine_threads(
    extractor: Arc<dyn Extractor>,
    threads: &[Thread],
    options: &RefineOptions,
    progress: &dyn RefineProgress,
) -> Vec<RefineOutcome> {
    let batch_size = options.batch_size.max(1);
    let max_workers = options.max_workers.max(1);
    let total = threads.len();
    let total_batches = total.div_ceil(batch_size);
    let semaphore = Arc::new(Semaphore::new(max_workers));

    info!(batch_size, max_workers, total_batches, "starting refinement");

    let mut outcomes = Vec::with_capacity(total);

    for (batch_index, batch) in threads.chunks(batch_size).enumerate() {
        progress.batch_started(batch_index + 1, total_batches, batch.len());
        debug!(batch = batch_index + 1, size = batch.len(), "refining batch");

        let mut handles = Vec::with_capacity(batch.len());
        for thread in batch {
            let request = ExtractRequest::from_thread(thread);
            let extractor = Arc::clone(&extractor);
            let sem = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|e| IssueKbError::Refine(format!("worker pool closed: {e}")))?;
                tokio::task::spawn_blocking(move || extractor.extract(&request))
                    .await
                    .map_err(|e| IssueKbError::Refine(format!("extraction task failed: {e}")))?
            }));
        }

        for (handle, thread) in handles.into_iter().zip(batch) {
            let outcome = match handle.await {
                Ok(Ok(candidate)) => RefineOutcome::Refined(RefinedQa {
                    candidate,
                    issue_id: thread.id,
                    issue_url: thread.url.clone(),
                    original_title: thread.title.clone(),
                }),
                Ok(Err(e)) => failed(thread, e.to_string()),
                Err(e) => failed(thread, format!("extraction task failed: {e}")),
            };
            outcomes.push(outcome);
            progress.thread_refined(outcomes.len(), total);
        }

        let more_batches = (batch_index + 1) * batch_size < total;
        if more_batches && !options.rate_limit_pause.is_zero() {
            debug!(pause_ms = options.rate_limit_pause.as_millis() as u64, "pausing between batches");
            tokio::time::sleep(options.rate_limit_pause).await;
        }
    }

    let failures = outcomes.iter().filter(|o| o.is_failed()).count();
    info!(refined = total - failures, failures, "refinement complete");
    outcomes
}

fn failed(thread: &Thread, error: String) -> RefineOutcome {
    warn!(issue = thread.id, %error, "extraction failed");
    RefineOutcome::Failed {
        issue_id: thread.id,
        issue_url: thread.url.clone(),
        error,
    }
}

// ---------------------------------------------------------------------------
// Quality filter
// ---------------------------------------------------------------------------

/// Keep the refined pairs worth publishing.
///
/// Drops failures, confidence below `min_confidence` (and non-numeric
/// confidence), `needs_more_info` candidates when `exclude_needs_more_info`
/// is set, blank questions or answers, and "no clear answer" answers.
pub fn filter_high_quality(
    outcomes: Vec<RefineOutcome>,
    min_confidence: f64,
    exclude_needs_more_info: bool,
) -> Vec<RefinedQa> {
    let total = outcomes.len();
    let kept: Vec<RefinedQa> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            RefineOutcome::Refined(qa) => Some(qa),
            RefineOutcome::Failed { .. } => None,
        })
        .filter(|qa| {
            let c = &qa.candidate;
            c.confidence >= min_confidence
                && !(exclude_needs_more_info && c.needs_more_info)
                && !c.extracted_question.trim().is_empty()
                && !c.extracted_answer.trim().is_empty()
                && !is_no_clear_answer(&c.extracted_answer)
        })
        .collect();

    debug!(total, kept = kept.len(), min_confidence, "filtered refined pairs");
    kept
}

fn is_no_clear_answer(answer: &str) -> bool {
    let answer = answer.trim().trim_end_matches('.').to_lowercase();
    NO_CLEAR_ANSWER_MARKERS.iter().any(|m| answer == *m)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizer::tests::{comment, thread};
    use issuekb_shared::ThreadState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candidate(confidence: f64) -> Candidate {
        Candidate {
            extracted_question: "How do I link on Windows?".into(),
            extracted_answer: "Install the MSVC build tools.".into(),
            confidence,
            multiple_answers: false,
            needs_more_info: false,
        }
    }

    fn refined(issue_id: u64, candidate: Candidate) -> RefineOutcome {
        RefineOutcome::Refined(RefinedQa {
            candidate,
            issue_id,
            issue_url: format!("https://github.com/acme/widgets/issues/{issue_id}"),
            original_title: "t".into(),
        })
    }

    fn numbered_threads(count: u64) -> Vec<Thread> {
        (1..=count)
            .map(|id| {
                let mut t = thread(ThreadState::Closed, "alice", vec![comment("bob", "fix")]);
                t.id = id;
                t
            })
            .collect()
    }

    /// Extractor that fails on chosen issues and tracks peak concurrency.
    struct FakeExtractor {
        fail_on: Vec<u64>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FakeExtractor {
        fn new(fail_on: Vec<u64>) -> Self {
            Self {
                fail_on,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Extractor for FakeExtractor {
        fn extract(&self, request: &ExtractRequest) -> Result<Candidate> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(15));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.contains(&request.issue_id) {
                return Err(IssueKbError::Refine(format!("rate limited on {}", request.issue_id)));
            }
            let mut c = candidate(0.9);
            c.extracted_question = format!("question {}", request.issue_id);
            Ok(c)
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    #[test]
    fn renders_thread_with_numbered_comments() {
        let t = thread(
            ThreadState::Open,
            "alice",
            vec![comment("bob", "try X"), comment("alice", "worked")],
        );
        let text = render_thread_text(&t);
        assert!(text.starts_with("Title: Build fails on Windows\n\nDescription:\nlinker error LNK2019"));
        assert!(text.contains("Comment 1 (author: bob):\ntry X"));
        assert!(text.ends_with("Comment 2 (author: alice):\nworked"));
    }

    #[test]
    fn request_message_serializes_correctly() {
        let request = ExtractRequest {
            issue_id: 7,
            issue_url: "https://github.com/acme/widgets/issues/7".into(),
            title: "t".into(),
            text: "body".into(),
        };
        let msg = RequestMessage::Extract {
            id: "req-1".into(),
            request: &request,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"extract""#));
        assert!(json.contains(r#""id":"req-1""#));
        assert!(json.contains(r#""issue_id":7"#));
    }

    #[test]
    fn shutdown_message_serializes_correctly() {
        let json = serde_json::to_string(&RequestMessage::Shutdown).unwrap();
        assert_eq!(json, r#"{"type":"shutdown"}"#);
    }

    #[test]
    fn response_message_deserializes_result() {
        let json = r#"{"type":"result","id":"req-3","result":{"extracted_question":"q","extracted_answer":"a","confidence":0.8,"multiple_answers":true,"needs_more_info":false}}"#;
        match serde_json::from_str::<ResponseMessage>(json).unwrap() {
            ResponseMessage::Result { id, result } => {
                assert_eq!(id, "req-3");
                assert_eq!(result.extracted_answer, "a");
                assert!(result.multiple_answers);
            }
            other => panic!("expected Result, got {other:?}"),
        }
    }

    #[test]
    fn response_message_deserializes_error() {
        let json = r#"{"type":"error","id":"req-2","error":"rate limited"}"#;
        match serde_json::from_str::<ResponseMessage>(json).unwrap() {
            ResponseMessage::Error { id, error } => {
                assert_eq!(id, "req-2");
                assert_eq!(error, "rate limited");
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refine_preserves_order_and_records_failures() {
        let fake = Arc::new(FakeExtractor::new(vec![3, 8]));
        let threads = numbered_threads(12);
        let options = RefineOptions {
            batch_size: 5,
            max_workers: 2,
            rate_limit_pause: Duration::ZERO,
        };

        let outcomes = refine_threads(fake.clone(), &threads, &options, &SilentRefineProgress).await;

        let ids: Vec<u64> = outcomes.iter().map(RefineOutcome::issue_id).collect();
        assert_eq!(ids, (1..=12).collect::<Vec<u64>>());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 12);
        assert!(fake.peak.load(Ordering::SeqCst) <= 2);

        match &outcomes[2] {
            RefineOutcome::Failed { issue_id, error, .. } => {
                assert_eq!(*issue_id, 3);
                assert!(error.contains("rate limited"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        match &outcomes[0] {
            RefineOutcome::Refined(qa) => {
                assert_eq!(qa.candidate.extracted_question, "question 1");
                assert_eq!(qa.original_title, "Build fails on Windows");
            }
            other => panic!("expected refined, got {other:?}"),
        }
        assert_eq!(outcomes.iter().filter(|o| o.is_failed()).count(), 2);
    }

    #[tokio::test]
    async fn pauses_between_batches_only() {
        let fake = Arc::new(FakeExtractor::new(vec![]));
        let threads = numbered_threads(3);
        let options = RefineOptions {
            batch_size: 1,
            max_workers: 1,
            rate_limit_pause: Duration::from_millis(30),
        };

        struct Batches(AtomicUsize);
        impl RefineProgress for Batches {
            fn batch_started(&self, _batch: usize, total_batches: usize, _size: usize) {
                assert_eq!(total_batches, 3);
                self.0.fetch_add(1, Ordering::SeqCst);
            }
            fn thread_refined(&self, _done: usize, _total: usize) {}
        }
        let progress = Batches(AtomicUsize::new(0));

        let start = std::time::Instant::now();
        let outcomes = refine_threads(fake, &threads, &options, &progress).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(progress.0.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let fake = Arc::new(FakeExtractor::new(vec![]));
        let outcomes =
            refine_threads(fake.clone(), &[], &RefineOptions::default(), &SilentRefineProgress).await;
        assert!(outcomes.is_empty());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn filter_drops_low_quality() {
        let mut needs_info = candidate(0.95);
        needs_info.needs_more_info = true;
        let mut no_answer = candidate(0.9);
        no_answer.extracted_answer = "No clear answer found.".into();
        let mut blank = candidate(0.9);
        blank.extracted_question = "  ".into();

        let outcomes = vec![
            refined(1, candidate(0.9)),
            refined(2, candidate(0.5)),
            refined(3, needs_info.clone()),
            refined(4, no_answer),
            refined(5, blank),
            refined(6, candidate(f64::NAN)),
            RefineOutcome::Failed {
                issue_id: 7,
                issue_url: String::new(),
                error: "boom".into(),
            },
            refined(8, candidate(0.7)),
        ];

        let kept: Vec<u64> = filter_high_quality(outcomes, 0.7, true)
            .iter()
            .map(|qa| qa.issue_id)
            .collect();
        assert_eq!(kept, vec![1, 8]);

        let kept = filter_high_quality(vec![refined(3, needs_info)], 0.7, false);
        assert_eq!(kept.len(), 1);
    }

    #[cfg(unix)]
    fn write_bridge_script(dir: &std::path::Path) -> std::path::PathBuf {
        let script = r#"
echo '{"type":"ready"}'
while IFS= read -r line; do
  case "$line" in
    *'"type":"shutdown"'*) exit 0 ;;
  esac
  id=$(printf '%s' "$line" | sed 's/.*"id":"\([^"]*\)".*/\1/')
  case "$line" in
    *'"issue_id":13'*) echo "{\"type\":\"error\",\"id\":\"$id\",\"error\":\"model overloaded\"}" ;;
    *) echo "{\"type\":\"result\",\"id\":\"$id\",\"result\":{\"extracted_question\":\"q\",\"extracted_answer\":\"a\",\"confidence\":0.9,\"multiple_answers\":false,\"needs_more_info\":false}}" ;;
  esac
done
"#;
        let path = dir.join("bridge.sh");
        std::fs::write(&path, script).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn bridge_extractor_speaks_json_lines() {
        let dir = std::env::temp_dir().join(format!("issuekb-bridge-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let script = write_bridge_script(&dir);

        let mut app = issuekb_shared::AppConfig::default();
        app.refine.bridge_cmd = "sh".into();
        app.refine.bridge_script = script.to_string_lossy().into_owned();
        app.refine.model = "test-model".into();
        let mut config = RefineConfig::from(&app);
        config.working_dir = dir.clone();

        let extractor = BridgeExtractor::spawn(&config).expect("spawn bridge");
        assert_eq!(extractor.model(), "test-model");

        let mut t = thread(ThreadState::Closed, "alice", vec![comment("bob", "fix")]);
        t.id = 12;
        let candidate = extractor.extract(&ExtractRequest::from_thread(&t)).expect("extract");
        assert_eq!(candidate.extracted_answer, "a");

        t.id = 13;
        let err = extractor.extract(&ExtractRequest::from_thread(&t)).unwrap_err();
        assert!(err.to_string().contains("model overloaded"));

        extractor.shutdown();
        let err = extractor.extract(&ExtractRequest::from_thread(&t)).unwrap_err();
        assert!(err.to_string().contains("shut down"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_bridge_command_is_refine_error() {
        let mut app = issuekb_shared::AppConfig::default();
        app.refine.bridge_cmd = format!("issuekb-no-such-bridge-{}", uuid::Uuid::now_v7());
        let err = BridgeExtractor::spawn(&RefineConfig::from(&app)).err().expect("spawn fails");
        assert!(matches!(err, IssueKbError::Refine(_)));
    }
}
