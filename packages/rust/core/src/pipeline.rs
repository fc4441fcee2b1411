//! End-to-end pipelines.
//!
//! `build_kb`: issue export → threads → maintainer set → organize + classify
//! → JSON/Markdown exports → optional refinement → manifest.
//!
//! `refine_kb`: issue export → threads → refinement → refined exports →
//! manifest.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use issuekb_export::{
    KbHeader, Manifest, ManifestCounts, export_discussions, export_knowledge_base,
    export_qa_pairs, export_refined, export_refined_markdown, file_entry, write_manifest,
};
use issuekb_shared::{
    Discussion, IssueKbError, MaintainerSet, QaPair, RefineConfig, Result, Thread,
};
use issuekb_source::{load_issues, maintainers_from_associations, threads_from_issues};

use crate::classifier::QaClassifier;
use crate::organizer;
use crate::refine::{
    self, BridgeExtractor, Extractor, RefineOptions, RefineOutcome, RefineProgress,
};

/// Configuration for the `build_kb` pipeline.
#[derive(Debug, Clone)]
pub struct BuildKbConfig {
    /// Issue export to read.
    pub input: PathBuf,
    /// Directory that receives every output file.
    pub output_dir: PathBuf,
    /// Display name for the knowledge base (e.g. `owner/repo`).
    /// Defaults to the input file name.
    pub repo_name: Option<String>,
    pub repo_url: Option<String>,
    /// Logins always treated as maintainers.
    pub maintainer_logins: Vec<String>,
    /// `author_association` values that mark a maintainer. Empty disables.
    pub associations: Vec<String>,
    pub max_issues: Option<usize>,
    /// Run LLM refinement after the basic exports.
    pub refine: Option<RefineConfig>,
    pub tool_version: String,
}

/// Configuration for the `refine_kb` pipeline.
#[derive(Debug, Clone)]
pub struct RefineKbConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub max_issues: Option<usize>,
    pub refine: RefineConfig,
    pub tool_version: String,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct RunResult {
    pub output_dir: PathBuf,
    /// Output files in the order they were written, manifest excluded.
    pub files: Vec<PathBuf>,
    pub manifest_path: PathBuf,
    pub counts: ManifestCounts,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each thread is classified.
    fn thread_classified(&self, current: usize, total: usize);
    /// Called after each thread is refined.
    fn thread_refined(&self, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn thread_classified(&self, _current: usize, _total: usize) {}
    fn thread_refined(&self, _current: usize, _total: usize) {}
    fn done(&self, _result: &RunResult) {}
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

/// Run the full `build` pipeline, spawning the refinement bridge if
/// `config.refine` is set.
pub async fn build_kb(config: &BuildKbConfig, progress: &dyn ProgressReporter) -> Result<RunResult> {
    let extractor = match &config.refine {
        Some(refine_config) => {
            progress.phase("Starting refinement bridge");
            let bridge: Arc<dyn Extractor> = Arc::new(BridgeExtractor::spawn(refine_config)?);
            Some(bridge)
        }
        None => None,
    };
    build_kb_with(config, extractor, progress).await
}

/// [`build_kb`] with a caller-supplied extractor.
///
/// Refinement runs only when both `config.refine` and `extractor` are set.
#[instrument(skip_all, fields(input = %config.input.display(), out = %config.output_dir.display()))]
pub async fn build_kb_with(
    config: &BuildKbConfig,
    extractor: Option<Arc<dyn Extractor>>,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();
    info!(%run_id, "starting build pipeline");

    // --- Phase 1: Load ---
    progress.phase("Loading issues");
    let issues = load_issues(&config.input)?;
    let issues_loaded = issues.len();

    let mut maintainers: MaintainerSet = config.maintainer_logins.iter().collect();
    maintainers.extend(maintainers_from_associations(&issues, &config.associations).logins());
    info!(maintainers = maintainers.len(), "maintainer set ready");

    let threads = threads_from_issues(issues, config.max_issues);
    ensure_threads(&threads)?;

    // --- Phase 2: Classify ---
    progress.phase("Classifying threads");
    let classifier = QaClassifier::default();
    let total = threads.len();
    let mut pairs: Vec<QaPair> = Vec::with_capacity(total);
    let mut discussions: Vec<Discussion> = Vec::with_capacity(total);
    for (i, thread) in threads.iter().enumerate() {
        pairs.push(classifier.classify(thread, &maintainers));
        discussions.push(organizer::discussion(thread));
        progress.thread_classified(i + 1, total);
    }
    let accepted_answers = pairs.iter().filter(|p| p.has_accepted_answer()).count();
    info!(pairs = pairs.len(), accepted_answers, "classification complete");

    // --- Phase 3: Export ---
    progress.phase("Writing exports");
    let now = Utc::now();
    create_output_dir(&config.output_dir)?;
    let header = KbHeader {
        repo: config
            .repo_name
            .clone()
            .unwrap_or_else(|| display_name(&config.input)),
        repo_url: config.repo_url.clone(),
    };
    let mut files = vec![
        export_qa_pairs(&config.output_dir, &pairs, now)?,
        export_discussions(&config.output_dir, &discussions, now)?,
        export_knowledge_base(&config.output_dir, &pairs, &header, now)?,
    ];

    let mut counts = ManifestCounts {
        issues_loaded,
        threads: total,
        qa_pairs: pairs.len(),
        accepted_answers,
        maintainers: maintainers.len(),
        ..Default::default()
    };

    // --- Phase 4: Refine (optional) ---
    let mut model = None;
    match (&config.refine, extractor) {
        (Some(refine_config), Some(extractor)) => {
            model = Some(extractor.model().to_string());
            let stage = refine_stage(extractor, &threads, refine_config, &config.output_dir, progress).await?;
            counts.refined = Some(stage.kept);
            counts.refine_failures = Some(stage.failures);
            files.extend(stage.files);
        }
        (Some(_), None) => warn!("refinement requested without an extractor, skipping"),
        _ => {}
    }

    // --- Phase 5: Manifest ---
    progress.phase("Writing manifest");
    let manifest = Manifest {
        run_id,
        tool_version: config.tool_version.clone(),
        generated_at: now,
        source: config.input.display().to_string(),
        repo_url: config.repo_url.clone(),
        model,
        counts: counts.clone(),
        files: files.iter().map(|p| file_entry(p)).collect::<Result<_>>()?,
    };
    let manifest_path = write_manifest(&config.output_dir, &manifest)?;

    let result = RunResult {
        output_dir: config.output_dir.clone(),
        files,
        manifest_path,
        counts,
        elapsed: start.elapsed(),
    };
    progress.done(&result);

    info!(
        %run_id,
        files = result.files.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build pipeline complete"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// refine
// ---------------------------------------------------------------------------

/// Run the `refine` pipeline with the configured bridge.
pub async fn refine_kb(config: &RefineKbConfig, progress: &dyn ProgressReporter) -> Result<RunResult> {
    progress.phase("Starting refinement bridge");
    let bridge: Arc<dyn Extractor> = Arc::new(BridgeExtractor::spawn(&config.refine)?);
    refine_kb_with(config, bridge, progress).await
}

/// [`refine_kb`] with a caller-supplied extractor.
#[instrument(skip_all, fields(input = %config.input.display(), model = %extractor.model()))]
pub async fn refine_kb_with(
    config: &RefineKbConfig,
    extractor: Arc<dyn Extractor>,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();
    info!(%run_id, "starting refine pipeline");

    progress.phase("Loading issues");
    let issues = load_issues(&config.input)?;
    let issues_loaded = issues.len();
    let threads = threads_from_issues(issues, config.max_issues);
    ensure_threads(&threads)?;

    create_output_dir(&config.output_dir)?;
    let model = extractor.model().to_string();
    let stage = refine_stage(extractor, &threads, &config.refine, &config.output_dir, progress).await?;

    progress.phase("Writing manifest");
    let counts = ManifestCounts {
        issues_loaded,
        threads: threads.len(),
        refined: Some(stage.kept),
        refine_failures: Some(stage.failures),
        ..Default::default()
    };
    let manifest = Manifest {
        run_id,
        tool_version: config.tool_version.clone(),
        generated_at: stage.generated_at,
        source: config.input.display().to_string(),
        repo_url: None,
        model: Some(model),
        counts: counts.clone(),
        files: stage.files.iter().map(|p| file_entry(p)).collect::<Result<_>>()?,
    };
    let manifest_path = write_manifest(&config.output_dir, &manifest)?;

    let result = RunResult {
        output_dir: config.output_dir.clone(),
        files: stage.files,
        manifest_path,
        counts,
        elapsed: start.elapsed(),
    };
    progress.done(&result);

    info!(%run_id, refined = stage.kept, "refine pipeline complete");
    Ok(result)
}

// ---------------------------------------------------------------------------
// Shared stages
// ---------------------------------------------------------------------------

struct RefineStage {
    files: Vec<PathBuf>,
    kept: usize,
    failures: usize,
    generated_at: chrono::DateTime<Utc>,
}

async fn refine_stage(
    extractor: Arc<dyn Extractor>,
    threads: &[Thread],
    config: &RefineConfig,
    output_dir: &Path,
    progress: &dyn ProgressReporter,
) -> Result<RefineStage> {
    progress.phase("Refining with LLM");
    let adapter = PipelineRefineProgress { inner: progress };
    let outcomes =
        refine::refine_threads(extractor, threads, &RefineOptions::from(config), &adapter).await;
    let failures = outcomes.iter().filter(|o| o.is_failed()).count();
    if failures == outcomes.len() {
        if let Some(RefineOutcome::Failed { error, .. }) = outcomes.first() {
            warn!(%error, "every extraction failed");
        }
    }

    let refined =
        refine::filter_high_quality(outcomes, config.min_confidence, config.exclude_needs_more_info);

    progress.phase("Writing refined exports");
    let now = Utc::now();
    let files = vec![
        export_refined(output_dir, &refined, now)?,
        export_refined_markdown(output_dir, &refined, now)?,
    ];

    Ok(RefineStage {
        files,
        kept: refined.len(),
        failures,
        generated_at: now,
    })
}

fn ensure_threads(threads: &[Thread]) -> Result<()> {
    if threads.is_empty() {
        return Err(IssueKbError::validation(
            "no issues to process (the export is empty or contains only pull requests)",
        ));
    }
    Ok(())
}

fn create_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| IssueKbError::io(dir, e))
}

fn display_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string())
}

// ---------------------------------------------------------------------------
// Refine progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the `RefineProgress` interface.
struct PipelineRefineProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl RefineProgress for PipelineRefineProgress<'_> {
    fn batch_started(&self, batch: usize, total_batches: usize, size: usize) {
        self.inner
            .phase(&format!("Refining batch {batch}/{total_batches} ({size} threads)"));
    }

    fn thread_refined(&self, done: usize, total: usize) {
        self.inner.thread_refined(done, total);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
