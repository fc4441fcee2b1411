//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use issuekb_core::pipeline::{
    self, BuildKbConfig, ProgressReporter, RefineKbConfig, RunResult,
};
use issuekb_shared::{
    AppConfig, RefineConfig, check_api_key, init_config, load_config, load_config_from,
};
use tracing::{info, warn};
use url::Url;

const GITHUB_BASE_URL: &str = "https://github.com";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// issuekb: build a Q&A knowledge base from GitHub issues.
#[derive(Parser)]
#[command(
    name = "issuekb",
    version,
    about = "Turn GitHub issue discussions into a structured Q&A knowledge base.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.issuekb/issuekb.toml.
    #[arg(long, global = true, env = "ISSUEKB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Classify an issue export and write the knowledge base.
    Build {
        /// Issue export (JSON array of issues with `comment_data`).
        #[arg(short, long)]
        input: PathBuf,

        /// Repository, as a URL or `owner/repo`, shown in the knowledge base header.
        #[arg(short, long)]
        repo: Option<String>,

        /// Login to treat as a maintainer (repeatable).
        #[arg(short, long = "maintainer")]
        maintainers: Vec<String>,

        /// Do not derive maintainers from comment author associations.
        #[arg(long)]
        no_associations: bool,

        /// Output directory (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Process at most this many issues.
        #[arg(long)]
        max_issues: Option<usize>,

        /// Also run LLM refinement through the bridge.
        #[arg(long)]
        refine: bool,

        /// Model passed to the refinement bridge.
        #[arg(long)]
        model: Option<String>,
    },

    /// Refine an issue export through the LLM bridge only.
    Refine {
        /// Issue export (JSON array of issues with `comment_data`).
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Model passed to the refinement bridge.
        #[arg(long)]
        model: Option<String>,

        /// Minimum extractor confidence to keep (0-1).
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Process at most this many issues.
        #[arg(long)]
        max_issues: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "issuekb=info",
        1 => "issuekb=debug",
        _ => "issuekb=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Build {
            input,
            repo,
            maintainers,
            no_associations,
            out,
            max_issues,
            refine,
            model,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let args = BuildArgs {
                input,
                repo,
                maintainers,
                no_associations,
                out,
                max_issues,
                refine,
                model,
            };
            cmd_build(&config, args).await
        }
        Command::Refine {
            input,
            out,
            model,
            min_confidence,
            max_issues,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_refine(&config, input, out, model, min_confidence, max_issues).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

struct BuildArgs {
    input: PathBuf,
    repo: Option<String>,
    maintainers: Vec<String>,
    no_associations: bool,
    out: Option<PathBuf>,
    max_issues: Option<usize>,
    refine: bool,
    model: Option<String>,
}

async fn cmd_build(config: &AppConfig, args: BuildArgs) -> Result<()> {
    let (repo_name, repo_url) = match args.repo.as_deref() {
        Some(repo) => {
            let (name, url) = parse_repo(repo)?;
            (Some(name), Some(url))
        }
        None => (None, None),
    };

    let refine = if args.refine {
        warn_missing_api_key(config);
        Some(refine_config(config, args.model)?)
    } else {
        None
    };

    let mut maintainer_logins = config.maintainers.logins.clone();
    maintainer_logins.extend(args.maintainers);

    let build_config = BuildKbConfig {
        input: args.input,
        output_dir: output_dir(config, args.out),
        repo_name,
        repo_url,
        maintainer_logins,
        associations: if args.no_associations {
            Vec::new()
        } else {
            config.maintainers.associations.clone()
        },
        max_issues: args.max_issues.or(config.defaults.max_issues),
        refine,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        input = %build_config.input.display(),
        out = %build_config.output_dir.display(),
        refine = build_config.refine.is_some(),
        "building knowledge base"
    );

    let reporter = CliProgress::new()?;
    let result = pipeline::build_kb(&build_config, &reporter).await?;

    println!();
    println!("  Knowledge base built!");
    println!("  Threads:     {}", result.counts.threads);
    println!("  Q&A pairs:   {}", result.counts.qa_pairs);
    println!("  Accepted:    {}", result.counts.accepted_answers);
    println!("  Maintainers: {}", result.counts.maintainers);
    if let Some(refined) = result.counts.refined {
        println!("  Refined:     {refined}");
    }
    print_files(&result);
    Ok(())
}

// ---------------------------------------------------------------------------
// refine
// ---------------------------------------------------------------------------

async fn cmd_refine(
    config: &AppConfig,
    input: PathBuf,
    out: Option<PathBuf>,
    model: Option<String>,
    min_confidence: Option<f64>,
    max_issues: Option<usize>,
) -> Result<()> {
    warn_missing_api_key(config);

    let mut refine = refine_config(config, model)?;
    if let Some(threshold) = min_confidence {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(eyre!("--min-confidence must be between 0 and 1, got {threshold}"));
        }
        refine.min_confidence = threshold;
    }

    let refine_config = RefineKbConfig {
        input,
        output_dir: output_dir(config, out),
        max_issues: max_issues.or(config.defaults.max_issues),
        refine,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        input = %refine_config.input.display(),
        model = %refine_config.refine.model,
        "refining issues"
    );

    let reporter = CliProgress::new()?;
    let result = pipeline::refine_kb(&refine_config, &reporter).await?;

    println!();
    println!("  Refinement complete!");
    println!("  Threads:  {}", result.counts.threads);
    println!("  Kept:     {}", result.counts.refined.unwrap_or_default());
    println!("  Failures: {}", result.counts.refine_failures.unwrap_or_default());
    print_files(&result);
    Ok(())
}

fn refine_config(config: &AppConfig, model: Option<String>) -> Result<RefineConfig> {
    let mut refine = RefineConfig::from(config);
    refine.working_dir =
        std::env::current_dir().map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    if let Some(model) = model {
        refine.model = model;
    }
    Ok(refine)
}

fn warn_missing_api_key(config: &AppConfig) {
    if let Err(e) = check_api_key(config) {
        warn!("{e}");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn output_dir(config: &AppConfig, out: Option<PathBuf>) -> PathBuf {
    out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir))
}

fn print_files(result: &RunResult) {
    println!("  Output:");
    for file in &result.files {
        println!("    {}", file.display());
    }
    println!("    {}", result.manifest_path.display());
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

/// Parse `--repo` into (`owner/repo`, repository URL).
///
/// Accepts a full URL (`https://github.com/owner/repo`, optional `.git`
/// suffix or trailing path) or the `owner/repo` shorthand.
fn parse_repo(raw: &str) -> Result<(String, String)> {
    let raw = raw.trim();
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let trimmed = raw.trim_matches('/');
            // A dotted first segment is a host written without a scheme.
            let first = trimmed.split('/').next().unwrap_or_default();
            let absolute = if first.contains('.') {
                format!("https://{trimmed}")
            } else {
                format!("{GITHUB_BASE_URL}/{trimmed}")
            };
            Url::parse(&absolute).map_err(|e| eyre!("invalid repository '{raw}': {e}"))?
        }
        Err(e) => return Err(eyre!("invalid repository '{raw}': {e}")),
    };

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let (owner, repo) = match segments.as_slice() {
        [owner, repo, ..] => (*owner, repo.trim_end_matches(".git")),
        _ => return Err(eyre!("repository must look like owner/repo, got '{raw}'")),
    };

    let host = url
        .host_str()
        .ok_or_else(|| eyre!("repository URL has no host: '{raw}'"))?;
    let name = format!("{owner}/{repo}");
    Ok((name.clone(), format!("{}://{host}/{name}", url.scheme())))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .map_err(|e| eyre!("invalid progress template: {e}"))?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn thread_classified(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Classifying [{current}/{total}]"));
    }

    fn thread_refined(&self, current: usize, total: usize) {
        self.spinner.set_message(format!("Refining [{current}/{total}]"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
