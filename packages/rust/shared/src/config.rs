//! Application configuration for issuekb.
//!
//! User config lives at `~/.issuekb/issuekb.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IssueKbError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "issuekb.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".issuekb";

// ---------------------------------------------------------------------------
// Config structs (matching issuekb.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Maintainer detection.
    #[serde(default)]
    pub maintainers: MaintainersConfig,

    /// LLM refinement bridge settings.
    #[serde(default)]
    pub refine: RefineSettings,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory that receives JSON/Markdown output.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Cap on the number of issues processed per run (after PR filtering).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_issues: Option<usize>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_issues: None,
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}

/// `[maintainers]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintainersConfig {
    /// Logins always treated as maintainers.
    #[serde(default)]
    pub logins: Vec<String>,

    /// `author_association` values that mark a commenter as a maintainer.
    /// Empty disables association-based detection.
    #[serde(default = "default_associations")]
    pub associations: Vec<String>,
}

impl Default for MaintainersConfig {
    fn default() -> Self {
        Self {
            logins: Vec::new(),
            associations: default_associations(),
        }
    }
}

fn default_associations() -> Vec<String> {
    vec!["OWNER".into(), "MEMBER".into(), "COLLABORATOR".into()]
}

/// `[refine]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineSettings {
    /// Command that runs the extraction bridge (e.g. `bun`, `node`, `python3`).
    #[serde(default = "default_bridge_cmd")]
    pub bridge_cmd: String,

    /// Bridge script passed to the command.
    #[serde(default = "default_bridge_script")]
    pub bridge_script: String,

    /// Model identifier forwarded to the bridge.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var the bridge reads its API key from (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Threads per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum extractions in flight within a batch.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Pause between batches, in milliseconds.
    #[serde(default = "default_rate_limit_pause")]
    pub rate_limit_pause_ms: u64,

    /// Minimum extractor confidence kept in the refined output.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Drop candidates the extractor flagged as needing more information.
    #[serde(default = "default_true")]
    pub exclude_needs_more_info: bool,
}

impl Default for RefineSettings {
    fn default() -> Self {
        Self {
            bridge_cmd: default_bridge_cmd(),
            bridge_script: default_bridge_script(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
            rate_limit_pause_ms: default_rate_limit_pause(),
            min_confidence: default_min_confidence(),
            exclude_needs_more_info: true,
        }
    }
}

fn default_bridge_cmd() -> String {
    "bun".into()
}
fn default_bridge_script() -> String {
    "bridge/extract.ts".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_batch_size() -> usize {
    10
}
fn default_max_workers() -> usize {
    5
}
fn default_rate_limit_pause() -> u64 {
    1000
}
fn default_min_confidence() -> f64 {
    0.7
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Refine config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime refinement configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RefineConfig {
    pub bridge_cmd: String,
    pub bridge_script: String,
    /// Working directory for the bridge subprocess.
    pub working_dir: PathBuf,
    pub model: String,
    pub batch_size: usize,
    pub max_workers: usize,
    pub rate_limit_pause: Duration,
    pub min_confidence: f64,
    pub exclude_needs_more_info: bool,
}

impl From<&AppConfig> for RefineConfig {
    fn from(config: &AppConfig) -> Self {
        let refine = &config.refine;
        Self {
            bridge_cmd: refine.bridge_cmd.clone(),
            bridge_script: refine.bridge_script.clone(),
            working_dir: PathBuf::from("."),
            model: refine.model.clone(),
            batch_size: refine.batch_size.max(1),
            max_workers: refine.max_workers.max(1),
            rate_limit_pause: Duration::from_millis(refine.rate_limit_pause_ms),
            min_confidence: refine.min_confidence,
            exclude_needs_more_info: refine.exclude_needs_more_info,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.issuekb/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| IssueKbError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.issuekb/issuekb.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| IssueKbError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        IssueKbError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Reject values the refinement stage cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let threshold = config.refine.min_confidence;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(IssueKbError::config(format!(
            "refine.min_confidence must be between 0 and 1, got {threshold}"
        )));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IssueKbError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| IssueKbError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IssueKbError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the env var the bridge reads its API key from is set and non-empty.
pub fn check_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.refine.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(IssueKbError::config(format!(
            "API key not found. Set the {var_name} environment variable for the refinement bridge."
        ))),
    }
}
