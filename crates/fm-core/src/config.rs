use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration loaded from `~/.forgemind/config.toml`.
///
/// Every section falls back to its defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

impl Config {
    /// Load config from `~/.forgemind/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&text)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Semantic validation for settings that are not fully expressible via type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.integrations.validate()?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".forgemind")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_project_name() -> String {
    "forgemind".into()
}
fn default_log_level() -> String {
    "info".into()
}

/// Scheduler pacing, retry policy, and log retention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Retries after the first attempt of a retry-wrapped step.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff before retry `n` is `base_backoff_ms * 2^n`.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Delay between one processed task and the next dequeue.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            pacing_ms: default_pacing_ms(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl PipelineConfig {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.log_capacity == 0 {
            return Err(ConfigError::Validation(
                "pipeline.log_capacity must be at least 1".into(),
            ));
        }
        if self.max_retries > 16 {
            return Err(ConfigError::Validation(format!(
                "pipeline.max_retries must be <= 16 (got {})",
                self.max_retries
            )));
        }
        Ok(())
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_backoff_ms() -> u64 {
    1000
}
fn default_pacing_ms() -> u64 {
    1500
}
fn default_log_capacity() -> usize {
    200
}

/// Knobs for the simulated collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationsConfig {
    /// Number of tasks the simulated task tracker returns.
    #[serde(default = "default_task_count")]
    pub task_count: usize,
    /// Multiplier applied to every simulated latency (0 disables waiting).
    #[serde(default = "default_latency_scale")]
    pub latency_scale: f64,
    /// Probability that a simulated commit is rejected.
    #[serde(default = "default_commit_failure_rate")]
    pub commit_failure_rate: f64,
    /// Probability that a simulated generator returns unparseable output.
    #[serde(default)]
    pub malformed_rate: f64,
    #[serde(default = "default_chat_channel")]
    pub chat_channel: String,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            task_count: default_task_count(),
            latency_scale: default_latency_scale(),
            commit_failure_rate: default_commit_failure_rate(),
            malformed_rate: 0.0,
            chat_channel: default_chat_channel(),
        }
    }
}

/// Upper bound for `integrations.latency_scale`.
pub const MAX_LATENCY_SCALE: f64 = 1000.0;

impl IntegrationsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.task_count == 0 {
            return Err(ConfigError::Validation(
                "integrations.task_count must be at least 1".into(),
            ));
        }
        if !(0.0..=MAX_LATENCY_SCALE).contains(&self.latency_scale) {
            return Err(ConfigError::Validation(format!(
                "integrations.latency_scale must be within [0, {MAX_LATENCY_SCALE}] (got {})",
                self.latency_scale
            )));
        }
        for (field, rate) in [
            ("commit_failure_rate", self.commit_failure_rate),
            ("malformed_rate", self.malformed_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Validation(format!(
                    "integrations.{field} must be within [0, 1] (got {rate})"
                )));
            }
        }
        Ok(())
    }
}

fn default_task_count() -> usize {
    100
}
fn default_latency_scale() -> f64 {
    1.0
}
fn default_commit_failure_rate() -> f64 {
    0.05
}
fn default_chat_channel() -> String {
    "#dev-updates".into()
}
