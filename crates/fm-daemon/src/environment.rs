use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fm_core::config::Config;
use tracing::{debug, info, warn};

/// Environment variables consulted after the config file.
pub const ENV_TASKS: &str = "FORGEMIND_TASKS";
pub const ENV_LATENCY_SCALE: &str = "FORGEMIND_LATENCY_SCALE";
pub const ENV_LOG_LEVEL: &str = "FORGEMIND_LOG_LEVEL";

/// Command-line values that win over the file and the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub tasks: Option<usize>,
    pub latency_scale: Option<f64>,
    pub json_logs: bool,
}

/// Load `.env` from the working directory if there is one.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenv::dotenv() {
        Ok(path) => Some(path),
        Err(e) => {
            debug!(error = %e, "no .env loaded");
            None
        }
    }
}

/// Resolve the effective configuration: file (explicit path or
/// `~/.forgemind/config.toml`), then environment, then flags.
pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load default config")?,
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    apply_overrides(&mut config, overrides);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Apply `FORGEMIND_*` variables. Unparseable values are ignored with a
/// warning.
pub fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_TASKS) {
        match raw.trim().parse() {
            Ok(n) => config.integrations.task_count = n,
            Err(_) => warn!(var = ENV_TASKS, value = %raw, "ignoring unparseable value"),
        }
    }
    if let Some(raw) = lookup(ENV_LATENCY_SCALE) {
        match raw.trim().parse() {
            Ok(scale) => config.integrations.latency_scale = scale,
            Err(_) => warn!(var = ENV_LATENCY_SCALE, value = %raw, "ignoring unparseable value"),
        }
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.general.log_level = level;
    }
}

pub fn apply_overrides(config: &mut Config, overrides: &Overrides) {
    if let Some(tasks) = overrides.tasks {
        config.integrations.task_count = tasks;
    }
    if let Some(scale) = overrides.latency_scale {
        config.integrations.latency_scale = scale;
    }
    if overrides.json_logs {
        config.general.json_logs = true;
    }
    info!(
        tasks = config.integrations.task_count,
        latency_scale = config.integrations.latency_scale,
        "configuration resolved"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_values_apply() {
        let mut config = Config::default();
        apply_env(
            &mut config,
            env(&[
                (ENV_TASKS, "12"),
                (ENV_LATENCY_SCALE, "0.5"),
                (ENV_LOG_LEVEL, "debug"),
            ]),
        );
        assert_eq!(config.integrations.task_count, 12);
        assert_eq!(config.integrations.latency_scale, 0.5);
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn garbage_env_values_are_ignored() {
        let mut config = Config::default();
        apply_env(&mut config, env(&[(ENV_TASKS, "many")]));
        assert_eq!(config.integrations.task_count, Config::default().integrations.task_count);
    }

    #[test]
    fn flags_win_over_env() {
        let mut config = Config::default();
        apply_env(&mut config, env(&[(ENV_TASKS, "12")]));
        apply_overrides(
            &mut config,
            &Overrides {
                tasks: Some(4),
                latency_scale: Some(0.0),
                json_logs: true,
            },
        );
        assert_eq!(config.integrations.task_count, 4);
        assert_eq!(config.integrations.latency_scale, 0.0);
        assert!(config.general.json_logs);
    }
}
