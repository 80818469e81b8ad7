use fm_core::config::GeneralConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Level used when the configured directive does not parse.
pub const FALLBACK_LEVEL: &str = "info";

/// Build the filter: `RUST_LOG` wins, then `default_level`, then
/// [`FALLBACK_LEVEL`] if `default_level` is not a valid directive.
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

/// Human-readable output. Later calls are no-ops.
pub fn init_logging(service_name: &str, default_level: &str) {
    fmt()
        .with_env_filter(build_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .try_init()
        .ok();

    tracing::debug!(service = service_name, format = "text", "logging initialised");
}

/// JSON lines, one object per event. Later calls are no-ops.
pub fn init_logging_json(service_name: &str, default_level: &str) {
    fmt()
        .json()
        .with_env_filter(build_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(false)
        .try_init()
        .ok();

    tracing::debug!(service = service_name, format = "json", "logging initialised");
}

/// Pick the format and level from the `[general]` config section.
pub fn init_from_config(service_name: &str, general: &GeneralConfig) {
    if general.json_logs {
        init_logging_json(service_name, &general.log_level);
    } else {
        init_logging(service_name, &general.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_falls_back() {
        std::env::remove_var("RUST_LOG");
        let filter = build_filter("fm_agents=loud");
        assert_eq!(filter.to_string(), FALLBACK_LEVEL);
    }

    #[test]
    fn configured_directive_is_kept() {
        std::env::remove_var("RUST_LOG");
        let filter = build_filter("fm_agents=debug");
        assert_eq!(filter.to_string(), "fm_agents=debug");
    }
}
