use printdesk_core::config::{AppConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable. Repeated calls are ignored.
pub fn init(config: &AppConfig) {
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(env_filter(&config.logging.level))
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Filter for the configured level; an unparseable directive falls back to
/// `info`.
pub(crate) fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level.trim()).unwrap_or_else(|_| EnvFilter::new("info"))
}
