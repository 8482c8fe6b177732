use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::ConfigError;

/// Accepts tracing level names plus the `warning`/`critical` spellings
/// found in older config files.
pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        "critical" | "fatal" => Some(Level::ERROR),
        other => other.parse().ok(),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the config; `debug = true` wins over `loglevel`.
/// With `logfile` set, lines are appended to that file instead of stderr.
pub fn init(config: &Config) -> Result<(), ConfigError> {
    let level = if config.debug {
        Level::DEBUG
    } else {
        config
            .loglevel
            .as_deref()
            .and_then(parse_level)
            .unwrap_or(Level::INFO)
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = match &config.logfile {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ConfigError::Invalid {
                    key: "logfile",
                    reason: format!("{}: {e}", path.display()),
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    Ok(())
}
