use thiserror::Error;

/// Top-level error for every fallible session operation
#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication failed after {attempts} attempts")]
    Authentication { attempts: u32 },

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Network(#[from] NetworkError),

    #[error("{0}")]
    InvalidVerb(#[from] InvalidVerbError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration key: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("No config file found (tried {0})")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to <{url}> timed out")]
    Timeout { url: String },

    #[error("{method} <{url}> returned status code {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("I/O error talking to <{url}>: {source}")]
    Io {
        url: String,
        source: std::io::Error,
    },

    #[error("HTTP error talking to <{url}>: {message}")]
    Http { url: String, message: String },
}

#[derive(Debug, Error)]
#[error("invalid verb \"{verb}\" (expected get or post)")]
pub struct InvalidVerbError {
    pub verb: String,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
