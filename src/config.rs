use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::consts::DEFAULT_MAX_BODY;
use crate::error::ConfigError;
use crate::logging::parse_level;
use crate::session::LoginSignatures;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Config file as written by the user. Everything is optional here so that
/// a missing key is reported by name instead of as a TOML error.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    /// seconds
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    max_errors: Option<u32>,
    #[serde(default)]
    uri_index: Option<String>,
    #[serde(default)]
    uri_login: Option<String>,
    #[serde(default)]
    uri_project: Option<String>,
    #[serde(default)]
    uri_user: Option<String>,
    #[serde(default)]
    logfile: Option<PathBuf>,
    #[serde(default)]
    loglevel: Option<String>,
    #[serde(default)]
    debug: bool,
    /// seconds
    #[serde(default)]
    retry_delay: Option<f64>,
    /// bytes
    #[serde(default)]
    max_body: Option<u64>,
    #[serde(default)]
    login_failed_md5: Option<String>,
    #[serde(default)]
    login_success_marker: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    /// Per-request ceiling
    pub timeout: Duration,
    /// Attempts allowed for every retry loop (login, exchange, fetch, user)
    pub max_errors: u32,
    pub uri_index: String,
    pub uri_login: String,
    /// Project id is appended to this
    pub uri_project: String,
    /// User id is appended to this
    pub uri_user: Option<String>,
    pub logfile: Option<PathBuf>,
    pub loglevel: Option<String>,
    pub debug: bool,
    /// Pause between failed attempts of one exchange
    pub retry_delay: Duration,
    /// Response bodies larger than this many bytes fail the exchange
    pub max_body: u64,
    /// How login responses are told apart
    pub login: LoginSignatures,
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let retry_delay = match raw.retry_delay {
            None => DEFAULT_RETRY_DELAY,
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid {
                key: "retry_delay",
                reason: e.to_string(),
            })?,
        };

        let defaults = LoginSignatures::default();
        let login = LoginSignatures {
            failure_md5: raw.login_failed_md5.unwrap_or(defaults.failure_md5),
            success_marker: raw.login_success_marker.unwrap_or(defaults.success_marker),
        };

        let config = Config {
            username: raw.username.ok_or(ConfigError::Missing("username"))?,
            password: raw.password.ok_or(ConfigError::Missing("password"))?,
            timeout: Duration::from_secs(raw.timeout.ok_or(ConfigError::Missing("timeout"))?),
            max_errors: raw.max_errors.ok_or(ConfigError::Missing("max_errors"))?,
            uri_index: raw.uri_index.ok_or(ConfigError::Missing("uri_index"))?,
            uri_login: raw.uri_login.ok_or(ConfigError::Missing("uri_login"))?,
            uri_project: raw.uri_project.ok_or(ConfigError::Missing("uri_project"))?,
            uri_user: raw.uri_user,
            logfile: raw.logfile,
            loglevel: raw.loglevel,
            debug: raw.debug,
            retry_delay,
            max_body: raw.max_body.unwrap_or(DEFAULT_MAX_BODY),
            login,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Load the first config file that exists among the usual locations
    pub fn discover() -> Result<Self, ConfigError> {
        let paths = Self::get_config_paths();
        match paths.iter().find(|p| p.exists()) {
            Some(path) => Self::load(path),
            None => Err(ConfigError::NotFound(
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        raw.try_into()
    }

    /// Reject anything that would only blow up later, deep in a request
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::Missing("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Missing("password"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "timeout",
                reason: "must be at least one second".to_string(),
            });
        }
        if self.max_errors == 0 {
            return Err(ConfigError::Invalid {
                key: "max_errors",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.max_body == 0 {
            return Err(ConfigError::Invalid {
                key: "max_body",
                reason: "must be at least 1".to_string(),
            });
        }

        check_uri("uri_index", &self.uri_index)?;
        check_uri("uri_login", &self.uri_login)?;
        check_uri("uri_project", &self.uri_project)?;
        if let Some(uri) = &self.uri_user {
            check_uri("uri_user", uri)?;
        }

        if self.login.failure_md5.len() != 32
            || !self.login.failure_md5.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ConfigError::Invalid {
                key: "login_failed_md5",
                reason: "expected 32 hex digits".to_string(),
            });
        }
        if self.login.success_marker.is_empty() {
            return Err(ConfigError::Invalid {
                key: "login_success_marker",
                reason: "must not be empty".to_string(),
            });
        }

        if let Some(level) = &self.loglevel
            && parse_level(level).is_none()
        {
            return Err(ConfigError::Invalid {
                key: "loglevel",
                reason: format!("unknown level \"{level}\""),
            });
        }
        Ok(())
    }

    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. XDG config: ~/.config/tpen/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("tpen").join("config.toml"));
        }

        // 2. Platform config dir (macOS: ~/Library/Application Support/tpen/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("tpen").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        // 3. Home directory: ~/.tpen.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tpen.toml"));
        }

        paths
    }
}

fn check_uri(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(value).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("\"{value}\": {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("unsupported scheme \"{other}\""),
        }),
    }
}
