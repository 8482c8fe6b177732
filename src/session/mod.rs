//! Authenticated session
//!
//! A [`Session`] only exists once the login state machine has succeeded.
//! It owns the cookie jar, the listing memo and the error tallies; all
//! operations run one at a time through `&mut self`.

mod login;
mod projects;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ConfigError, Error, Result};
use crate::project::ProjectRef;
use crate::retry::{Budget, Verdict};
use crate::tally::ErrorTally;
use crate::transport::{CookieJar, HttpClient, Transport, UreqTransport};

pub use login::{LoginCheck, LoginSignatures, LoginState, body_md5};
pub use projects::Projects;

use login::{Credentials, authenticate};

#[derive(Debug, Clone)]
struct Endpoints {
    index: String,
    project: String,
    user: Option<String>,
}

pub struct Session {
    client: HttpClient,
    cookies: CookieJar,
    tally: ErrorTally,
    /// Operation-level loops: project fetch, user lookup
    budget: Budget,
    endpoints: Endpoints,
    projects: Vec<ProjectRef>,
}

impl Session {
    /// Log in over HTTP
    pub fn login(config: &Config) -> Result<Self> {
        Self::login_with(config, Box::new(UreqTransport::new(config.timeout, config.max_body)))
    }

    /// Log in through the given transport. `config` is validated first.
    ///
    /// Fails with [`Error::Authentication`] once `max_errors` login attempts
    /// were rejected; transport errors that survive their own retries are
    /// passed through.
    pub fn login_with(config: &Config, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let client = HttpClient::new(transport, config.max_errors, config.retry_delay);
        let budget = Budget::new(config.max_errors);
        let mut tally = ErrorTally::new();

        let cookies = authenticate(
            &client,
            &config.uri_login,
            &Credentials {
                username: &config.username,
                password: &config.password,
            },
            &config.login,
            budget,
            &mut tally,
        )?;

        Ok(Self {
            client,
            cookies,
            tally,
            budget,
            endpoints: Endpoints {
                index: config.uri_index.clone(),
                project: config.uri_project.clone(),
                user: config.uri_user.clone(),
            },
            projects: Vec::new(),
        })
    }

    /// Failure counts since this session was created
    pub fn global_errors(&self) -> &ErrorTally {
        &self.tally
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Look up a user. `None` when the service never answered 200 with JSON.
    pub fn user(&mut self, id: &str) -> Result<Option<Value>> {
        let base = self
            .endpoints
            .user
            .as_deref()
            .ok_or(Error::Config(ConfigError::Missing("uri_user")))?;
        let url = format!("{base}{id}");
        let label = format!("user {id}");

        let outcome = self.budget.run(
            &label,
            &mut self.tally,
            |tally, _| {
                let response = self.client.get(&url, &self.cookies, tally)?;
                let parsed = if response.status == 200 {
                    serde_json::from_str::<Value>(&response.body).ok()
                } else {
                    None
                };
                Ok::<_, Error>((response.status, parsed))
            },
            |(status, parsed), attempt| {
                if parsed.is_some() {
                    Verdict::Accept
                } else {
                    warn!(user = id, status, attempt, "no usable user info");
                    Verdict::Reject(None)
                }
            },
        )?;

        if outcome.is_accepted() {
            debug!(user = id, "got user info");
        } else {
            info!(user = id, attempts = outcome.attempts(), "giving up on user");
        }
        let (_, parsed) = outcome.into_inner();
        Ok(parsed)
    }
}
