//! Login state machine
//!
//! ```text
//! Anonymous ──start──> Authenticating ──marker found──> Authenticated
//!                          │    ^
//!                          │    └── bad checksum / no marker (budget left)
//!                          └── budget spent ──> Failed
//! ```

use md5::{Digest, Md5};
use tracing::{debug, error, info};

use crate::consts::{LOGIN_FAILED_MD5, LOGIN_PASSWORD_FIELD, LOGIN_SUCCESS_MARKER, LOGIN_USER_FIELD};
use crate::error::{Error, Result};
use crate::retry::{Budget, Outcome, Verdict};
use crate::tally::{ErrorKind, ErrorTally};
use crate::transport::{CookieJar, HttpClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Anonymous,
    Authenticating,
    Authenticated,
    Failed,
}

/// How a login response body reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginCheck {
    /// The page the service serves for bad credentials
    FailureChecksum,
    /// Neither the failure page nor the success marker
    MissingMarker,
    Success,
}

impl LoginCheck {
    /// Tally category for a rejected login
    pub fn error_kind(self) -> Option<ErrorKind> {
        match self {
            LoginCheck::FailureChecksum => Some(ErrorKind::LoginMd5),
            LoginCheck::MissingMarker => Some(ErrorKind::LoginText),
            LoginCheck::Success => None,
        }
    }
}

/// What the service's login responses look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSignatures {
    /// Hex MD5 of the bad-credentials page
    pub failure_md5: String,
    /// Substring only the success page contains
    pub success_marker: String,
}

impl Default for LoginSignatures {
    fn default() -> Self {
        Self {
            failure_md5: LOGIN_FAILED_MD5.to_string(),
            success_marker: LOGIN_SUCCESS_MARKER.to_string(),
        }
    }
}

impl LoginSignatures {
    pub fn check(&self, body: &str) -> LoginCheck {
        if body_md5(body).eq_ignore_ascii_case(&self.failure_md5) {
            LoginCheck::FailureChecksum
        } else if !body.contains(&self.success_marker) {
            LoginCheck::MissingMarker
        } else {
            LoginCheck::Success
        }
    }
}

impl LoginState {
    pub fn start(self) -> Self {
        match self {
            LoginState::Anonymous => LoginState::Authenticating,
            other => other,
        }
    }

    /// Transition on one login response
    pub fn on_response(self, check: LoginCheck) -> Self {
        match (self, check) {
            (LoginState::Authenticating, LoginCheck::Success) => LoginState::Authenticated,
            (LoginState::Authenticating, _) => LoginState::Authenticating,
            (other, _) => other,
        }
    }

    /// Transition when the attempt budget is gone
    pub fn exhausted(self) -> Self {
        match self {
            LoginState::Authenticated => LoginState::Authenticated,
            _ => LoginState::Failed,
        }
    }
}

/// Hex MD5 of a response body
pub fn body_md5(body: &str) -> String {
    Md5::digest(body.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub(crate) struct Credentials<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

/// Post the credentials until the service lets us in. Every attempt is a
/// fresh POST. Returns the cookies of the successful response.
pub(crate) fn authenticate(
    client: &HttpClient,
    login_url: &str,
    credentials: &Credentials<'_>,
    signatures: &LoginSignatures,
    budget: Budget,
    tally: &mut ErrorTally,
) -> Result<CookieJar> {
    let form = [
        (LOGIN_USER_FIELD, credentials.username),
        (LOGIN_PASSWORD_FIELD, credentials.password),
    ];
    let anonymous = CookieJar::new();
    let mut state = LoginState::Anonymous.start();
    debug!(?state, url = login_url, "logging in");

    let outcome = budget.run(
        "login",
        tally,
        |tally, _| {
            client
                .post(login_url, &form, &anonymous, tally)
                .map_err(Error::from)
        },
        |response, attempt| {
            let check = signatures.check(&response.body);
            state = state.on_response(check);
            match check {
                LoginCheck::Success => Verdict::Accept,
                LoginCheck::FailureChecksum => {
                    error!(attempt, "authentication failed (md5)");
                    info!(cookies = %response.cookies(), "bad login cookies");
                    Verdict::Reject(check.error_kind())
                }
                LoginCheck::MissingMarker => {
                    error!(attempt, "authentication failed (text)");
                    info!(cookies = %response.cookies(), "bad login cookies");
                    Verdict::Reject(check.error_kind())
                }
            }
        },
    )?;

    match outcome {
        Outcome::Accepted { value, attempts } => {
            let cookies = value.cookies();
            info!(?state, %cookies, errors = attempts - 1, "logged in");
            Ok(cookies)
        }
        Outcome::Exhausted { attempts, .. } => {
            state = state.exhausted();
            error!(?state, attempts, "authentication failed");
            Err(Error::Authentication { attempts })
        }
    }
}
