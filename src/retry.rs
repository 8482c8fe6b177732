//! Bounded retry
//!
//! Every loop in the client has the same shape: try something, look at what
//! came back, tally the failure category, try again until the budget is spent.
//! Exchange-level, login and per-operation loops all go through [`Budget::run`].

use std::time::Duration;

use tracing::{debug, warn};

use crate::tally::{ErrorKind, ErrorTally};

/// What the caller thinks of one attempt's result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Try again, recording the category if there is one
    Reject(Option<ErrorKind>),
}

#[derive(Debug)]
pub enum Outcome<T> {
    Accepted { value: T, attempts: u32 },
    /// Budget spent; `last` is the final rejected value
    Exhausted { last: T, attempts: u32 },
}

impl<T> Outcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Accepted { attempts, .. } | Outcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted { .. })
    }

    /// The accepted value or the last rejected one
    pub fn into_inner(self) -> T {
        match self {
            Outcome::Accepted { value, .. } => value,
            Outcome::Exhausted { last, .. } => last,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Budget {
    max_attempts: u32,
    pause: Duration,
}

impl Budget {
    /// A budget of zero still makes one attempt.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            pause: Duration::ZERO,
        }
    }

    /// Sleep this long after each rejected attempt that will be retried
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `attempt` until `judge` accepts its result or the budget is spent.
    ///
    /// `attempt` receives the tally (so the work itself can record soft
    /// failures) and the 1-based attempt number. An `Err` from `attempt`
    /// ends the loop at once and is returned as is.
    pub fn run<T, E>(
        &self,
        label: &str,
        tally: &mut ErrorTally,
        mut attempt: impl FnMut(&mut ErrorTally, u32) -> Result<T, E>,
        mut judge: impl FnMut(&T, u32) -> Verdict,
    ) -> Result<Outcome<T>, E> {
        let mut n = 1;
        loop {
            let value = attempt(tally, n)?;
            let kind = match judge(&value, n) {
                Verdict::Accept => {
                    if n > 1 {
                        debug!(label, attempts = n, "accepted after retries");
                    }
                    return Ok(Outcome::Accepted { value, attempts: n });
                }
                Verdict::Reject(kind) => kind,
            };

            if let Some(kind) = kind {
                tally.record(kind);
            }

            if n >= self.max_attempts {
                warn!(
                    label,
                    category = kind.map(ErrorKind::as_str),
                    attempts = n,
                    "giving up"
                );
                return Ok(Outcome::Exhausted {
                    last: value,
                    attempts: n,
                });
            }

            debug!(
                label,
                category = kind.map(ErrorKind::as_str),
                attempt = n,
                max = self.max_attempts,
                "rejected, retrying"
            );
            if !self.pause.is_zero() {
                debug!(label, pause_ms = self.pause.as_millis() as u64, "sleeping");
                std::thread::sleep(self.pause);
            }
            n += 1;
        }
    }
}
