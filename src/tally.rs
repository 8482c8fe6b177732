//! Error tallies
//!
//! Counts failure categories seen by one session. Counts only ever grow;
//! a fresh session starts from zero.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnexpectedContentType,
    BadFile,
    EmptyResponse,
    NonOkResponse,
    LoginMd5,
    LoginText,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::UnexpectedContentType,
        ErrorKind::BadFile,
        ErrorKind::EmptyResponse,
        ErrorKind::NonOkResponse,
        ErrorKind::LoginMd5,
        ErrorKind::LoginText,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnexpectedContentType => "unexpected_content_type",
            ErrorKind::BadFile => "bad_file",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::NonOkResponse => "non_ok_response",
            ErrorKind::LoginMd5 => "login_md5",
            ErrorKind::LoginText => "login_text",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorTally {
    counts: BTreeMap<ErrorKind, u64>,
}

impl Default for ErrorTally {
    fn default() -> Self {
        Self {
            counts: ErrorKind::ALL.iter().map(|&kind| (kind, 0)).collect(),
        }
    }
}

impl ErrorTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ErrorKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn get(&self, kind: ErrorKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Categories in a fixed order, zero counts included
    pub fn iter(&self) -> impl Iterator<Item = (ErrorKind, u64)> + '_ {
        self.counts.iter().map(|(&kind, &count)| (kind, count))
    }
}
