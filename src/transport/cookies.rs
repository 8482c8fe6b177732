use std::collections::BTreeMap;
use std::fmt;

use super::Response;

/// Session cookies as returned by the service. Attributes (path, expiry, ...)
/// are dropped; only name and value are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Take every `Set-Cookie` header of `response` into the jar
    pub fn absorb(&mut self, response: &Response) {
        for header in response.set_cookie_headers() {
            if let Some((name, value)) = parse_set_cookie(header) {
                self.insert(name, value);
            }
        }
    }

    /// Value for a `Cookie` request header
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl fmt::Display for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // names only, values are credentials
        let names: Vec<&str> = self.cookies.keys().map(String::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

fn parse_set_cookie(header: &str) -> Option<(&str, &str)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim().trim_matches('"')))
}
