//! HTTP transport
//!
//! [`Transport`] performs exactly one raw exchange. [`HttpClient`] wraps it with
//! the behaviour the service needs: content negotiation, cookies, redirected
//! POST resubmission, soft-failure tallies and bounded retry.

mod client;
mod cookies;
mod http;

use std::fmt;
use std::str::FromStr;

use crate::error::{InvalidVerbError, NetworkError};

pub use client::HttpClient;
pub(crate) use client::log_response;
pub use cookies::CookieJar;
pub use http::UreqTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = InvalidVerbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            _ => Err(InvalidVerbError {
                verb: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Urlencoded form fields, POST only
    pub form: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            form: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>, form: &[(&str, &str)]) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_cookies(self, jar: &CookieJar) -> Self {
        match jar.header_value() {
            Some(value) => self.with_header("Cookie", &value),
            None => self,
        }
    }

    /// Same request, different address
    pub fn redirected_to(&self, url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..self.clone()
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Address the body was finally served from
    pub url: String,
    /// Addresses visited before `url`, oldest first
    pub history: Vec<String>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Charset parameter of the content type, if any
    pub fn encoding(&self) -> Option<&str> {
        self.content_type()?
            .split(';')
            .skip(1)
            .filter_map(|param| param.trim().split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"'))
    }

    pub fn set_cookie_headers(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("Set-Cookie"))
            .map(|(_, value)| value.as_str())
    }

    pub fn cookies(&self) -> CookieJar {
        let mut jar = CookieJar::new();
        jar.absorb(self);
        jar
    }

    /// Client or server error status
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn was_redirected(&self) -> bool {
        !self.history.is_empty()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// One raw HTTP exchange, no retries and no interpretation of the result
pub trait Transport {
    fn send(&self, request: &Request) -> Result<Response, NetworkError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).send(request)
    }
}
