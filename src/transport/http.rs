use std::time::Duration;

use ureq::{Agent, ResponseExt};

use crate::error::NetworkError;

use super::{Method, Request, Response, Transport};

/// Blocking transport backed by a `ureq` agent.
///
/// Status codes are handed back as responses, not errors, and redirect history
/// is recorded so the client can spot a POST that was bounced.
pub struct UreqTransport {
    agent: Agent,
    max_body: u64,
}

impl UreqTransport {
    /// `max_body` caps how many bytes of a response body are read.
    pub fn new(timeout: Duration, max_body: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .save_redirect_history(true)
            .build()
            .into();
        Self { agent, max_body }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> Result<Response, NetworkError> {
        let result = match request.method {
            Method::Get => {
                let mut builder = self.agent.get(request.url.as_str());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            Method::Post => {
                let mut builder = self.agent.post(request.url.as_str());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send_form(
                    request
                        .form
                        .iter()
                        .map(|(name, value)| (name.as_str(), value.as_str())),
                )
            }
        };
        let mut response = result.map_err(|e| map_error(request, e))?;

        let status = response.status().as_u16();
        let url = response.get_uri().to_string();
        let mut history: Vec<String> = response
            .get_redirect_history()
            .map(|uris| uris.iter().map(ToString::to_string).collect())
            .unwrap_or_default();
        // ureq lists the final address as the last hop
        if history.last() == Some(&url) {
            history.pop();
        }
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body)
            .read_to_string()
            .map_err(|e| map_error(request, e))?;

        Ok(Response {
            status,
            headers,
            body,
            url,
            history,
        })
    }
}

fn map_error(request: &Request, err: ureq::Error) -> NetworkError {
    let url = request.url.clone();
    match err {
        ureq::Error::Timeout(_) => NetworkError::Timeout { url },
        ureq::Error::Io(source) => NetworkError::Io { url, source },
        ureq::Error::StatusCode(status) => NetworkError::Status {
            method: request.method.as_str(),
            url,
            status,
        },
        other => NetworkError::Http {
            url,
            message: other.to_string(),
        },
    }
}
