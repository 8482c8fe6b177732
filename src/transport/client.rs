use std::convert::Infallible;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::consts::{DIAGNOSTIC_BODY_LIMIT, LD_JSON};
use crate::error::NetworkError;
use crate::retry::{Budget, Verdict};
use crate::tally::{ErrorKind, ErrorTally};

use super::{CookieJar, Method, Request, Response, Transport};

/// Retrying client on top of a [`Transport`]
pub struct HttpClient {
    transport: Box<dyn Transport>,
    budget: Budget,
}

impl HttpClient {
    /// `max_errors` bounds the attempts per exchange; `retry_delay` is slept
    /// between failed attempts.
    pub fn new(transport: Box<dyn Transport>, max_errors: u32, retry_delay: Duration) -> Self {
        Self {
            transport,
            budget: Budget::new(max_errors).with_pause(retry_delay),
        }
    }

    /// GET asking for JSON-LD
    pub fn get(
        &self,
        url: &str,
        cookies: &CookieJar,
        tally: &mut ErrorTally,
    ) -> Result<Response, NetworkError> {
        let request = Request::get(url)
            .with_header("Accept", LD_JSON)
            .with_cookies(cookies);
        self.exchange(&request, tally)
    }

    pub fn post(
        &self,
        url: &str,
        form: &[(&str, &str)],
        cookies: &CookieJar,
        tally: &mut ErrorTally,
    ) -> Result<Response, NetworkError> {
        let request = Request::post(url, form).with_cookies(cookies);
        self.exchange(&request, tally)
    }

    /// Dispatch on a verb given as text; only `get` and `post` exist.
    pub fn request(
        &self,
        verb: &str,
        url: &str,
        form: &[(&str, &str)],
        cookies: &CookieJar,
        tally: &mut ErrorTally,
    ) -> crate::error::Result<Response> {
        let response = match verb.parse::<Method>()? {
            Method::Get => self.get(url, cookies, tally)?,
            Method::Post => self.post(url, form, cookies, tally)?,
        };
        Ok(response)
    }

    /// Perform `request`, retrying the whole exchange on any transport error.
    /// Exhaustion hands back the last error.
    pub fn exchange(
        &self,
        request: &Request,
        tally: &mut ErrorTally,
    ) -> Result<Response, NetworkError> {
        let label = format!("{} {}", request.method, request.url);
        let max = self.budget.max_attempts();
        let Ok(outcome) = self.budget.run(
            &label,
            tally,
            |tally, _| Ok::<_, Infallible>(self.attempt(request, tally)),
            |result, attempt| match result {
                Ok(_) => Verdict::Accept,
                Err(e) => {
                    error!(attempt, max, error = %e, "{label} failed");
                    Verdict::Reject(None)
                }
            },
        );

        let accepted = outcome.is_accepted();
        let attempts = outcome.attempts();
        let result = outcome.into_inner();
        if !accepted && let Err(e) = &result {
            error!(attempts, error = %e, "{label}: giving up");
        }
        result
    }

    fn attempt(&self, request: &Request, tally: &mut ErrorTally) -> Result<Response, NetworkError> {
        let mut response = self.transport.send(request)?;

        // The service answers the login POST with a redirect; following it
        // as a GET loses the form, so post again to where we ended up.
        if request.method == Method::Post && response.was_redirected() {
            info!(
                from = %request.url,
                to = %response.url,
                hops = response.history.len(),
                "POST was redirected, re-posting"
            );
            let resubmit = request.redirected_to(&response.url);
            response = self.transport.send(&resubmit)?;
        }

        inspect(request.method, &response, tally);

        if response.is_error() {
            return Err(NetworkError::Status {
                method: request.method.as_str(),
                url: response.url.clone(),
                status: response.status,
            });
        }
        Ok(response)
    }
}

/// Record soft failures of a response that made it back to us
fn inspect(method: Method, response: &Response, tally: &mut ErrorTally) {
    if response.is_error() {
        error!(
            %method,
            url = %response.url,
            status = response.status,
            "non-ok status"
        );
        tally.record(ErrorKind::NonOkResponse);
        log_response(ErrorKind::NonOkResponse, response);
    }

    if response.body.is_empty() {
        error!(
            %method,
            url = %response.url,
            status = response.status,
            "empty body"
        );
        tally.record(ErrorKind::EmptyResponse);
        log_response(ErrorKind::EmptyResponse, response);
    }
}

/// Dump everything we know about a response at debug level
pub(crate) fn log_response(category: ErrorKind, response: &Response) {
    debug!(%category, headers = ?response.headers, "[last response] headers");
    debug!(%category, encoding = ?response.encoding(), "[last response] encoding");
    debug!(%category, status = response.status, "[last response] status");
    debug!(%category, cookies = %response.cookies(), "[last response] cookies");
    debug!(%category, len = response.body.len(), "[last response] body length");
    debug!(%category, history = ?response.history, "[last response] redirects");
    debug!(
        %category,
        body = truncate(&response.body, DIAGNOSTIC_BODY_LIMIT),
        "[last response] body"
    );
}

fn truncate(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    type Script = Rc<RefCell<VecDeque<Result<Response, NetworkError>>>>;
    type Log = Rc<RefCell<Vec<Request>>>;

    struct Scripted {
        script: Script,
        log: Log,
    }

    impl Transport for Scripted {
        fn send(&self, request: &Request) -> Result<Response, NetworkError> {
            self.log.borrow_mut().push(request.clone());
            self.script
                .borrow_mut()
                .pop_front()
                .expect("script ran out of responses")
        }
    }

    fn scripted_client(
        max_errors: u32,
        responses: Vec<Result<Response, NetworkError>>,
    ) -> (HttpClient, Log) {
        let log: Log = Rc::default();
        let transport = Scripted {
            script: Rc::new(RefCell::new(responses.into())),
            log: Rc::clone(&log),
        };
        (
            HttpClient::new(Box::new(transport), max_errors, Duration::ZERO),
            log,
        )
    }

    fn ok(url: &str, body: &str) -> Response {
        Response {
            status: 200,
            body: body.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn timeout(url: &str) -> Result<Response, NetworkError> {
        Err(NetworkError::Timeout {
            url: url.to_string(),
        })
    }

    #[test]
    fn get_sends_accept_header_and_cookies() {
        let (client, log) = scripted_client(1, vec![Ok(ok("http://t/x", "{}"))]);
        let mut jar = CookieJar::new();
        jar.insert("JSESSIONID", "s1");
        let mut tally = ErrorTally::new();

        client.get("http://t/x", &jar, &mut tally).unwrap();

        let log = log.borrow();
        let sent = &log[0];
        assert_eq!(sent.method, Method::Get);
        assert_eq!(sent.header("Accept"), Some(LD_JSON));
        assert_eq!(sent.header("Cookie"), Some("JSESSIONID=s1"));
    }

    #[test]
    fn post_does_not_send_accept_header() {
        let (client, log) = scripted_client(1, vec![Ok(ok("http://t/login", "hi"))]);
        let mut tally = ErrorTally::new();

        client
            .post("http://t/login", &[("uname", "u")], &CookieJar::new(), &mut tally)
            .unwrap();

        let log = log.borrow();
        let sent = &log[0];
        assert_eq!(sent.header("Accept"), None);
        assert_eq!(sent.form, vec![("uname".to_string(), "u".to_string())]);
    }

    #[test]
    fn redirected_post_is_posted_again_to_final_address() {
        let bounced = Response {
            history: vec!["http://t/login".to_string()],
            ..ok("http://t/login.jsp", "landing")
        };
        let (client, log) = scripted_client(
            3,
            vec![Ok(bounced), Ok(ok("http://t/login.jsp", "second"))],
        );
        let mut tally = ErrorTally::new();

        let res = client
            .post("http://t/login", &[("uname", "u")], &CookieJar::new(), &mut tally)
            .unwrap();

        assert_eq!(res.body, "second");
        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].method, Method::Post);
        assert_eq!(log[1].url, "http://t/login.jsp");
        assert_eq!(log[1].form, log[0].form);
    }

    #[test]
    fn redirected_get_is_not_reissued() {
        let moved = Response {
            history: vec!["http://t/a".to_string()],
            ..ok("http://t/b", "body")
        };
        let (client, log) = scripted_client(3, vec![Ok(moved)]);
        let mut tally = ErrorTally::new();

        client.get("http://t/a", &CookieJar::new(), &mut tally).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn timeouts_are_retried_then_surface() {
        let (client, log) = scripted_client(
            3,
            vec![timeout("http://t/x"), timeout("http://t/x"), timeout("http://t/x")],
        );
        let mut tally = ErrorTally::new();

        let err = client
            .get("http://t/x", &CookieJar::new(), &mut tally)
            .unwrap_err();

        assert!(matches!(err, NetworkError::Timeout { .. }));
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn recovers_after_a_timeout() {
        let (client, log) = scripted_client(
            3,
            vec![timeout("http://t/x"), Ok(ok("http://t/x", "fine"))],
        );
        let mut tally = ErrorTally::new();

        let res = client.get("http://t/x", &CookieJar::new(), &mut tally).unwrap();
        assert_eq!(res.body, "fine");
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn error_status_is_tallied_and_raised() {
        let server_error = Response {
            status: 500,
            ..ok("http://t/x", "oops")
        };
        let (client, _) = scripted_client(2, vec![Ok(server_error.clone()), Ok(server_error)]);
        let mut tally = ErrorTally::new();

        let err = client
            .get("http://t/x", &CookieJar::new(), &mut tally)
            .unwrap_err();

        assert!(matches!(err, NetworkError::Status { status: 500, .. }));
        assert_eq!(tally.get(ErrorKind::NonOkResponse), 2);
    }

    #[test]
    fn empty_body_is_a_soft_failure() {
        let (client, log) = scripted_client(3, vec![Ok(ok("http://t/x", ""))]);
        let mut tally = ErrorTally::new();

        let res = client.get("http://t/x", &CookieJar::new(), &mut tally).unwrap();

        assert!(res.body.is_empty());
        assert_eq!(tally.get(ErrorKind::EmptyResponse), 1);
        assert_eq!(tally.get(ErrorKind::NonOkResponse), 0);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn unknown_verb_fails_without_a_request() {
        let (client, log) = scripted_client(3, vec![]);
        let mut tally = ErrorTally::new();

        let err = client
            .request("put", "http://t/x", &[], &CookieJar::new(), &mut tally)
            .unwrap_err();

        assert!(matches!(err, crate::error::Error::InvalidVerb(_)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn verb_dispatch_posts_form() {
        let (client, log) = scripted_client(1, vec![Ok(ok("http://t/login", "ok"))]);
        let mut tally = ErrorTally::new();

        client
            .request("post", "http://t/login", &[("a", "b")], &CookieJar::new(), &mut tally)
            .unwrap();
        assert_eq!(log.borrow()[0].method, Method::Post);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("äöü", 3), "ä");
    }
}
