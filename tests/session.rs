use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use tpen::session::body_md5;
use tpen::{
    Config, ConfigError, Error, ErrorKind, Method, NetworkError, ProjectRef, Request, Response,
    Session, Transport,
};

const BASE: &str = "http://t-pen.test/TPEN";
const LD_JSON: &str = "application/ld+json;charset=UTF-8";
const LOGIN_OK: &str = r#"<html><script>document.location = "index.jsp";</script></html>"#;
const LOGIN_BAD_PAGE: &str = "<html><body>Login failed</body></html>";

fn url(path: &str) -> String {
    format!("{BASE}/{path}")
}

fn config(max_errors: u32) -> Config {
    Config::from_toml_str(&format!(
        r#"
        username = "scribe"
        password = "quill"
        timeout = 5
        max_errors = {max_errors}
        retry_delay = 0
        uri_index = "{index}"
        uri_login = "{login}"
        uri_project = "{project}"
        uri_user = "{user}"
        login_failed_md5 = "{md5}"
        "#,
        index = url("index.jsp"),
        login = url("login.jsp"),
        project = url("project/"),
        user = url("geti?uid="),
        md5 = body_md5(LOGIN_BAD_PAGE),
    ))
    .expect("test config")
}

fn page(status: u16, content_type: &str, body: &str) -> Response {
    Response {
        status,
        headers: vec![("Content-Type".to_string(), content_type.to_string())],
        body: body.to_string(),
        ..Default::default()
    }
}

fn login_ok() -> Response {
    let mut res = page(200, "text/html", LOGIN_OK);
    res.headers.push((
        "Set-Cookie".to_string(),
        "JSESSIONID=abc123; Path=/TPEN; HttpOnly".to_string(),
    ));
    res
}

fn index(rows: &[(&str, &str)]) -> Response {
    let rows: String = rows
        .iter()
        .map(|(title, id)| {
            let link = format!(r#"<a href="transcription.html?projectID={id}">{title}</a>"#);
            format!(r#"<tr title="{title}"><td>{link}</td></tr>"#)
        })
        .collect();
    page(
        200,
        "text/html",
        &format!(r#"<table id="projectList"><tbody>{rows}</tbody></table>"#),
    )
}

#[derive(Default)]
struct State {
    queued: HashMap<(Method, String), VecDeque<Response>>,
    always: HashMap<(Method, String), Response>,
    down: HashSet<(Method, String)>,
    log: Vec<Request>,
}

/// Stand-in for the service: scripted replies per (method, url), every
/// request recorded.
#[derive(Clone, Default)]
struct Counterpart {
    state: Rc<RefCell<State>>,
}

impl Counterpart {
    fn then(&self, method: Method, url: &str, response: Response) -> &Self {
        self.state
            .borrow_mut()
            .queued
            .entry((method, url.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    fn always(&self, method: Method, url: &str, response: Response) -> &Self {
        self.state
            .borrow_mut()
            .always
            .insert((method, url.to_string()), response);
        self
    }

    fn down(&self, method: Method, url: &str) -> &Self {
        self.state.borrow_mut().down.insert((method, url.to_string()));
        self
    }

    fn requests(&self) -> Vec<Request> {
        self.state.borrow().log.clone()
    }

    fn count(&self, method: Method, url: &str) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    fn transport(&self) -> Box<dyn Transport> {
        Box::new(self.clone())
    }

    /// Counterpart that accepts the first login
    fn logged_in() -> Self {
        let counterpart = Counterpart::default();
        counterpart.then(Method::Post, &url("login.jsp"), login_ok());
        counterpart
    }
}

impl Transport for Counterpart {
    fn send(&self, request: &Request) -> Result<Response, NetworkError> {
        let mut state = self.state.borrow_mut();
        state.log.push(request.clone());
        let key = (request.method, request.url.clone());

        if state.down.contains(&key) {
            return Err(NetworkError::Timeout {
                url: request.url.clone(),
            });
        }
        let queued = state.queued.get_mut(&key).and_then(VecDeque::pop_front);
        let mut response = queued
            .or_else(|| state.always.get(&key).cloned())
            .ok_or_else(|| NetworkError::Http {
                url: request.url.clone(),
                message: "no route".to_string(),
            })?;
        if response.url.is_empty() {
            response.url = request.url.clone();
        }
        Ok(response)
    }
}

#[test]
fn login_captures_cookies_and_uses_them() {
    let counterpart = Counterpart::logged_in();
    counterpart.always(Method::Get, &url("index.jsp"), index(&[("Foo", "42")]));

    let mut session = Session::login_with(&config(3), counterpart.transport()).unwrap();
    assert_eq!(session.cookies().get("JSESSIONID"), Some("abc123"));

    session.projects_list().unwrap();

    let requests = counterpart.requests();
    let login = &requests[0];
    assert_eq!(login.method, Method::Post);
    assert!(login.form.contains(&("uname".to_string(), "scribe".to_string())));
    assert!(login.form.contains(&("password".to_string(), "quill".to_string())));
    assert_eq!(login.header("Cookie"), None);

    let listing = &requests[1];
    assert_eq!(listing.header("Cookie"), Some("JSESSIONID=abc123"));
    assert_eq!(listing.header("Accept"), Some(LD_JSON));
}

#[test]
fn listing_is_fetched_once() {
    let counterpart = Counterpart::logged_in();
    counterpart.always(
        Method::Get,
        &url("index.jsp"),
        index(&[("Foo", "42"), ("Bar", "7")]),
    );
    let mut session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    let first = session.projects_list().unwrap().to_vec();
    let second = session.projects_list().unwrap().to_vec();

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![ProjectRef::new("Foo", "42"), ProjectRef::new("Bar", "7")]
    );
    assert_eq!(counterpart.count(Method::Get, &url("index.jsp")), 1);
}

#[test]
fn wrong_content_type_exhausts_budget_without_error() {
    let counterpart = Counterpart::logged_in();
    counterpart.always(
        Method::Get,
        &url("project/42"),
        page(200, "text/plain; charset=utf-8", "mangled"),
    );
    let mut session = Session::login_with(&config(4), counterpart.transport()).unwrap();

    let record = session.project(&ProjectRef::new("Foo", "42")).unwrap();

    assert_eq!(counterpart.count(Method::Get, &url("project/42")), 4);
    assert_eq!(record.data(), None);
    assert_eq!(record.garbage(), Some("mangled"));
    let errors = session.global_errors();
    assert_eq!(errors.get(ErrorKind::UnexpectedContentType), 4);
    assert_eq!(errors.get(ErrorKind::BadFile), 1);
}

#[test]
fn records_carry_exactly_one_of_data_or_garbage() {
    let counterpart = Counterpart::logged_in();
    counterpart
        .always(
            Method::Get,
            &url("index.jsp"),
            index(&[("Good", "1"), ("Broken", "2")]),
        )
        .always(Method::Get, &url("project/1"), page(200, LD_JSON, r#"{"id":1}"#))
        .always(Method::Get, &url("project/2"), page(200, "text/html", "<html/>"));
    let mut session = Session::login_with(&config(2), counterpart.transport()).unwrap();

    let records = session.projects_as_list().unwrap();

    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(record.data().is_some() != record.garbage().is_some());
    }
    assert!(records[0].is_success());
    assert!(!records[1].is_success());
}

#[test]
fn failure_page_checksum_is_tallied_and_retried() {
    let counterpart = Counterpart::default();
    counterpart
        .then(Method::Post, &url("login.jsp"), page(200, "text/html", LOGIN_BAD_PAGE))
        .then(Method::Post, &url("login.jsp"), login_ok());

    let session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    assert_eq!(session.global_errors().get(ErrorKind::LoginMd5), 1);
    assert_eq!(session.global_errors().get(ErrorKind::LoginText), 0);
    assert_eq!(counterpart.count(Method::Post, &url("login.jsp")), 2);
}

#[test]
fn missing_marker_is_tallied_and_retried() {
    let counterpart = Counterpart::default();
    counterpart
        .then(Method::Post, &url("login.jsp"), page(200, "text/html", "<html>hm</html>"))
        .then(Method::Post, &url("login.jsp"), login_ok());

    let session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    assert_eq!(session.global_errors().get(ErrorKind::LoginText), 1);
    assert_eq!(session.global_errors().get(ErrorKind::LoginMd5), 0);
    assert_eq!(session.cookies().get("JSESSIONID"), Some("abc123"));
}

#[test]
fn login_exhaustion_is_fatal() {
    let counterpart = Counterpart::default();
    counterpart.always(Method::Post, &url("login.jsp"), page(200, "text/html", LOGIN_BAD_PAGE));

    let result = Session::login_with(&config(3), counterpart.transport());

    assert!(matches!(result, Err(Error::Authentication { attempts: 3 })));
    assert_eq!(counterpart.count(Method::Post, &url("login.jsp")), 3);
}

#[test]
fn redirected_login_post_is_posted_again() {
    let bounced = Response {
        url: url("index.jsp"),
        history: vec![url("login.jsp")],
        ..page(200, "text/html", "<html>index</html>")
    };
    let counterpart = Counterpart::default();
    counterpart
        .then(Method::Post, &url("login.jsp"), bounced)
        .then(Method::Post, &url("index.jsp"), login_ok());

    let session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    let requests = counterpart.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, Method::Post);
    assert_eq!(requests[1].url, url("index.jsp"));
    assert_eq!(requests[1].form, requests[0].form);
    assert_eq!(session.cookies().get("JSESSIONID"), Some("abc123"));
}

#[test]
fn end_to_end_scrape() {
    let counterpart = Counterpart::logged_in();
    counterpart
        .always(Method::Get, &url("index.jsp"), index(&[("Foo", "42")]))
        .then(
            Method::Get,
            &url("project/42"),
            page(200, "text/plain; charset=utf-8", r#"{"id":42}"#),
        )
        .then(Method::Get, &url("project/42"), page(200, LD_JSON, r#"{"id":42}"#));
    let mut session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    let records: Vec<_> = session
        .projects()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].project, ProjectRef::new("Foo", "42"));
    assert_eq!(records[0].data(), Some(r#"{"id":42}"#));
    assert_eq!(
        serde_json::to_value(&records[0]).unwrap(),
        serde_json::json!({"label": "Foo", "id": "42", "data": r#"{"id":42}"#})
    );
    assert_eq!(session.global_errors().get(ErrorKind::UnexpectedContentType), 1);
    assert_eq!(session.global_errors().get(ErrorKind::BadFile), 0);
}

#[test]
fn each_bulk_pass_fetches_again() {
    let counterpart = Counterpart::logged_in();
    counterpart
        .always(Method::Get, &url("index.jsp"), index(&[("Foo", "42")]))
        .always(Method::Get, &url("project/42"), page(200, LD_JSON, "{}"));
    let mut session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    let lazy = session.projects().unwrap();
    assert_eq!(lazy.len(), 1);
    assert_eq!(lazy.count(), 1);
    session.projects_as_list().unwrap();

    assert_eq!(counterpart.count(Method::Get, &url("project/42")), 2);
    assert_eq!(counterpart.count(Method::Get, &url("index.jsp")), 1);
}

#[test]
fn untitled_and_foreign_rows_are_skipped() {
    let counterpart = Counterpart::logged_in();
    counterpart.always(
        Method::Get,
        &url("index.jsp"),
        page(
            200,
            "text/html",
            r#"<table id="projectList"><tbody>
                <tr title=""><td><a href="transcription.html?projectID=1">a</a></td></tr>
                <tr title="B"><td><a href="other.html?projectID=2">b</a></td></tr>
                <tr title="C"><td><a href="transcription.html?projectID=3">c</a></td></tr>
            </tbody></table>"#,
        ),
    );
    let mut session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    assert_eq!(
        session.projects_list().unwrap(),
        &[ProjectRef::new("C", "3")][..]
    );
}

#[test]
fn transport_exhaustion_propagates() {
    let counterpart = Counterpart::logged_in();
    counterpart.down(Method::Get, &url("index.jsp"));
    let mut session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    let err = session.projects_list().unwrap_err();

    assert!(matches!(err, Error::Network(NetworkError::Timeout { .. })));
    assert_eq!(counterpart.count(Method::Get, &url("index.jsp")), 3);
}

#[test]
fn empty_and_error_bodies_are_counted() {
    let counterpart = Counterpart::logged_in();
    counterpart
        .then(Method::Get, &url("project/9"), page(502, "text/html", ""))
        .then(Method::Get, &url("project/9"), page(200, LD_JSON, "{}"));
    let mut session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    let record = session.project(&ProjectRef::new("Nine", "9")).unwrap();

    assert!(record.is_success());
    let errors = session.global_errors();
    assert_eq!(errors.get(ErrorKind::NonOkResponse), 1);
    assert_eq!(errors.get(ErrorKind::EmptyResponse), 1);
    assert_eq!(errors.get(ErrorKind::UnexpectedContentType), 0);
}

#[test]
fn user_lookup_retries_until_200() {
    let counterpart = Counterpart::logged_in();
    counterpart
        .then(Method::Get, &url("geti?uid=5"), page(204, "application/json", ""))
        .then(
            Method::Get,
            &url("geti?uid=5"),
            page(200, "text/plain", r#"{"uid":5,"name":"Ann"}"#),
        );
    let mut session = Session::login_with(&config(3), counterpart.transport()).unwrap();

    let info = session.user("5").unwrap().expect("user info");

    assert_eq!(info["name"], "Ann");
    assert_eq!(counterpart.count(Method::Get, &url("geti?uid=5")), 2);
}

#[test]
fn user_lookup_gives_up_with_none() {
    let counterpart = Counterpart::logged_in();
    counterpart.always(Method::Get, &url("geti?uid=5"), page(202, "text/plain", "later"));
    let mut session = Session::login_with(&config(2), counterpart.transport()).unwrap();

    assert_eq!(session.user("5").unwrap(), None);
    assert_eq!(counterpart.count(Method::Get, &url("geti?uid=5")), 2);
}

#[test]
fn user_lookup_needs_uri_user() {
    let counterpart = Counterpart::logged_in();
    let mut config = config(2);
    config.uri_user = None;
    let mut session = Session::login_with(&config, counterpart.transport()).unwrap();

    let err = session.user("5").unwrap_err();

    assert!(matches!(err, Error::Config(ConfigError::Missing("uri_user"))));
    assert_eq!(counterpart.requests().len(), 1);
}

#[test]
fn invalid_config_fails_before_any_request() {
    let counterpart = Counterpart::default();
    let mut config = config(2);
    config.max_errors = 0;

    let result = Session::login_with(&config, counterpart.transport());

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::Invalid { key: "max_errors", .. }))
    ));
    assert!(counterpart.requests().is_empty());
}

#[test]
fn fresh_session_starts_with_clean_tallies() {
    let counterpart = Counterpart::default();
    counterpart
        .then(Method::Post, &url("login.jsp"), page(200, "text/html", "nope"))
        .then(Method::Post, &url("login.jsp"), login_ok())
        .then(Method::Post, &url("login.jsp"), login_ok());

    let first = Session::login_with(&config(3), counterpart.transport()).unwrap();
    let second = Session::login_with(&config(3), counterpart.transport()).unwrap();

    assert_eq!(first.global_errors().total(), 1);
    assert_eq!(second.global_errors().total(), 0);
}
