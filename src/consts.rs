//! Things the remote service is known to do.

/// The only content type under which project payloads are encoded properly.
/// The service also answers with "text/plain; charset=utf-8" for the same resource.
pub const LD_JSON: &str = "application/ld+json;charset=UTF-8";

/// MD5 of the page served after a rejected login
pub const LOGIN_FAILED_MD5: &str = "b9abb18f4c42fd8321f97d38790d224d";

/// Script fragment present only on the page served after a successful login
pub const LOGIN_SUCCESS_MARKER: &str = r#"document.location = "index.jsp";"#;

/// `id` of the table listing the account's projects
pub const PROJECT_TABLE_ID: &str = "projectList";

/// Form field names of the login form
pub const LOGIN_USER_FIELD: &str = "uname";
pub const LOGIN_PASSWORD_FIELD: &str = "password";

/// Bodies longer than this are cut in diagnostic log lines
pub const DIAGNOSTIC_BODY_LIMIT: usize = 512;

/// Largest response body read by default. Project payloads can run past
/// the HTTP library's own 10 MiB default.
pub const DEFAULT_MAX_BODY: u64 = 256 * 1024 * 1024;
