//! Session client for the T-PEN transcription service.
//!
//! T-PEN has no API: logging in means posting its HTML form, projects are
//! read off the listing page and each project's JSON-LD is fetched from a
//! resource that is sometimes served with the wrong content type, an empty
//! body, or not at all. [`Session`] hides that behind a handful of calls,
//! retrying within a fixed error budget and counting every failure it sees.
//!
//! ```no_run
//! # fn main() -> tpen::Result<()> {
//! let config = tpen::Config::discover()?;
//! let mut session = tpen::Session::login(&config)?;
//! for record in session.projects()? {
//!     let record = record?;
//!     println!("{} {}", record.project.id, record.is_success());
//! }
//! println!("{:?}", session.global_errors());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consts;
pub mod error;
pub mod listing;
pub mod logging;
pub mod project;
pub mod retry;
pub mod session;
pub mod tally;
pub mod transport;

pub use config::Config;
pub use error::{ConfigError, Error, InvalidVerbError, NetworkError, Result};
pub use project::{Payload, ProjectRecord, ProjectRef};
pub use session::{Projects, Session};
pub use tally::{ErrorKind, ErrorTally};
pub use transport::{CookieJar, Method, Request, Response, Transport};
