//! CLI subcommand definitions

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// List the account's projects
    List,
    /// Fetch one project's JSON-LD
    Fetch {
        /// Project id as shown in the listing
        id: String,
    },
    /// Fetch every listed project
    All,
    /// Look up a user
    User {
        id: String,
    },
    /// Log in and show the error tallies
    Errors,
}

impl Commands {
    /// Commands that go through the scrape loops
    pub(crate) fn scrapes(&self) -> bool {
        matches!(self, Commands::Fetch { .. } | Commands::All | Commands::List)
    }
}
