use thiserror::Error;
use tracing::warn;

use tpen::{ErrorTally, ProjectRef, Session};

use crate::cli::{Cli, Commands};
use crate::output::{
    listing_json, print_listing_table, print_records_table, record_json, tally_json, tally_table,
};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    Tpen(#[from] tpen::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("project {id} could not be fetched ({bytes} bytes of garbage)")]
    BadFile { id: String, bytes: usize },

    #[error("no user info for {0}")]
    NoUser(String),
}

pub(crate) struct CommandContext<'a> {
    pub(crate) cli: &'a Cli,
    pub(crate) use_color: bool,
}

fn handle_list(session: &mut Session, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let projects = session.projects_list()?;
    if ctx.cli.json {
        println!("{}", listing_json(projects)?);
    } else if projects.is_empty() {
        println!("No projects found.");
    } else {
        print_listing_table(projects, ctx.use_color);
    }
    Ok(())
}

/// Listing entry for `id`. Without one, or without a listing, the id doubles
/// as the label.
fn fetch_target(session: &mut Session, id: &str) -> ProjectRef {
    let listed = match session.projects_list() {
        Ok(projects) => projects.iter().find(|p| p.id == id).cloned(),
        Err(e) => {
            warn!(id, error = %e, "project listing unavailable, fetching without a label");
            None
        }
    };
    listed.unwrap_or_else(|| ProjectRef::new(id, id))
}

fn handle_fetch(session: &mut Session, id: &str, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    let project = fetch_target(session, id);

    let record = session.project(&project)?;
    if ctx.cli.json {
        println!("{}", record_json(&record)?);
    }
    match (record.data(), record.garbage()) {
        (Some(data), _) => {
            if !ctx.cli.json {
                println!("{data}");
            }
            Ok(())
        }
        (None, garbage) => Err(AppError::BadFile {
            id: project.id,
            bytes: garbage.map_or(0, str::len),
        }),
    }
}

fn handle_all(session: &mut Session, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    if ctx.cli.json {
        for record in session.projects()? {
            println!("{}", record_json(&record?)?);
        }
        return Ok(());
    }

    let records = session.projects_as_list()?;
    if records.is_empty() {
        println!("No projects found.");
    } else {
        print_records_table(&records, ctx.use_color);
    }
    Ok(())
}

fn handle_user(session: &mut Session, id: &str) -> Result<(), AppError> {
    match session.user(id)? {
        Some(info) => {
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        None => Err(AppError::NoUser(id.to_string())),
    }
}

fn handle_errors(session: &Session, ctx: &CommandContext<'_>) -> Result<(), AppError> {
    if ctx.cli.json {
        println!("{}", tally_json(session.global_errors())?);
    } else {
        println!("{}", tally_table(session.global_errors(), ctx.use_color));
    }
    Ok(())
}

/// Tallies as JSON or as a table
fn tally_report(tally: &ErrorTally, json: bool, use_color: bool) -> Result<String, AppError> {
    if json {
        Ok(tally_json(tally)?)
    } else {
        Ok(tally_table(tally, use_color).to_string())
    }
}

pub(crate) fn handle_command(
    session: &mut Session,
    ctx: &CommandContext<'_>,
) -> Result<(), AppError> {
    let result = match &ctx.cli.command {
        Commands::List => handle_list(session, ctx),
        Commands::Fetch { id } => handle_fetch(session, id, ctx),
        Commands::All => handle_all(session, ctx),
        Commands::User { id } => handle_user(session, id),
        Commands::Errors => handle_errors(session, ctx),
    };

    // stderr, so JSON on stdout stays parseable
    if ctx.cli.debug && ctx.cli.command.scrapes() {
        eprintln!(
            "{}",
            tally_report(session.global_errors(), ctx.cli.json, ctx.use_color)?
        );
    }
    result
}
