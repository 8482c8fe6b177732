mod app;
mod cli;
mod output;

use clap::Parser;

use tpen::{Config, Session};

use app::{AppError, CommandContext, handle_command};
use cli::Cli;

fn run(cli: &Cli) -> Result<(), AppError> {
    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::discover(),
    }
    .map_err(tpen::Error::from)?;
    let config = cli.apply_to(config);

    tpen::logging::init(&config).map_err(tpen::Error::from)?;

    let mut session = Session::login(&config)?;
    let ctx = CommandContext {
        cli,
        use_color: cli.use_color(),
    };
    handle_command(&mut session, &ctx)
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
