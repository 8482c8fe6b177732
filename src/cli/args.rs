//! CLI argument definitions
//!
//! Global CLI options and configuration merging logic.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use tpen::Config;

use super::commands::Commands;

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq)]
pub(crate) enum ColorMode {
    /// Auto-detect based on terminal (default)
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Parser)]
#[command(name = "tpen")]
#[command(about = "Log in to T-PEN and fetch project transcriptions", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Config file (default: ~/.config/tpen/config.toml, then ~/.tpen.toml)
    #[arg(short = 'C', long, global = true, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long, global = true)]
    pub(crate) json: bool,

    /// Debug logging, and print error tallies when done
    #[arg(long, global = true)]
    pub(crate) debug: bool,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub(crate) color: ColorMode,

    /// Disable colored output (shorthand for --color=never)
    #[arg(long, global = true)]
    pub(crate) no_color: bool,
}

impl Cli {
    /// Merge CLI flags into the loaded config (CLI takes precedence)
    pub(crate) fn apply_to(&self, mut config: Config) -> Config {
        if self.debug {
            config.debug = true;
        }
        config
    }

    pub(crate) fn use_color(&self) -> bool {
        if self.no_color {
            return false;
        }
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }
}
