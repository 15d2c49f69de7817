//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::infra::store::JsonRecordStore;
use crate::output::OutputContext;

/// Disposable Linode build environments for coding agents
#[derive(Parser, Debug)]
#[command(
    name = "agentvm",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also honored via the NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Assume yes for all prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the environment record for this project
    Init(commands::init::InitArgs),

    /// Boot the base image, edit it over SSH, optionally save it back
    Edit,

    /// Run a disposable session on the base image
    Build(commands::build::BuildArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli { quiet, no_color, yes, command } = self;
        let ctx = OutputContext::new(no_color, quiet);
        let store = JsonRecordStore::new()?;
        match command {
            Command::Init(args) => commands::init::run(&ctx, &store, &args),
            Command::Edit => commands::edit::run(&ctx, &store, yes).await,
            Command::Build(args) => commands::build::run(&ctx, &store, &args, yes).await,
        }
    }
}
